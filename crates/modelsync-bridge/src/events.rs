//! Named lifecycle channels and the payloads they carry.

use serde::{Deserialize, Serialize};

use crate::BridgeError;

/// Kind of load/unload transition reported on [`EventChannel::ModelStateChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    LoadingStarted,
    LoadingCompleted,
    LoadingFailed,
    Unloaded,
}

impl LifecycleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleKind::LoadingStarted => "loading_started",
            LifecycleKind::LoadingCompleted => "loading_completed",
            LifecycleKind::LoadingFailed => "loading_failed",
            LifecycleKind::Unloaded => "unloaded",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "loading_started" => Some(LifecycleKind::LoadingStarted),
            "loading_completed" => Some(LifecycleKind::LoadingCompleted),
            "loading_failed" => Some(LifecycleKind::LoadingFailed),
            "unloaded" => Some(LifecycleKind::Unloaded),
            _ => None,
        }
    }
}

/// Payload of [`EventChannel::ModelStateChanged`].
///
/// `event_type` stays a plain string on the wire so that newer backends can
/// introduce event types without breaking older listeners; see
/// [`ModelStateEvent::kind`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelStateEvent {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelStateEvent {
    pub fn new(kind: LifecycleKind) -> Self {
        Self {
            event_type: kind.as_str().to_string(),
            model_id: None,
            model_name: None,
            error: None,
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>, model_name: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self.model_name = Some(model_name.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Typed event kind, or `None` for event types this build does not know.
    pub fn kind(&self) -> Option<LifecycleKind> {
        LifecycleKind::parse(&self.event_type)
    }
}

/// Payload of [`EventChannel::DownloadProgress`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DownloadProgress {
    pub model_id: String,
    /// Bytes received so far.
    pub downloaded: u64,
    /// Expected size in bytes, `0` when unknown.
    pub total: u64,
    /// Completion in percent. Backends are not required to keep it inside
    /// `0..=100`.
    pub percentage: f64,
}

/// Payload of [`EventChannel::ExtractionFailed`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExtractionFailure {
    pub model_id: String,
    pub error: String,
}

/// Named channels the backend publishes model lifecycle events on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventChannel {
    ModelStateChanged,
    DownloadProgress,
    DownloadComplete,
    DownloadCancelled,
    ExtractionStarted,
    ExtractionCompleted,
    ExtractionFailed,
}

impl EventChannel {
    /// Every channel the presentation layer listens to.
    pub const ALL: [EventChannel; 7] = [
        EventChannel::ModelStateChanged,
        EventChannel::DownloadProgress,
        EventChannel::DownloadComplete,
        EventChannel::DownloadCancelled,
        EventChannel::ExtractionStarted,
        EventChannel::ExtractionCompleted,
        EventChannel::ExtractionFailed,
    ];

    /// Wire name of the channel.
    pub fn name(&self) -> &'static str {
        match self {
            EventChannel::ModelStateChanged => "model-state-changed",
            EventChannel::DownloadProgress => "model-download-progress",
            EventChannel::DownloadComplete => "model-download-complete",
            EventChannel::DownloadCancelled => "model-download-cancelled",
            EventChannel::ExtractionStarted => "model-extraction-started",
            EventChannel::ExtractionCompleted => "model-extraction-completed",
            EventChannel::ExtractionFailed => "model-extraction-failed",
        }
    }

    /// Decodes a raw payload received on this channel.
    pub fn decode(&self, payload: serde_json::Value) -> Result<BackendEvent, BridgeError> {
        let map_err = |source| BridgeError::Decode {
            channel: self.name(),
            source,
        };
        let event = match self {
            EventChannel::ModelStateChanged => {
                BackendEvent::ModelStateChanged(serde_json::from_value(payload).map_err(map_err)?)
            }
            EventChannel::DownloadProgress => {
                BackendEvent::DownloadProgress(serde_json::from_value(payload).map_err(map_err)?)
            }
            EventChannel::DownloadComplete => {
                BackendEvent::DownloadComplete(serde_json::from_value(payload).map_err(map_err)?)
            }
            EventChannel::DownloadCancelled => {
                BackendEvent::DownloadCancelled(serde_json::from_value(payload).map_err(map_err)?)
            }
            EventChannel::ExtractionStarted => {
                BackendEvent::ExtractionStarted(serde_json::from_value(payload).map_err(map_err)?)
            }
            EventChannel::ExtractionCompleted => {
                BackendEvent::ExtractionCompleted(serde_json::from_value(payload).map_err(map_err)?)
            }
            EventChannel::ExtractionFailed => {
                BackendEvent::ExtractionFailed(serde_json::from_value(payload).map_err(map_err)?)
            }
        };
        Ok(event)
    }
}

impl std::fmt::Display for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed lifecycle notification pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    ModelStateChanged(ModelStateEvent),
    DownloadProgress(DownloadProgress),
    /// Id of the model whose download finished.
    DownloadComplete(String),
    /// Id of the model whose download was cancelled.
    DownloadCancelled(String),
    ExtractionStarted(String),
    ExtractionCompleted(String),
    ExtractionFailed(ExtractionFailure),
}

impl BackendEvent {
    /// Channel this event travels on.
    pub fn channel(&self) -> EventChannel {
        match self {
            BackendEvent::ModelStateChanged(_) => EventChannel::ModelStateChanged,
            BackendEvent::DownloadProgress(_) => EventChannel::DownloadProgress,
            BackendEvent::DownloadComplete(_) => EventChannel::DownloadComplete,
            BackendEvent::DownloadCancelled(_) => EventChannel::DownloadCancelled,
            BackendEvent::ExtractionStarted(_) => EventChannel::ExtractionStarted,
            BackendEvent::ExtractionCompleted(_) => EventChannel::ExtractionCompleted,
            BackendEvent::ExtractionFailed(_) => EventChannel::ExtractionFailed,
        }
    }
}
