//! Simulated backend context and its command surface.
//!
//! The context owns the shared state and the event hub, and provides helpers
//! for emitting lifecycle events to whoever listens.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use modelsync_bridge::{
    CommandError, EventChannel, EventHub, ModelCommands, ModelInfo,
    events::{LifecycleKind, ModelStateEvent},
};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::services;
use crate::state::{SharedState, State};

/// Pace of the simulated long-running operations.
#[derive(Debug, Clone)]
pub struct SimulationTiming {
    /// Pause between two download progress reports.
    pub progress_interval: Duration,
    /// Number of progress reports per download.
    pub progress_steps: u32,
    /// Time spent unpacking archive models.
    pub extraction_time: Duration,
    /// Time spent loading a model into the engine.
    pub load_time: Duration,
}

impl Default for SimulationTiming {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(250),
            progress_steps: 20,
            extraction_time: Duration::from_millis(800),
            load_time: Duration::from_millis(300),
        }
    }
}

/// In-process backend answering model commands and emitting lifecycle events
/// on an [`EventHub`].
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    /// Mutable backend state shared with running simulations.
    pub(crate) state: SharedState,
    /// Outbound lifecycle event channels.
    pub(crate) events: Arc<EventHub>,
    pub(crate) timing: SimulationTiming,
}

impl SimulatedBackend {
    pub fn new(models: Vec<ModelInfo>, current_model: Option<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::new(models, current_model))),
            events: Arc::new(EventHub::default()),
            timing: SimulationTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: SimulationTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Event hub the frontend subscribes to.
    pub fn events(&self) -> Arc<EventHub> {
        self.events.clone()
    }

    /// Marks every model in `model_ids` as already present on disk.
    pub async fn mark_downloaded(&self, model_ids: &[&str]) {
        let mut state = self.state.write().await;
        for model_id in model_ids {
            if let Some(model) = state.model_mut(model_id) {
                model.is_downloaded = true;
            }
        }
    }

    /// Starts or stops the simulated recording.
    pub async fn set_recording(&self, recording: bool) {
        self.state.write().await.recording = recording;
        log::info!("Recording {}", if recording { "started" } else { "stopped" });
    }

    /// Makes the next model load fail with `message`.
    pub async fn fail_next_load(&self, message: impl Into<String>) {
        self.state.write().await.next_load_failure = Some(message.into());
    }

    /// Makes the next extraction fail with `message`.
    pub async fn fail_next_extraction(&self, message: impl Into<String>) {
        self.state.write().await.next_extraction_failure = Some(message.into());
    }

    /// Downloads `model_id`, reporting progress along the way and extracting
    /// archive models afterwards. Completes once the model is usable, the
    /// download was cancelled or the extraction failed.
    pub async fn download_model(&self, model_id: &str) -> Result<(), CommandError> {
        services::model_service::download_model(self, model_id).await
    }

    /// Stops the download of `model_id` at its next progress step.
    pub async fn cancel_download(&self, model_id: &str) {
        self.state
            .write()
            .await
            .cancelled_downloads
            .insert(model_id.to_string());
    }

    /// Unloads the active model from the engine.
    pub async fn unload_model(&self) {
        self.state.write().await.loaded_model = None;
        self.emit(
            EventChannel::ModelStateChanged,
            &ModelStateEvent::new(LifecycleKind::Unloaded),
        );
    }

    /// Emits a lifecycle event. Encoding failures are logged and dropped,
    /// the same way a missing listener is.
    pub(crate) fn emit<T: Serialize>(&self, channel: EventChannel, payload: &T) {
        if let Err(error) = self.events.emit(channel, payload) {
            log::error!("Failed to emit event: {error}");
        }
    }
}

impl ModelCommands for SimulatedBackend {
    fn get_available_models(
        &self,
    ) -> impl Future<Output = Result<Vec<ModelInfo>, CommandError>> + Send {
        async move { Ok(self.state.read().await.models.clone()) }
    }

    fn get_current_model(&self) -> impl Future<Output = Result<String, CommandError>> + Send {
        async move {
            Ok(self
                .state
                .read()
                .await
                .current_model
                .clone()
                .unwrap_or_default())
        }
    }

    fn get_transcription_model_status(
        &self,
    ) -> impl Future<Output = Result<String, CommandError>> + Send {
        async move {
            Ok(self
                .state
                .read()
                .await
                .loaded_model
                .clone()
                .unwrap_or_default())
        }
    }

    fn set_active_model(
        &self,
        model_id: &str,
    ) -> impl Future<Output = Result<(), CommandError>> + Send {
        let model_id = model_id.to_string();
        async move { services::model_service::load_model(self, &model_id).await }
    }

    fn is_recording(&self) -> impl Future<Output = Result<bool, CommandError>> + Send {
        async move { Ok(self.state.read().await.recording) }
    }
}
