//! Lifecycle reducer: the single owner of model status, the active model id,
//! in-flight downloads and extractions, and the last error.

use std::collections::BTreeSet;

use modelsync_bridge::{
    BackendEvent, ModelInfo, ModelStatus,
    events::{LifecycleKind, ModelStateEvent},
};
use tokio::time::Instant;

use super::download_entity::{DownloadEntity, SpeedPolicy};

const LOAD_FAILED_MESSAGE: &str = "Failed to load model";

/// Follow-up work an event asks the owner of the entity to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Nothing,
    /// The catalog changed and should be fetched again.
    RefreshCatalog,
    /// A model became usable: refresh the catalog and consider activating it.
    ModelAvailable(String),
    /// The backend reported the loaded model; answers to current model
    /// queries issued earlier are out of date.
    CurrentConfirmed,
}

#[derive(Debug, Clone)]
pub struct ModelEntity {
    models: Vec<ModelInfo>,
    current_model_id: Option<String>,
    status: ModelStatus,
    error: Option<String>,
    downloads: DownloadEntity,
    extracting: BTreeSet<String>,
}

impl ModelEntity {
    pub fn new(policy: SpeedPolicy) -> Self {
        Self {
            models: Vec::new(),
            current_model_id: None,
            status: ModelStatus::Unloaded,
            error: None,
            downloads: DownloadEntity::new(policy),
            extracting: BTreeSet::new(),
        }
    }

    /// Applies a backend notification received at `now`.
    pub fn apply(&mut self, event: BackendEvent, now: Instant) -> Reaction {
        match event {
            BackendEvent::ModelStateChanged(event) => self.apply_lifecycle(event),
            BackendEvent::DownloadProgress(progress) => {
                self.downloads.record(progress, now);
                self.transition(ModelStatus::Downloading);
                Reaction::Nothing
            }
            BackendEvent::DownloadComplete(model_id) => {
                self.downloads.finish(&model_id);
                Reaction::ModelAvailable(model_id)
            }
            BackendEvent::DownloadCancelled(model_id) => {
                self.downloads.finish(&model_id);
                Reaction::RefreshCatalog
            }
            BackendEvent::ExtractionStarted(model_id) => {
                self.extracting.insert(model_id);
                self.transition(ModelStatus::Extracting);
                Reaction::Nothing
            }
            BackendEvent::ExtractionCompleted(model_id) => {
                self.extracting.remove(&model_id);
                Reaction::ModelAvailable(model_id)
            }
            BackendEvent::ExtractionFailed(failure) => {
                self.extracting.remove(&failure.model_id);
                self.fail(format!("Failed to extract model: {}", failure.error));
                Reaction::Nothing
            }
        }
    }

    fn apply_lifecycle(&mut self, event: ModelStateEvent) -> Reaction {
        let Some(kind) = event.kind() else {
            log::debug!("Ignoring unknown lifecycle event {:?}", event.event_type);
            return Reaction::Nothing;
        };

        match kind {
            LifecycleKind::LoadingStarted => self.transition(ModelStatus::Loading),
            LifecycleKind::LoadingCompleted => {
                self.transition(ModelStatus::Ready);
                if let Some(model_id) = event.model_id.filter(|id| !id.is_empty()) {
                    self.current_model_id = Some(model_id);
                }
                return Reaction::CurrentConfirmed;
            }
            LifecycleKind::LoadingFailed => {
                self.fail(event.error.unwrap_or_else(|| LOAD_FAILED_MESSAGE.to_string()))
            }
            LifecycleKind::Unloaded => self.transition(ModelStatus::Unloaded),
        }
        Reaction::Nothing
    }

    /// Optimistically marks `model_id` as current ahead of the activation
    /// command so that loading text already names the target model.
    pub fn begin_selection(&mut self, model_id: &str) {
        self.current_model_id = Some(model_id.to_string());
        self.error = None;
    }

    /// Records a failed activation attempt.
    pub fn activation_failed(&mut self, message: impl Into<String>) {
        self.fail(message);
    }

    /// Records a failed backend query.
    pub fn query_failed(&mut self, message: impl Into<String>) {
        self.fail(message);
    }

    /// Replaces the catalog with a freshly fetched one.
    pub fn set_models(&mut self, models: Vec<ModelInfo>) {
        self.models = models;
    }

    /// Settles status from the backend's configured model and the model the
    /// transcription engine actually has loaded. An empty `current` means no
    /// model is configured.
    pub fn resolve_current(&mut self, current: String, loaded: Option<String>) {
        if current.is_empty() {
            self.current_model_id = None;
            self.transition(ModelStatus::None);
            return;
        }

        let status = if loaded.as_deref() == Some(current.as_str()) {
            ModelStatus::Ready
        } else {
            ModelStatus::Unloaded
        };
        self.current_model_id = Some(current);
        self.transition(status);
    }

    fn transition(&mut self, status: ModelStatus) {
        self.status = status;
        self.error = None;
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.status = ModelStatus::Error;
        self.error = Some(message.into());
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn current_model_id(&self) -> Option<&str> {
        self.current_model_id.as_deref()
    }

    /// Catalog entry of the current model, if it is in the catalog.
    pub fn current_model(&self) -> Option<&ModelInfo> {
        self.current_model_id.as_deref().and_then(|id| self.model(id))
    }

    pub fn model(&self, model_id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|model| model.id == model_id)
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn downloads(&self) -> &DownloadEntity {
        &self.downloads
    }

    pub fn extracting(&self) -> &BTreeSet<String> {
        &self.extracting
    }

    pub fn is_extracting(&self, model_id: &str) -> bool {
        self.extracting.contains(model_id)
    }
}

impl Default for ModelEntity {
    fn default() -> Self {
        Self::new(SpeedPolicy::default())
    }
}
