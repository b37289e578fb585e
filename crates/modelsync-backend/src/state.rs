use std::collections::HashSet;

use modelsync_bridge::ModelInfo;

/// The core backend state: the model catalog, which model is configured and
/// loaded, and whether a recording is running.
///
/// It is designed to be wrapped in thread-safe, async-friendly concurrency
/// primitives (see [`SharedState`]) so that command handlers and simulated
/// downloads can run concurrently.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Every model the backend knows about.
    pub models: Vec<ModelInfo>,
    /// Model selected by the user, if any.
    pub current_model: Option<String>,
    /// Model the transcription engine has loaded, if any.
    pub loaded_model: Option<String>,
    /// Whether audio is being captured right now.
    pub recording: bool,
    /// Downloads asked to stop at their next progress step.
    pub cancelled_downloads: HashSet<String>,
    /// Error returned by the next model load instead of loading it.
    pub next_load_failure: Option<String>,
    /// Error returned by the next extraction instead of completing it.
    pub next_extraction_failure: Option<String>,
}

impl State {
    pub fn new(models: Vec<ModelInfo>, current_model: Option<String>) -> Self {
        Self {
            models,
            current_model,
            ..Self::default()
        }
    }

    pub fn model(&self, model_id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|model| model.id == model_id)
    }

    pub fn model_mut(&mut self, model_id: &str) -> Option<&mut ModelInfo> {
        self.models.iter_mut().find(|model| model.id == model_id)
    }
}

/// Thread-safe, async-friendly shared reference to the backend [`State`].
pub type SharedState = std::sync::Arc<tokio::sync::RwLock<State>>;
