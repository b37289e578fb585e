use serde::{Deserialize, Serialize};

/// Inference engine family a model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum EngineType {
    Whisper,
    Parakeet,
    Moonshine,
    SenseVoice,
}

/// Catalog entry describing a speech-recognition model, as reported by the
/// backend. Entries are never edited locally; the catalog is re-queried
/// whenever a download or extraction finishes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelInfo {
    /// Stable identifier used by every command and event.
    pub id: String,
    /// Human readable name, shown when no translation exists for the model.
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub engine_type: EngineType,
    /// Approximate download size in megabytes.
    #[serde(default)]
    pub size_mb: u64,
    #[serde(default)]
    pub is_downloaded: bool,
    #[serde(default)]
    pub is_downloading: bool,
    /// Archive models need an extraction step after the download.
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default)]
    pub accuracy_score: f32,
    #[serde(default)]
    pub speed_score: f32,
}

impl ModelInfo {
    /// Whether the "translate to English" option applies to this model.
    /// Only Whisper models support it, except the turbo variant.
    pub fn supports_translate_to_english(&self) -> bool {
        self.engine_type == EngineType::Whisper && self.id != "turbo"
    }
}

/// Aggregate status of the active model, as shown next to the display text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Ready,
    Loading,
    Downloading,
    Extracting,
    Error,
    /// Initial value until the first current-model query resolves.
    #[default]
    Unloaded,
    /// No model is configured at all.
    None,
}
