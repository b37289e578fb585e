use modelsync_bridge::{ModelInfo, ModelStatus};
use serde::Serialize;

use crate::display::resolve_display_text;
use crate::entities::{DownloadSnapshot, ModelEntity};
use crate::i18n::Translator;

/// Complete view of the selector state after one update.
///
/// Snapshots are only ever published whole, so observers see either the
/// state before an event or the state after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorSnapshot {
    pub status: ModelStatus,
    pub display_text: String,
    pub current_model_id: Option<String>,
    /// Catalog entry of the current model, once the catalog knows it.
    pub current_model: Option<ModelInfo>,
    pub error: Option<String>,
    pub models: Vec<ModelInfo>,
    pub downloads: Vec<DownloadSnapshot>,
    /// Ids of the models being extracted, in id order.
    pub extracting: Vec<String>,
}

impl SelectorSnapshot {
    pub fn capture(entity: &ModelEntity, translator: &dyn Translator) -> Self {
        Self {
            status: entity.status(),
            display_text: resolve_display_text(entity, translator),
            current_model_id: entity.current_model_id().map(str::to_string),
            current_model: entity.current_model().cloned(),
            error: entity.error().map(str::to_string),
            models: entity.models().to_vec(),
            downloads: entity.downloads().iter().map(DownloadSnapshot::from).collect(),
            extracting: entity.extracting().iter().cloned().collect(),
        }
    }

    /// Whether the translate-to-English setting applies to the current model.
    pub fn supports_translate_to_english(&self) -> bool {
        self.current_model
            .as_ref()
            .is_some_and(ModelInfo::supports_translate_to_english)
    }
}
