//! Resolution of the single status line shown for the model selector.

use modelsync_bridge::ModelStatus;

use crate::entities::ModelEntity;
use crate::formatting::clamp_percentage;
use crate::i18n::{Translator, keys};

/// Picks the text describing `entity`.
///
/// Extraction outranks downloads, which outrank the aggregate status: a
/// model being unpacked or fetched is more relevant than whatever the
/// engine reports meanwhile. The function is pure and returns the same text
/// for the same state.
pub fn resolve_display_text(entity: &ModelEntity, t: &dyn Translator) -> String {
    let extracting = entity.extracting();
    if !extracting.is_empty() {
        if extracting.len() > 1 {
            let count = extracting.len().to_string();
            return t.translate(keys::EXTRACTING_MULTIPLE, &[("count", &count)]);
        }

        let model_name = extracting
            .iter()
            .next()
            .and_then(|id| entity.model(id))
            .map(|model| t.model_name(model))
            .unwrap_or_else(|| {
                t.translate(keys::EXTRACTING_GENERIC, &[])
                    .replace("...", "")
            });
        return t.translate(keys::EXTRACTING, &[("modelName", &model_name)]);
    }

    let downloads = entity.downloads();
    if !downloads.is_empty() {
        if downloads.len() > 1 {
            let count = downloads.len().to_string();
            return t.translate(keys::DOWNLOADING_MULTIPLE, &[("count", &count)]);
        }

        let percentage = downloads
            .iter()
            .next()
            .map(|download| clamp_percentage(download.progress.percentage))
            .unwrap_or(0)
            .to_string();
        return t.translate(keys::DOWNLOADING, &[("percentage", &percentage)]);
    }

    let current_name = entity.current_model().map(|model| t.model_name(model));

    match entity.status() {
        ModelStatus::Ready => {
            current_name.unwrap_or_else(|| t.translate(keys::MODEL_READY, &[]))
        }
        ModelStatus::Loading => match current_name {
            Some(name) => t.translate(keys::LOADING, &[("modelName", &name)]),
            None => t.translate(keys::LOADING_GENERIC, &[]),
        },
        ModelStatus::Extracting => match current_name {
            Some(name) => t.translate(keys::EXTRACTING, &[("modelName", &name)]),
            None => t.translate(keys::EXTRACTING_GENERIC, &[]),
        },
        ModelStatus::Error => entity
            .error()
            .filter(|message| !message.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| t.translate(keys::MODEL_ERROR, &[])),
        ModelStatus::None => t.translate(keys::NO_MODEL_DOWNLOAD_REQUIRED, &[]),
        ModelStatus::Unloaded | ModelStatus::Downloading => {
            current_name.unwrap_or_else(|| t.translate(keys::MODEL_UNLOADED, &[]))
        }
    }
}

#[cfg(test)]
mod tests {
    use modelsync_bridge::{
        BackendEvent, EngineType, ModelInfo,
        events::{DownloadProgress, LifecycleKind, ModelStateEvent},
    };
    use tokio::time::Instant;

    use super::*;
    use crate::i18n::EnglishTranslator;

    fn model(id: &str, name: &str) -> ModelInfo {
        ModelInfo {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            engine_type: EngineType::Whisper,
            size_mb: 100,
            is_downloaded: true,
            is_downloading: false,
            is_directory: false,
            accuracy_score: 0.5,
            speed_score: 0.5,
        }
    }

    fn entity() -> ModelEntity {
        let mut entity = ModelEntity::default();
        entity.set_models(vec![
            model("base", "Whisper Base"),
            model("small", "Whisper Small"),
            model("parakeet", "Parakeet V3"),
        ]);
        entity
    }

    fn progress(model_id: &str, percentage: f64) -> BackendEvent {
        BackendEvent::DownloadProgress(DownloadProgress {
            model_id: model_id.into(),
            downloaded: 1,
            total: 100,
            percentage,
        })
    }

    fn text(entity: &ModelEntity) -> String {
        resolve_display_text(entity, &EnglishTranslator::new())
    }

    #[test]
    fn extraction_outranks_download() {
        let mut entity = entity();
        entity.apply(progress("small", 40.0), Instant::now());
        entity.apply(BackendEvent::ExtractionStarted("parakeet".into()), Instant::now());
        assert_eq!(text(&entity), "Extracting Parakeet V3...");
    }

    #[test]
    fn unknown_extracting_model_gets_generic_label() {
        let mut entity = entity();
        entity.apply(BackendEvent::ExtractionStarted("mystery".into()), Instant::now());
        assert_eq!(text(&entity), "Extracting Extracting...");
    }

    #[test]
    fn several_extractions_are_counted() {
        let mut entity = entity();
        entity.apply(BackendEvent::ExtractionStarted("parakeet".into()), Instant::now());
        entity.apply(BackendEvent::ExtractionStarted("base".into()), Instant::now());
        assert_eq!(text(&entity), "Extracting 2 models...");
    }

    #[test]
    fn single_download_shows_clamped_percentage() {
        let mut entity = entity();
        entity.apply(progress("base", 133.7), Instant::now());
        assert_eq!(text(&entity), "Downloading 100%");

        entity.apply(progress("base", 42.4), Instant::now());
        assert_eq!(text(&entity), "Downloading 42%");
    }

    #[test]
    fn several_downloads_are_counted() {
        let mut entity = entity();
        entity.apply(progress("base", 10.0), Instant::now());
        entity.apply(progress("small", 90.0), Instant::now());
        assert_eq!(text(&entity), "Downloading 2 models...");
    }

    #[test]
    fn status_texts_use_current_model_name() {
        let mut entity = entity();
        entity.begin_selection("base");

        entity.apply(
            BackendEvent::ModelStateChanged(ModelStateEvent::new(LifecycleKind::LoadingStarted)),
            Instant::now(),
        );
        assert_eq!(text(&entity), "Loading Whisper Base...");

        entity.apply(
            BackendEvent::ModelStateChanged(ModelStateEvent::new(LifecycleKind::LoadingCompleted)),
            Instant::now(),
        );
        assert_eq!(text(&entity), "Whisper Base");

        entity.apply(
            BackendEvent::ModelStateChanged(ModelStateEvent::new(LifecycleKind::Unloaded)),
            Instant::now(),
        );
        assert_eq!(text(&entity), "Whisper Base");
    }

    #[test]
    fn status_texts_without_current_model_are_generic() {
        let mut entity = entity();
        assert_eq!(text(&entity), "Model Unloaded");

        entity.apply(
            BackendEvent::ModelStateChanged(ModelStateEvent::new(LifecycleKind::LoadingStarted)),
            Instant::now(),
        );
        assert_eq!(text(&entity), "Loading...");

        entity.apply(
            BackendEvent::ModelStateChanged(ModelStateEvent::new(LifecycleKind::LoadingCompleted)),
            Instant::now(),
        );
        assert_eq!(text(&entity), "Model Ready");

        entity.resolve_current(String::new(), None);
        assert_eq!(text(&entity), "No Model - Download Required");
    }

    #[test]
    fn extracting_status_without_active_id_is_generic() {
        let mut entity = entity();
        entity.apply(BackendEvent::ExtractionStarted("parakeet".into()), Instant::now());
        entity.apply(BackendEvent::ExtractionCompleted("parakeet".into()), Instant::now());
        assert_eq!(entity.status(), ModelStatus::Extracting);
        assert_eq!(text(&entity), "Extracting...");
    }

    #[test]
    fn error_shows_stored_message() {
        let mut entity = entity();
        entity.activation_failed("Model not downloaded");
        assert_eq!(text(&entity), "Model not downloaded");

        entity.activation_failed("");
        assert_eq!(text(&entity), "Model Error");
    }

    #[test]
    fn resolution_is_repeatable() {
        let mut entity = entity();
        entity.apply(progress("base", 12.0), Instant::now());
        assert_eq!(text(&entity), text(&entity));
    }
}
