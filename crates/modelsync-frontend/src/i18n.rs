//! Translation seam used to render status strings.

use std::collections::HashMap;

use modelsync_bridge::ModelInfo;

/// Translation keys used by the model selector.
pub mod keys {
    pub const EXTRACTING: &str = "modelSelector.extracting";
    pub const EXTRACTING_GENERIC: &str = "modelSelector.extractingGeneric";
    pub const EXTRACTING_MULTIPLE: &str = "modelSelector.extractingMultiple";
    pub const DOWNLOADING: &str = "modelSelector.downloading";
    pub const DOWNLOADING_MULTIPLE: &str = "modelSelector.downloadingMultiple";
    pub const LOADING: &str = "modelSelector.loading";
    pub const LOADING_GENERIC: &str = "modelSelector.loadingGeneric";
    pub const MODEL_READY: &str = "modelSelector.modelReady";
    pub const MODEL_ERROR: &str = "modelSelector.modelError";
    pub const MODEL_UNLOADED: &str = "modelSelector.modelUnloaded";
    pub const NO_MODEL_DOWNLOAD_REQUIRED: &str = "modelSelector.noModelDownloadRequired";
}

/// Looks up user-facing strings.
///
/// Implementations follow the i18next convention: an unknown key translates
/// to itself, and `{{name}}` placeholders are replaced by the matching
/// argument.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String;

    /// Localized name of a model, falling back to the catalog name.
    fn model_name(&self, model: &ModelInfo) -> String {
        let key = format!("onboarding.models.{}.name", model.id);
        let translated = self.translate(&key, &[]);
        if translated == key {
            model.name.clone()
        } else {
            translated
        }
    }
}

/// Built-in English strings.
#[derive(Debug, Clone)]
pub struct EnglishTranslator {
    strings: HashMap<&'static str, &'static str>,
}

impl EnglishTranslator {
    pub fn new() -> Self {
        let strings = HashMap::from([
            (keys::EXTRACTING, "Extracting {{modelName}}..."),
            (keys::EXTRACTING_GENERIC, "Extracting..."),
            (keys::EXTRACTING_MULTIPLE, "Extracting {{count}} models..."),
            (keys::DOWNLOADING, "Downloading {{percentage}}%"),
            (keys::DOWNLOADING_MULTIPLE, "Downloading {{count}} models..."),
            (keys::LOADING, "Loading {{modelName}}..."),
            (keys::LOADING_GENERIC, "Loading..."),
            (keys::MODEL_READY, "Model Ready"),
            (keys::MODEL_ERROR, "Model Error"),
            (keys::MODEL_UNLOADED, "Model Unloaded"),
            (keys::NO_MODEL_DOWNLOAD_REQUIRED, "No Model - Download Required"),
        ]);
        Self { strings }
    }
}

impl Default for EnglishTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for EnglishTranslator {
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.strings.get(key) else {
            return key.to_string();
        };
        interpolate(template, args)
    }
}

/// Replaces `{{name}}` placeholders in `template`.
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{{{name}}}}}"), value)
    })
}
