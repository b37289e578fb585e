use modelsync_bridge::{EngineType, ModelInfo};

fn entry(
    id: &str,
    name: &str,
    description: &str,
    engine_type: EngineType,
    size_mb: u64,
    is_directory: bool,
    (accuracy_score, speed_score): (f32, f32),
) -> ModelInfo {
    ModelInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        engine_type,
        size_mb,
        is_downloaded: false,
        is_downloading: false,
        is_directory,
        accuracy_score,
        speed_score,
    }
}

/// Catalog served by the simulated backend. Nothing is downloaded yet.
pub fn default_catalog() -> Vec<ModelInfo> {
    vec![
        entry(
            "small",
            "Whisper Small",
            "Fast and fairly accurate.",
            EngineType::Whisper,
            487,
            false,
            (0.60, 0.85),
        ),
        entry(
            "base",
            "Whisper Base",
            "Small and quick, good for short dictation.",
            EngineType::Whisper,
            142,
            false,
            (0.50, 0.90),
        ),
        entry(
            "turbo",
            "Whisper Turbo",
            "Balanced accuracy and speed.",
            EngineType::Whisper,
            1600,
            false,
            (0.80, 0.40),
        ),
        entry(
            "parakeet-tdt-0.6b-v3",
            "Parakeet V3",
            "Fast and accurate, European languages.",
            EngineType::Parakeet,
            478,
            true,
            (0.80, 0.85),
        ),
    ]
}
