use serde::{Deserialize, Serialize};

/// Tuning of the model selector (download speed estimation and automatic
/// activation of freshly installed models).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Whether a model is activated automatically once it finished
    /// downloading or extracting.
    pub auto_activate: bool,
    /// Delay in milliseconds between a completion event and the automatic
    /// activation attempt.
    pub auto_activation_delay_ms: u64,
    /// Minimum time in milliseconds between two transfer speed
    /// recomputations for the same download.
    pub speed_sample_interval_ms: u64,
    /// Weight given to the newest sample by the speed moving average, in
    /// `0.0..=1.0`.
    pub speed_smoothing: f64,
    /// Capacity of the selector inbox.
    pub event_buffer: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            auto_activate: true,
            auto_activation_delay_ms: 500,
            speed_sample_interval_ms: 500,
            speed_smoothing: 0.2,
            event_buffer: 64,
        }
    }
}

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Model selector settings.
    pub selector: SelectorConfig,
    /// Id of the model selected during the previous run, if any.
    pub selected_model: Option<String>,
}
