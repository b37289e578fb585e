use std::future::Future;

use crate::model::ModelInfo;

/// Failure of a backend command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The backend processed the request and answered with an error result.
    #[error("{0}")]
    Rejected(String),
    /// The request never produced a result (transport failure, crash).
    #[error("{0}")]
    Fault(String),
}

impl CommandError {
    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        match self {
            CommandError::Rejected(message) | CommandError::Fault(message) => message,
        }
    }
}

/// Request/response surface of the backend used by the presentation layer.
///
/// Every call is an independent asynchronous request; issuing a new call
/// never cancels one that is already in flight.
pub trait ModelCommands: Send + Sync + 'static {
    /// Lists the model catalog.
    fn get_available_models(
        &self,
    ) -> impl Future<Output = Result<Vec<ModelInfo>, CommandError>> + Send;

    /// Id of the configured model, empty when none is configured.
    fn get_current_model(&self) -> impl Future<Output = Result<String, CommandError>> + Send;

    /// Id of the model the transcription engine has loaded, empty when
    /// nothing is loaded.
    fn get_transcription_model_status(
        &self,
    ) -> impl Future<Output = Result<String, CommandError>> + Send;

    /// Makes `model_id` the active model.
    fn set_active_model(
        &self,
        model_id: &str,
    ) -> impl Future<Output = Result<(), CommandError>> + Send;

    /// Whether a recording is in progress right now.
    fn is_recording(&self) -> impl Future<Output = Result<bool, CommandError>> + Send;
}
