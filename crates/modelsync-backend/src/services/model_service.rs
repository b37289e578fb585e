use modelsync_bridge::{
    CommandError, EventChannel,
    events::{DownloadProgress, ExtractionFailure, LifecycleKind, ModelStateEvent},
};

use crate::app::SimulatedBackend;

const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Handles a model activation request (see
/// [`modelsync_bridge::ModelCommands::set_active_model`]).
///
/// The model becomes the configured one right away; `loading_started` and
/// `loading_completed` (or `loading_failed`) bracket the time the engine
/// spends loading it.
pub async fn load_model(backend: &SimulatedBackend, model_id: &str) -> Result<(), CommandError> {
    let model = {
        let state = backend.state.read().await;
        state.model(model_id).cloned()
    };
    let Some(model) = model else {
        return Err(CommandError::Rejected(format!("Model not found: {model_id}")));
    };
    if !model.is_downloaded {
        return Err(CommandError::Rejected(format!(
            "Model not downloaded: {model_id}"
        )));
    }

    {
        let mut state = backend.state.write().await;
        state.current_model = Some(model.id.clone());
        state.loaded_model = None;
    }

    log::info!("Loading model {}", model.id);
    backend.emit(
        EventChannel::ModelStateChanged,
        &ModelStateEvent::new(LifecycleKind::LoadingStarted).with_model(&model.id, &model.name),
    );

    tokio::time::sleep(backend.timing.load_time).await;

    let failure = backend.state.write().await.next_load_failure.take();
    if let Some(error) = failure {
        log::error!("Failed to load model {}: {error}", model.id);
        backend.emit(
            EventChannel::ModelStateChanged,
            &ModelStateEvent::new(LifecycleKind::LoadingFailed)
                .with_model(&model.id, &model.name)
                .with_error(&error),
        );
        return Err(CommandError::Rejected(error));
    }

    backend.state.write().await.loaded_model = Some(model.id.clone());
    backend.emit(
        EventChannel::ModelStateChanged,
        &ModelStateEvent::new(LifecycleKind::LoadingCompleted).with_model(&model.id, &model.name),
    );
    Ok(())
}

/// Simulates downloading `model_id`: progress reports at a fixed pace, then
/// extraction for archive models, then the completion event.
pub async fn download_model(backend: &SimulatedBackend, model_id: &str) -> Result<(), CommandError> {
    let model = {
        let mut state = backend.state.write().await;
        state.cancelled_downloads.remove(model_id);
        match state.model_mut(model_id) {
            Some(model) if model.is_downloaded => {
                log::info!("Model {model_id} is already downloaded");
                return Ok(());
            }
            Some(model) => {
                model.is_downloading = true;
                model.clone()
            }
            None => {
                return Err(CommandError::Rejected(format!("Model not found: {model_id}")));
            }
        }
    };

    let total = model.size_mb.max(1) * BYTES_PER_MEGABYTE;
    let steps = backend.timing.progress_steps.max(1) as u64;
    log::info!("Downloading model {model_id} ({total} bytes)");

    for step in 1..=steps {
        let cancelled = backend
            .state
            .write()
            .await
            .cancelled_downloads
            .remove(model_id);
        if cancelled {
            set_downloading(backend, model_id, false).await;
            log::info!("Download of {model_id} cancelled");
            backend.emit(EventChannel::DownloadCancelled, &model_id);
            return Ok(());
        }

        let downloaded = total * step / steps;
        backend.emit(
            EventChannel::DownloadProgress,
            &DownloadProgress {
                model_id: model_id.to_string(),
                downloaded,
                total,
                percentage: downloaded as f64 / total as f64 * 100.0,
            },
        );
        tokio::time::sleep(backend.timing.progress_interval).await;
    }

    if model.is_directory {
        backend.emit(EventChannel::ExtractionStarted, &model_id);
        tokio::time::sleep(backend.timing.extraction_time).await;

        let failure = backend.state.write().await.next_extraction_failure.take();
        if let Some(error) = failure {
            set_downloading(backend, model_id, false).await;
            log::error!("Failed to extract {model_id}: {error}");
            backend.emit(
                EventChannel::ExtractionFailed,
                &ExtractionFailure {
                    model_id: model_id.to_string(),
                    error: error.clone(),
                },
            );
            return Err(CommandError::Fault(error));
        }
    }

    {
        let mut state = backend.state.write().await;
        if let Some(model) = state.model_mut(model_id) {
            model.is_downloading = false;
            model.is_downloaded = true;
        }
    }

    if model.is_directory {
        backend.emit(EventChannel::ExtractionCompleted, &model_id);
    }
    log::info!("Model {model_id} downloaded");
    backend.emit(EventChannel::DownloadComplete, &model_id);
    Ok(())
}

async fn set_downloading(backend: &SimulatedBackend, model_id: &str, downloading: bool) {
    if let Some(model) = backend.state.write().await.model_mut(model_id) {
        model.is_downloading = downloading;
    }
}
