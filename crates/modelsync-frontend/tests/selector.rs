use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use modelsync_backend::{SimulatedBackend, catalog::default_catalog};
use modelsync_bridge::{
    CommandError, EngineType, EventChannel, EventHub, ModelCommands, ModelInfo, ModelStatus,
    config::SelectorConfig,
    events::{DownloadProgress, ExtractionFailure, LifecycleKind, ModelStateEvent},
};
use modelsync_frontend::{ModelSelector, SelectorSnapshot};

/// Scripted answers of [`FakeBackend`].
#[derive(Default)]
struct Script {
    models: Vec<ModelInfo>,
    current: String,
    loaded: String,
    recording: bool,
    recording_unknown: bool,
    catalog_fails: bool,
    current_fails: bool,
    current_delay: Duration,
    activation_error: Option<String>,
    activation_panics: bool,
    activations: Vec<String>,
}

#[derive(Default)]
struct FakeBackend {
    script: Mutex<Script>,
}

impl FakeBackend {
    fn new(current: &str, loaded: &str) -> Arc<Self> {
        let backend = Self::default();
        {
            let mut script = backend.script.lock().unwrap();
            script.models = vec![
                model("base", "Whisper Base", EngineType::Whisper),
                model("parakeet-tdt-0.6b-v3", "Parakeet V3", EngineType::Parakeet),
            ];
            script.current = current.to_string();
            script.loaded = loaded.to_string();
        }
        Arc::new(backend)
    }

    fn edit(&self, change: impl FnOnce(&mut Script)) {
        change(&mut self.script.lock().unwrap());
    }

    fn activations(&self) -> Vec<String> {
        self.script.lock().unwrap().activations.clone()
    }
}

impl ModelCommands for FakeBackend {
    fn get_available_models(
        &self,
    ) -> impl Future<Output = Result<Vec<ModelInfo>, CommandError>> + Send {
        async move {
            let script = self.script.lock().unwrap();
            if script.catalog_fails {
                return Err(CommandError::Rejected("catalog unavailable".into()));
            }
            Ok(script.models.clone())
        }
    }

    fn get_current_model(&self) -> impl Future<Output = Result<String, CommandError>> + Send {
        async move {
            let (delay, answer) = {
                let script = self.script.lock().unwrap();
                let answer = if script.current_fails {
                    Err(CommandError::Rejected("settings unavailable".into()))
                } else {
                    Ok(script.current.clone())
                };
                (script.current_delay, answer)
            };
            tokio::time::sleep(delay).await;
            answer
        }
    }

    fn get_transcription_model_status(
        &self,
    ) -> impl Future<Output = Result<String, CommandError>> + Send {
        async move { Ok(self.script.lock().unwrap().loaded.clone()) }
    }

    fn set_active_model(
        &self,
        model_id: &str,
    ) -> impl Future<Output = Result<(), CommandError>> + Send {
        let model_id = model_id.to_string();
        async move {
            let (error, panics) = {
                let mut script = self.script.lock().unwrap();
                script.activations.push(model_id.clone());
                (script.activation_error.clone(), script.activation_panics)
            };
            tokio::time::sleep(Duration::from_millis(20)).await;
            if panics {
                panic!("engine crashed");
            }
            match error {
                Some(message) => Err(CommandError::Rejected(message)),
                None => {
                    self.script.lock().unwrap().current = model_id;
                    Ok(())
                }
            }
        }
    }

    fn is_recording(&self) -> impl Future<Output = Result<bool, CommandError>> + Send {
        async move {
            let script = self.script.lock().unwrap();
            if script.recording_unknown {
                return Err(CommandError::Fault("audio device gone".into()));
            }
            Ok(script.recording)
        }
    }
}

fn model(id: &str, name: &str, engine_type: EngineType) -> ModelInfo {
    ModelInfo {
        id: id.into(),
        name: name.into(),
        description: String::new(),
        engine_type,
        size_mb: 100,
        is_downloaded: true,
        is_downloading: false,
        is_directory: engine_type == EngineType::Parakeet,
        accuracy_score: 0.5,
        speed_score: 0.5,
    }
}

fn progress(model_id: &str, downloaded: u64, total: u64) -> DownloadProgress {
    DownloadProgress {
        model_id: model_id.into(),
        downloaded,
        total,
        percentage: downloaded as f64 / total as f64 * 100.0,
    }
}

/// Waits until a published snapshot satisfies `predicate`.
async fn settled(
    selector: &ModelSelector,
    predicate: impl FnMut(&SelectorSnapshot) -> bool,
) -> SelectorSnapshot {
    let mut snapshots = selector.subscribe();
    tokio::time::timeout(Duration::from_secs(60), snapshots.wait_for(predicate))
        .await
        .expect("selector never reached the expected state")
        .expect("selector stopped")
        .clone()
}

/// Lets every pending task and timer run.
async fn idle(duration_ms: u64) {
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
}

#[tokio::test(start_paused = true)]
async fn no_configured_model_asks_for_a_download() {
    let backend = FakeBackend::new("", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend).start(&hub);

    assert_eq!(selector.status(), ModelStatus::Unloaded);
    let snapshot = settled(&selector, |s| s.status == ModelStatus::None).await;

    assert_eq!(snapshot.display_text, "No Model - Download Required");
    assert_eq!(snapshot.current_model_id, None);
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn loaded_model_settles_as_ready() {
    let backend = FakeBackend::new("base", "base");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend).start(&hub);

    let snapshot = settled(&selector, |s| {
        s.status == ModelStatus::Ready && s.current_model.is_some()
    })
    .await;

    assert_eq!(snapshot.display_text, "Whisper Base");
    assert_eq!(snapshot.current_model_id.as_deref(), Some("base"));
    assert!(snapshot.supports_translate_to_english());
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn configured_but_not_loaded_model_is_unloaded() {
    let backend = FakeBackend::new("base", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend).start(&hub);

    let snapshot = settled(&selector, |s| {
        s.current_model_id.is_some() && s.current_model.is_some()
    })
    .await;

    assert_eq!(snapshot.status, ModelStatus::Unloaded);
    assert_eq!(snapshot.display_text, "Whisper Base");
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn selection_is_applied_before_the_backend_answers() {
    let backend = FakeBackend::new("", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    selector.select_model("parakeet-tdt-0.6b-v3").await.unwrap();
    let snapshot = settled(&selector, |s| {
        s.current_model_id.as_deref() == Some("parakeet-tdt-0.6b-v3")
    })
    .await;
    assert_eq!(snapshot.error, None);

    hub.emit(
        EventChannel::ModelStateChanged,
        &ModelStateEvent::new(LifecycleKind::LoadingStarted),
    )
    .unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Loading).await;
    assert_eq!(snapshot.display_text, "Loading Parakeet V3...");

    hub.emit(
        EventChannel::ModelStateChanged,
        &ModelStateEvent::new(LifecycleKind::LoadingCompleted)
            .with_model("parakeet-tdt-0.6b-v3", "Parakeet V3"),
    )
    .unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Ready).await;
    assert_eq!(snapshot.display_text, "Parakeet V3");
    assert!(!snapshot.supports_translate_to_english());

    assert_eq!(backend.activations(), vec!["parakeet-tdt-0.6b-v3".to_string()]);
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_activation_reports_the_error() {
    let backend = FakeBackend::new("", "");
    backend.edit(|script| script.activation_error = Some("Model file is corrupt".into()));
    let hub = EventHub::default();
    let reported = Arc::new(Mutex::new(Vec::new()));
    let selector = ModelSelector::builder(backend)
        .on_error({
            let reported = reported.clone();
            move |message| reported.lock().unwrap().push(message.to_string())
        })
        .start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    selector.select_model("base").await.unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Error).await;

    assert_eq!(snapshot.error.as_deref(), Some("Model file is corrupt"));
    assert_eq!(snapshot.display_text, "Model file is corrupt");
    assert_eq!(*reported.lock().unwrap(), vec!["Model file is corrupt".to_string()]);
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn panicking_activation_is_reported_as_an_error() {
    let backend = FakeBackend::new("", "");
    backend.edit(|script| script.activation_panics = true);
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    selector.select_model("base").await.unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Error).await;

    assert_eq!(snapshot.error.as_deref(), Some("engine crashed"));
    selector.select_model("base").await.expect("selector keeps running");
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn lifecycle_failure_uses_the_default_message() {
    let backend = FakeBackend::new("base", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend).start(&hub);
    settled(&selector, |s| s.current_model.is_some()).await;

    hub.emit(
        EventChannel::ModelStateChanged,
        &ModelStateEvent::new(LifecycleKind::LoadingFailed),
    )
    .unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Error).await;
    assert_eq!(snapshot.error.as_deref(), Some("Failed to load model"));

    hub.emit(
        EventChannel::ModelStateChanged,
        &ModelStateEvent::new(LifecycleKind::Unloaded),
    )
    .unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Unloaded).await;
    assert_eq!(snapshot.error, None);
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn finished_download_is_activated_when_idle() {
    let backend = FakeBackend::new("", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    hub.emit(EventChannel::DownloadProgress, &progress("base", 50, 100))
        .unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Downloading).await;
    assert_eq!(snapshot.display_text, "Downloading 50%");

    hub.emit(EventChannel::DownloadComplete, &"base").unwrap();
    idle(100).await;
    assert!(backend.activations().is_empty(), "activation waits for the delay");

    idle(1_000).await;
    assert_eq!(backend.activations(), vec!["base".to_string()]);
    let snapshot = selector.snapshot();
    assert!(snapshot.downloads.is_empty());
    assert_eq!(snapshot.current_model_id.as_deref(), Some("base"));
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn recording_blocks_auto_activation() {
    let backend = FakeBackend::new("", "");
    backend.edit(|script| script.recording = true);
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    hub.emit(EventChannel::DownloadComplete, &"base").unwrap();
    idle(2_000).await;

    assert!(backend.activations().is_empty());
    assert_eq!(selector.snapshot().current_model_id, None);
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_recording_state_blocks_auto_activation() {
    let backend = FakeBackend::new("", "");
    backend.edit(|script| script.recording_unknown = true);
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    hub.emit(EventChannel::ExtractionCompleted, &"parakeet-tdt-0.6b-v3")
        .unwrap();
    idle(2_000).await;

    assert!(backend.activations().is_empty());
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_auto_activation_leaves_models_alone() {
    let backend = FakeBackend::new("", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone())
        .config(SelectorConfig {
            auto_activate: false,
            ..SelectorConfig::default()
        })
        .start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    hub.emit(EventChannel::DownloadComplete, &"base").unwrap();
    idle(2_000).await;

    assert!(backend.activations().is_empty());
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn extraction_and_download_completion_activate_once() {
    let backend = FakeBackend::new("", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    hub.emit(EventChannel::ExtractionStarted, &"parakeet-tdt-0.6b-v3")
        .unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Extracting).await;
    assert_eq!(snapshot.display_text, "Extracting Parakeet V3...");

    hub.emit(EventChannel::ExtractionCompleted, &"parakeet-tdt-0.6b-v3")
        .unwrap();
    idle(100).await;
    hub.emit(EventChannel::DownloadComplete, &"parakeet-tdt-0.6b-v3")
        .unwrap();
    idle(2_000).await;

    assert_eq!(backend.activations(), vec!["parakeet-tdt-0.6b-v3".to_string()]);
    assert!(selector.snapshot().extracting.is_empty());
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn extraction_failure_is_shown() {
    let backend = FakeBackend::new("", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    hub.emit(EventChannel::ExtractionStarted, &"parakeet-tdt-0.6b-v3")
        .unwrap();
    settled(&selector, |s| s.status == ModelStatus::Extracting).await;
    hub.emit(
        EventChannel::ExtractionFailed,
        &ExtractionFailure {
            model_id: "parakeet-tdt-0.6b-v3".into(),
            error: "archive truncated".into(),
        },
    )
    .unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Error).await;

    assert_eq!(
        snapshot.display_text,
        "Failed to extract model: archive truncated"
    );
    assert!(snapshot.extracting.is_empty());
    idle(2_000).await;
    assert!(backend.activations().is_empty());
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_downloads_are_counted() {
    let backend = FakeBackend::new("", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    hub.emit(EventChannel::DownloadProgress, &progress("base", 10, 100))
        .unwrap();
    hub.emit(
        EventChannel::DownloadProgress,
        &progress("parakeet-tdt-0.6b-v3", 30, 100),
    )
    .unwrap();
    let snapshot = settled(&selector, |s| s.downloads.len() == 2).await;
    assert_eq!(snapshot.display_text, "Downloading 2 models...");

    hub.emit(EventChannel::DownloadCancelled, &"base").unwrap();
    let snapshot = settled(&selector, |s| s.downloads.len() == 1).await;
    assert_eq!(snapshot.display_text, "Downloading 30%");
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stale_current_model_answer_does_not_undo_a_selection() {
    let backend = FakeBackend::new("base", "base");
    backend.edit(|script| script.current_delay = Duration::from_millis(500));
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend).start(&hub);

    selector.select_model("parakeet-tdt-0.6b-v3").await.unwrap();
    idle(2_000).await;

    let snapshot = selector.snapshot();
    assert_eq!(
        snapshot.current_model_id.as_deref(),
        Some("parakeet-tdt-0.6b-v3")
    );
    assert_eq!(snapshot.status, ModelStatus::Unloaded);
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stale_current_model_answer_does_not_undo_a_completed_load() {
    let backend = FakeBackend::new("base", "");
    backend.edit(|script| script.current_delay = Duration::from_millis(500));
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend).start(&hub);

    idle(100).await;
    hub.emit(
        EventChannel::ModelStateChanged,
        &ModelStateEvent::new(LifecycleKind::LoadingCompleted)
            .with_model("parakeet-tdt-0.6b-v3", "Parakeet V3"),
    )
    .unwrap();
    settled(&selector, |s| s.status == ModelStatus::Ready).await;
    idle(1_000).await;

    let snapshot = selector.snapshot();
    assert_eq!(snapshot.status, ModelStatus::Ready);
    assert_eq!(
        snapshot.current_model_id.as_deref(),
        Some("parakeet-tdt-0.6b-v3")
    );
    assert_eq!(snapshot.display_text, "Parakeet V3");
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_queries_surface_their_messages() {
    let backend = FakeBackend::new("", "");
    backend.edit(|script| script.current_fails = true);
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);

    let snapshot = settled(&selector, |s| s.status == ModelStatus::Error).await;
    assert_eq!(snapshot.error.as_deref(), Some("Failed to check model status"));

    backend.edit(|script| {
        script.current_fails = false;
        script.catalog_fails = true;
        script.current_delay = Duration::from_secs(1);
    });
    selector.refresh().await.unwrap();
    let snapshot = settled(&selector, |s| {
        s.error.as_deref() == Some("Failed to load models")
    })
    .await;
    assert_eq!(snapshot.status, ModelStatus::Error);

    let snapshot = settled(&selector, |s| s.status == ModelStatus::None).await;
    assert_eq!(snapshot.error, None);
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stopped_selector_ignores_further_events() {
    let backend = FakeBackend::new("", "");
    let hub = EventHub::default();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    hub.emit(EventChannel::DownloadComplete, &"base").unwrap();
    let snapshots = selector.subscribe();
    selector.stop().await;
    idle(100).await;

    for channel in EventChannel::ALL {
        assert_eq!(hub.listener_count(channel), 0, "{channel} still subscribed");
    }
    hub.emit(EventChannel::DownloadProgress, &progress("base", 1, 2))
        .unwrap();
    idle(2_000).await;

    assert_eq!(snapshots.borrow().status, ModelStatus::None);
    assert!(snapshots.borrow().downloads.is_empty());
    assert!(backend.activations().is_empty(), "pending activation was cancelled");
}

#[tokio::test(start_paused = true)]
async fn simulated_backend_end_to_end() {
    let backend = Arc::new(SimulatedBackend::new(default_catalog(), None));
    backend.mark_downloaded(&["base"]).await;
    let hub = backend.events();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.status == ModelStatus::None).await;

    selector.select_model("base").await.unwrap();
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Ready).await;
    assert_eq!(snapshot.display_text, "Whisper Base");

    let download = tokio::spawn({
        let backend = backend.clone();
        async move { backend.download_model("parakeet-tdt-0.6b-v3").await }
    });
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Downloading).await;
    assert!(snapshot.display_text.starts_with("Downloading "));
    settled(&selector, |s| s.status == ModelStatus::Extracting).await;
    download.await.unwrap().unwrap();

    let snapshot = settled(&selector, |s| {
        s.status == ModelStatus::Ready
            && s.current_model_id.as_deref() == Some("parakeet-tdt-0.6b-v3")
    })
    .await;
    assert_eq!(snapshot.display_text, "Parakeet V3");
    assert!(snapshot.downloads.is_empty());
    let parakeet = snapshot
        .models
        .iter()
        .find(|model| model.id == "parakeet-tdt-0.6b-v3")
        .unwrap();
    assert!(parakeet.is_downloaded);
    selector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn simulated_recording_holds_back_a_new_model() {
    let backend = Arc::new(SimulatedBackend::new(
        default_catalog(),
        Some("base".to_string()),
    ));
    backend.mark_downloaded(&["base"]).await;
    let hub = backend.events();
    let selector = ModelSelector::builder(backend.clone()).start(&hub);
    settled(&selector, |s| s.current_model.is_some()).await;

    backend.set_recording(true).await;
    backend.download_model("small").await.unwrap();
    idle(2_000).await;

    let snapshot = selector.snapshot();
    assert_eq!(snapshot.current_model_id.as_deref(), Some("base"));
    assert!(snapshot.models.iter().any(|model| model.id == "small" && model.is_downloaded));

    backend.set_recording(false).await;
    selector.select_model("small").await.unwrap();
    settled(&selector, |s| {
        s.status == ModelStatus::Ready && s.display_text == "Whisper Small"
    })
    .await;

    backend.unload_model().await;
    let snapshot = settled(&selector, |s| s.status == ModelStatus::Unloaded).await;
    assert_eq!(snapshot.display_text, "Whisper Small");
    selector.stop().await;
}
