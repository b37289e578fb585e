//! The model selector: a single task owning the lifecycle state, fed by the
//! event bridge, by user actions and by the results of backend queries.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use modelsync_bridge::{
    BackendEvent, CommandError, EventSource, ModelCommands, ModelInfo, ModelStatus,
    config::SelectorConfig,
};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use crate::bridge::EventBridge;
use crate::coordinator::AutoActivation;
use crate::entities::{ModelEntity, Reaction, SpeedPolicy};
use crate::i18n::{EnglishTranslator, Translator};
use crate::snapshot::SelectorSnapshot;

const CATALOG_FAILED_MESSAGE: &str = "Failed to load models";
const STATUS_FAILED_MESSAGE: &str = "Failed to check model status";

/// Invoked with the user-facing message whenever activating a model fails.
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("model selector has stopped")]
    Stopped,
}

#[derive(Debug)]
pub(crate) enum SelectorMessage {
    Select(String),
    Refresh,
    CatalogLoaded {
        ticket: u64,
        result: Result<Vec<ModelInfo>, CommandError>,
    },
    CurrentModelLoaded {
        ticket: u64,
        result: Result<(String, Option<String>), CommandError>,
    },
    ActivationFinished {
        model_id: String,
        result: Result<(), CommandError>,
    },
    AutoActivate {
        model_id: String,
        attempt: u64,
        previous: Option<String>,
    },
    AutoActivationSkipped {
        model_id: String,
        attempt: u64,
    },
    Shutdown,
}

/// Hands out increasing tickets so that only the newest query of a kind may
/// apply its result.
#[derive(Debug, Default)]
struct Sequencer {
    issued: u64,
}

impl Sequencer {
    fn next(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn is_latest(&self, ticket: u64) -> bool {
        ticket == self.issued
    }
}

/// Configures and starts a [`ModelSelector`].
pub struct SelectorBuilder<B> {
    backend: Arc<B>,
    translator: Arc<dyn Translator>,
    config: SelectorConfig,
    on_error: Option<ErrorCallback>,
}

impl<B: ModelCommands> SelectorBuilder<B> {
    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn config(mut self, config: SelectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a callback receiving activation failure messages.
    pub fn on_error(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Subscribes to `source` and spawns the selector task. Must be called
    /// from within a tokio runtime.
    ///
    /// The catalog and current model are queried right away; until the
    /// current model query resolves the status reads `unloaded`.
    pub fn start<S: EventSource + ?Sized>(self, source: &S) -> ModelSelector {
        let capacity = self.config.event_buffer.max(1);
        let (inbox_tx, inbox_rx) = mpsc::channel(capacity);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let entity = ModelEntity::new(SpeedPolicy::from_config(&self.config));
        let (snapshot_tx, snapshot_rx) = watch::channel(SelectorSnapshot::capture(
            &entity,
            self.translator.as_ref(),
        ));

        let bridge = EventBridge::start(source, events_tx);
        let actor = SelectorActor {
            backend: self.backend,
            translator: self.translator,
            entity,
            inbox: inbox_tx.clone(),
            snapshot: snapshot_tx,
            on_error: self.on_error,
            tasks: JoinSet::new(),
            auto_activation: AutoActivation::new(&self.config),
            catalog_tickets: Sequencer::default(),
            current_tickets: Sequencer::default(),
        };
        let task = tokio::spawn(actor.run(inbox_rx, events_rx));

        ModelSelector {
            inbox: inbox_tx,
            snapshot: snapshot_rx,
            bridge,
            actor: Some(task),
        }
    }
}

/// Handle to a running model selector.
///
/// All state lives in one task; this handle only sends requests to it and
/// reads the snapshots it publishes. Dropping the handle tears the selector
/// down like [`ModelSelector::stop`] does, without waiting for it.
pub struct ModelSelector {
    inbox: mpsc::Sender<SelectorMessage>,
    snapshot: watch::Receiver<SelectorSnapshot>,
    bridge: EventBridge,
    actor: Option<JoinHandle<()>>,
}

impl ModelSelector {
    pub fn builder<B: ModelCommands>(backend: Arc<B>) -> SelectorBuilder<B> {
        SelectorBuilder {
            backend,
            translator: Arc::new(EnglishTranslator::new()),
            config: SelectorConfig::default(),
            on_error: None,
        }
    }

    /// Makes `model_id` the active model. The current model id changes
    /// immediately; failures surface through the status, the error message
    /// and the error callback.
    pub async fn select_model(&self, model_id: impl Into<String>) -> Result<(), SelectorError> {
        self.send(SelectorMessage::Select(model_id.into())).await
    }

    /// Queries the catalog and the current model again.
    pub async fn refresh(&self) -> Result<(), SelectorError> {
        self.send(SelectorMessage::Refresh).await
    }

    async fn send(&self, message: SelectorMessage) -> Result<(), SelectorError> {
        self.inbox
            .send(message)
            .await
            .map_err(|_| SelectorError::Stopped)
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SelectorSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> ModelStatus {
        self.snapshot.borrow().status
    }

    pub fn display_text(&self) -> String {
        self.snapshot.borrow().display_text.clone()
    }

    /// Receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<SelectorSnapshot> {
        self.snapshot.clone()
    }

    /// Releases every event subscription, cancels pending activations and
    /// waits for the selector task to finish. The last snapshot stays
    /// readable through receivers obtained from [`ModelSelector::subscribe`].
    pub async fn stop(mut self) {
        self.bridge.stop();
        let _ = self.inbox.send(SelectorMessage::Shutdown).await;
        if let Some(actor) = self.actor.take() {
            if let Err(error) = actor.await {
                if error.is_panic() {
                    log::error!("Model selector task panicked: {error}");
                }
            }
        }
    }
}

impl Drop for ModelSelector {
    fn drop(&mut self) {
        if let Some(actor) = self.actor.take() {
            actor.abort();
        }
    }
}

struct SelectorActor<B> {
    backend: Arc<B>,
    translator: Arc<dyn Translator>,
    entity: ModelEntity,
    inbox: mpsc::Sender<SelectorMessage>,
    snapshot: watch::Sender<SelectorSnapshot>,
    on_error: Option<ErrorCallback>,
    /// Backend calls and deferred activations; dropped (and thereby
    /// cancelled) together with the actor.
    tasks: JoinSet<()>,
    auto_activation: AutoActivation,
    catalog_tickets: Sequencer,
    current_tickets: Sequencer,
}

impl<B: ModelCommands> SelectorActor<B> {
    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<SelectorMessage>,
        mut events: mpsc::Receiver<BackendEvent>,
    ) {
        self.refresh();

        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(SelectorMessage::Shutdown) | None => break,
                    Some(message) => self.handle_message(message),
                },
                Some(event) = events.recv() => self.handle_event(event),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(error) = joined {
                        if error.is_panic() {
                            log::error!("Selector task panicked: {error}");
                        }
                    }
                    continue;
                }
            }

            self.publish();
        }

        self.auto_activation.cancel_all();
        self.tasks.abort_all();
        log::debug!("Model selector stopped");
    }

    fn handle_event(&mut self, event: BackendEvent) {
        log::debug!("Got a lifecycle event on {}: {event:?}", event.channel());

        match self.entity.apply(event, Instant::now()) {
            Reaction::Nothing => {}
            Reaction::RefreshCatalog => self.load_catalog(),
            Reaction::CurrentConfirmed => {
                // earlier current model queries predate the confirmed load
                self.current_tickets.next();
            }
            Reaction::ModelAvailable(model_id) => {
                log::info!("Model {model_id} is ready to use");
                self.load_catalog();
                self.auto_activation.schedule(
                    &mut self.tasks,
                    self.backend.clone(),
                    self.inbox.clone(),
                    model_id,
                );
            }
        }
    }

    fn handle_message(&mut self, message: SelectorMessage) {
        match message {
            SelectorMessage::Select(model_id) => self.select(model_id),
            SelectorMessage::Refresh => self.refresh(),
            SelectorMessage::CatalogLoaded { ticket, result } => {
                if !self.catalog_tickets.is_latest(ticket) {
                    log::debug!("Dropping superseded catalog result #{ticket}");
                    return;
                }
                match result {
                    Ok(models) => self.entity.set_models(models),
                    Err(error) => {
                        log::error!("Failed to load models: {error}");
                        self.entity.query_failed(CATALOG_FAILED_MESSAGE);
                    }
                }
            }
            SelectorMessage::CurrentModelLoaded { ticket, result } => {
                if !self.current_tickets.is_latest(ticket) {
                    log::debug!("Dropping superseded current model result #{ticket}");
                    return;
                }
                match result {
                    Ok((current, loaded)) => self.entity.resolve_current(current, loaded),
                    Err(error) => {
                        log::error!("Failed to load current model: {error}");
                        self.entity.query_failed(STATUS_FAILED_MESSAGE);
                    }
                }
            }
            SelectorMessage::ActivationFinished { model_id, result } => match result {
                Ok(()) => log::info!("Activated model {model_id}"),
                Err(error) => {
                    log::error!("Failed to activate model {model_id}: {error}");
                    let message = error.message().to_string();
                    self.entity.activation_failed(message.clone());
                    if let Some(on_error) = &self.on_error {
                        on_error(&message);
                    }
                }
            },
            SelectorMessage::AutoActivate {
                model_id,
                attempt,
                previous,
            } => {
                if !self.auto_activation.settle(&model_id, attempt) {
                    log::debug!("Dropping superseded activation #{attempt} of {model_id}");
                    return;
                }
                log::info!("Switching to freshly installed model {model_id} (was {previous:?})");
                self.select(model_id);
            }
            SelectorMessage::AutoActivationSkipped { model_id, attempt } => {
                self.auto_activation.settle(&model_id, attempt);
            }
            SelectorMessage::Shutdown => {}
        }
    }

    fn select(&mut self, model_id: String) {
        self.entity.begin_selection(&model_id);
        // an older current model query must not undo the selection
        self.current_tickets.next();

        let backend = self.backend.clone();
        let inbox = self.inbox.clone();
        self.tasks.spawn(async move {
            let result = guarded(backend.set_active_model(&model_id)).await;
            let _ = inbox
                .send(SelectorMessage::ActivationFinished { model_id, result })
                .await;
        });
    }

    fn refresh(&mut self) {
        self.load_catalog();
        self.load_current_model();
    }

    fn load_catalog(&mut self) {
        let ticket = self.catalog_tickets.next();
        let backend = self.backend.clone();
        let inbox = self.inbox.clone();
        self.tasks.spawn(async move {
            let result = guarded(backend.get_available_models()).await;
            let _ = inbox
                .send(SelectorMessage::CatalogLoaded { ticket, result })
                .await;
        });
    }

    fn load_current_model(&mut self) {
        let ticket = self.current_tickets.next();
        let backend = self.backend.clone();
        let inbox = self.inbox.clone();
        self.tasks.spawn(async move {
            let result = guarded(query_current_model(backend.as_ref())).await;
            let _ = inbox
                .send(SelectorMessage::CurrentModelLoaded { ticket, result })
                .await;
        });
    }

    fn publish(&self) {
        let snapshot = SelectorSnapshot::capture(&self.entity, self.translator.as_ref());
        self.snapshot.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

/// Configured model id and, when one is configured, the id the
/// transcription engine has loaded.
async fn query_current_model<B: ModelCommands>(
    backend: &B,
) -> Result<(String, Option<String>), CommandError> {
    let current = backend.get_current_model().await?;
    if current.is_empty() {
        return Ok((current, None));
    }

    let loaded = backend.get_transcription_model_status().await?;
    Ok((current, Some(loaded).filter(|id| !id.is_empty())))
}

/// Runs a backend command, turning a panic inside it into
/// [`CommandError::Fault`].
async fn guarded<T>(
    command: impl Future<Output = Result<T, CommandError>>,
) -> Result<T, CommandError> {
    AssertUnwindSafe(command)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(CommandError::Fault(panic_message(panic.as_ref()))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "backend command panicked".to_string()
}
