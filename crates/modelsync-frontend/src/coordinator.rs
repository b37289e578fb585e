//! Automatic activation of models that just finished downloading or
//! extracting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use modelsync_bridge::{ModelCommands, config::SelectorConfig};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};

use crate::selector::SelectorMessage;

/// Schedules one deferred activation attempt per model id.
///
/// After the configured delay the attempt asks the backend whether a
/// recording is running. A busy backend (or one that cannot tell) skips the
/// activation. Otherwise the current model is re-queried and the selector is
/// told to activate the model. Either way the attempt reports back with its
/// attempt number.
#[derive(Debug)]
pub(crate) struct AutoActivation {
    enabled: bool,
    delay: Duration,
    /// Number of attempts scheduled so far; tags each attempt.
    attempts: u64,
    pending: HashMap<String, (u64, AbortHandle)>,
}

impl AutoActivation {
    pub(crate) fn new(config: &SelectorConfig) -> Self {
        Self {
            enabled: config.auto_activate,
            delay: Duration::from_millis(config.auto_activation_delay_ms),
            attempts: 0,
            pending: HashMap::new(),
        }
    }

    /// Schedules an attempt for `model_id`, superseding any attempt still
    /// pending for the same id. The task lives in `tasks`, so dropping the
    /// set cancels it.
    pub(crate) fn schedule<B: ModelCommands>(
        &mut self,
        tasks: &mut JoinSet<()>,
        backend: Arc<B>,
        inbox: mpsc::Sender<SelectorMessage>,
        model_id: String,
    ) {
        if !self.enabled {
            log::debug!("Auto-activation disabled, leaving {model_id} inactive");
            return;
        }

        if let Some((_, previous)) = self.pending.remove(&model_id) {
            log::debug!("Superseding pending activation of {model_id}");
            previous.abort();
        }

        self.attempts += 1;
        let attempt = self.attempts;
        let delay = self.delay;
        let key = model_id.clone();
        let handle = tasks.spawn(async move {
            tokio::time::sleep(delay).await;

            let busy = match backend.is_recording().await {
                Ok(recording) => recording,
                Err(error) => {
                    log::warn!("Could not check recording state: {error}");
                    true
                }
            };
            if busy {
                log::info!("Recording in progress, not switching to {model_id}");
                let _ = inbox
                    .send(SelectorMessage::AutoActivationSkipped { model_id, attempt })
                    .await;
                return;
            }

            let previous = match backend.get_current_model().await {
                Ok(current) if !current.is_empty() => Some(current),
                Ok(_) => None,
                Err(error) => {
                    log::warn!("Could not re-query current model: {error}");
                    None
                }
            };

            let _ = inbox
                .send(SelectorMessage::AutoActivate {
                    model_id,
                    attempt,
                    previous,
                })
                .await;
        });
        self.pending.insert(key, (attempt, handle));
    }

    /// Forgets `attempt` for `model_id` once it reported back. Returns
    /// `false` when a newer attempt replaced it in the meantime; that one
    /// stays pending.
    pub(crate) fn settle(&mut self, model_id: &str, attempt: u64) -> bool {
        match self.pending.get(model_id) {
            Some((pending, _)) if *pending == attempt => {
                self.pending.remove(model_id);
                true
            }
            _ => false,
        }
    }

    /// Number of attempts still waiting to report back.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Cancels every pending attempt.
    pub(crate) fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }
}
