//! Event bridge: forwards lifecycle channels from an [`EventSource`] into the
//! selector as typed events.

use modelsync_bridge::{BackendEvent, EventChannel, EventSource, EventStream};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::AbortHandle;

/// Live subscriptions to the lifecycle channels.
///
/// Each channel is forwarded by its own task, so a payload that fails to
/// decode on one channel has no effect on the others. [`EventBridge::stop`]
/// releases every subscription exactly once; calling it again, or dropping
/// the bridge afterwards, is a no-op.
#[derive(Debug)]
pub struct EventBridge {
    subscriptions: Vec<(EventChannel, AbortHandle)>,
}

impl EventBridge {
    /// Subscribes to every channel in [`EventChannel::ALL`] and forwards the
    /// decoded events to `sink`. Must be called from within a tokio runtime.
    ///
    /// A channel the source refuses is logged and skipped; the remaining
    /// channels are still subscribed.
    pub fn start<S: EventSource + ?Sized>(source: &S, sink: mpsc::Sender<BackendEvent>) -> Self {
        let mut subscriptions = Vec::with_capacity(EventChannel::ALL.len());
        for channel in EventChannel::ALL {
            match source.listen(channel) {
                Ok(stream) => {
                    let task = tokio::spawn(forward(channel, stream, sink.clone()));
                    subscriptions.push((channel, task.abort_handle()));
                }
                Err(error) => log::error!("Could not listen to {channel}: {error}"),
            }
        }

        log::debug!("Listening to {} lifecycle channels", subscriptions.len());
        Self { subscriptions }
    }

    /// Number of subscriptions still held.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Releases all subscriptions. Forwarding tasks that already ended (the
    /// source went away, the sink closed) are released all the same.
    pub fn stop(&mut self) {
        for (channel, handle) in self.subscriptions.drain(..) {
            handle.abort();
            log::debug!("Released subscription to {channel}");
        }
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn forward(channel: EventChannel, mut stream: EventStream, sink: mpsc::Sender<BackendEvent>) {
    loop {
        let payload = match stream.recv().await {
            Ok(payload) => payload,
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Listener on {channel} fell behind, {skipped} events were lost");
                continue;
            }
            Err(RecvError::Closed) => {
                log::debug!("Event source closed {channel}");
                break;
            }
        };

        match channel.decode(payload) {
            Ok(event) => {
                if sink.send(event).await.is_err() {
                    break;
                }
            }
            Err(error) => log::warn!("Dropping event: {error}"),
        }
    }
}
