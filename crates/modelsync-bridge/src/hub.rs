//! Subscription seam for backend events and an in-process implementation.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::{BridgeError, events::EventChannel};

/// Receiving end of a single channel subscription. Dropping it releases the
/// subscription.
pub type EventStream = broadcast::Receiver<serde_json::Value>;

/// Anything that can hand out per-channel event subscriptions.
pub trait EventSource {
    /// Opens an independent subscription to `channel`.
    fn listen(&self, channel: EventChannel) -> Result<EventStream, BridgeError>;
}

/// Broadcast hub carrying raw JSON payloads per named channel.
///
/// Emitting on a channel with no listeners is not an error: events are fire
/// and forget, and delivery only reaches whoever is subscribed at that time.
#[derive(Debug)]
pub struct EventHub {
    channels: HashMap<EventChannel, broadcast::Sender<serde_json::Value>>,
}

impl EventHub {
    /// Creates a hub where each channel buffers up to `capacity` undelivered
    /// payloads per listener.
    pub fn new(capacity: usize) -> Self {
        let channels = EventChannel::ALL
            .into_iter()
            .map(|channel| (channel, broadcast::channel(capacity.max(1)).0))
            .collect();
        Self { channels }
    }

    /// Serializes `payload` and publishes it on `channel`. Returns the number
    /// of listeners that received it.
    pub fn emit<T: Serialize>(&self, channel: EventChannel, payload: &T) -> Result<usize, BridgeError> {
        let value = serde_json::to_value(payload).map_err(|source| BridgeError::Encode {
            channel: channel.name(),
            source,
        })?;
        Ok(self.emit_raw(channel, value))
    }

    /// Publishes an already encoded payload on `channel`.
    pub fn emit_raw(&self, channel: EventChannel, payload: serde_json::Value) -> usize {
        let Some(sender) = self.channels.get(&channel) else {
            return 0;
        };
        match sender.send(payload) {
            Ok(listeners) => listeners,
            Err(_) => {
                log::debug!("No listeners on {channel}, dropping payload");
                0
            }
        }
    }

    /// Number of live subscriptions on `channel`.
    pub fn listener_count(&self, channel: EventChannel) -> usize {
        self.channels
            .get(&channel)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventSource for EventHub {
    fn listen(&self, channel: EventChannel) -> Result<EventStream, BridgeError> {
        self.channels
            .get(&channel)
            .map(broadcast::Sender::subscribe)
            .ok_or(BridgeError::SubscriptionRejected(channel.name()))
    }
}

impl<S: EventSource + ?Sized> EventSource for std::sync::Arc<S> {
    fn listen(&self, channel: EventChannel) -> Result<EventStream, BridgeError> {
        (**self).listen(channel)
    }
}
