//! Communication bridge between the model lifecycle backend and the
//! presentation layer that reflects it.
//!
//! This crate defines the types and protocols shared by both sides:
//! - The frontend issues request/response commands (list models, select the
//!   active model, query the recording state) through [`ModelCommands`].
//! - The backend pushes lifecycle notifications (download progress,
//!   extraction, load/unload) on named channels, consumed through an
//!   [`EventSource`].
//!
//! Payloads travel as JSON values, the same way they would cross a webview
//! IPC boundary, and are decoded into typed [`BackendEvent`]s on arrival.

pub mod commands;
pub mod config;
pub mod events;
pub mod hub;
pub mod model;

pub use crate::commands::{CommandError, ModelCommands};
pub use crate::events::{BackendEvent, EventChannel};
pub use crate::hub::{EventHub, EventSource, EventStream};
pub use crate::model::{EngineType, ModelInfo, ModelStatus};

/// Errors raised while moving events across the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A payload did not match the shape expected for its channel.
    #[error("failed to decode payload on {channel}: {source}")]
    Decode {
        channel: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// A payload could not be serialized before emission.
    #[error("failed to encode payload for {channel}: {source}")]
    Encode {
        channel: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The event source refused a subscription.
    #[error("failed to subscribe to {0}")]
    SubscriptionRejected(&'static str),
}
