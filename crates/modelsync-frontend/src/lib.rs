//! Client-side state of the speech-recognition model lifecycle.
//!
//! The backend announces downloads, extractions and load/unload transitions
//! on named event channels. This crate turns those notifications into one
//! consistent state (status, active model, in-flight downloads with their
//! transfer speed, last error), renders it as a single status line, and
//! activates freshly installed models unless a recording is running.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn demo<B: modelsync_bridge::ModelCommands>(backend: Arc<B>, hub: modelsync_bridge::EventHub) {
//! use modelsync_frontend::ModelSelector;
//!
//! let selector = ModelSelector::builder(backend)
//!     .on_error(|message| log::error!("Model activation failed: {message}"))
//!     .start(&hub);
//! selector.select_model("base").await.ok();
//! println!("{}", selector.display_text());
//! selector.stop().await;
//! # }
//! ```

pub mod bridge;
mod coordinator;
pub mod display;
pub mod entities;
pub mod formatting;
pub mod i18n;
pub mod selector;
pub mod snapshot;

pub use crate::display::resolve_display_text;
pub use crate::i18n::{EnglishTranslator, Translator};
pub use crate::selector::{ErrorCallback, ModelSelector, SelectorBuilder, SelectorError};
pub use crate::snapshot::SelectorSnapshot;
