//! In-process model backend and configuration storage.
//!
//! [`SimulatedBackend`] answers [`modelsync_bridge::ModelCommands`] from a
//! shared catalog and emits lifecycle events on an
//! [`EventHub`](modelsync_bridge::EventHub): loading, download progress,
//! extraction and completion. Downloads and loads are simulated with timers,
//! which makes the backend usable for demos and end-to-end tests.

mod app;
pub mod catalog;
pub mod config;
mod services;
pub mod state;

pub use crate::app::{SimulatedBackend, SimulationTiming};
