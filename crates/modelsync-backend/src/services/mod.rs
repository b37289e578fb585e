//! Backend service handlers for frontend-driven requests.
//!
//! Handlers operate on the [`SimulatedBackend`](crate::SimulatedBackend)
//! context, mutate its shared state and emit lifecycle events back to the
//! frontend.

pub mod model_service;
