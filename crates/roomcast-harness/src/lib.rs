//! Deterministic simulation harness for Roomcast testing.
//!
//! - [`SimEnv`]: virtual clock and seeded RNG implementing
//!   [`roomcast_core::Environment`]
//! - [`SimSink`]: in-memory datagram sink with failure injection
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference registry. Operations are applied
//! to both the model and a real `SessionRegistry`, and their observable
//! states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;
pub mod sim_sink;

pub use model::{
    MODEL_INACTIVITY_SECS, ModelRegistry, ModelRoomId, ModelUserId, ObservableState, Operation,
    OperationError,
};
pub use sim_env::SimEnv;
pub use sim_sink::SimSink;
