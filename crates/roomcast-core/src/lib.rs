//! Roomcast core logic.
//!
//! Pure state with no I/O: the [`Environment`] abstraction for time and
//! randomness, and the [`SessionRegistry`] that owns every room, user and
//! token. The server crate drives these from real sockets; tests drive them
//! from a simulated environment.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod registry;

pub use env::Environment;
pub use error::RegistryError;
pub use registry::{
    Recipient, Registry, RegistryConfig, Room, SessionRegistry, Token, User,
};
