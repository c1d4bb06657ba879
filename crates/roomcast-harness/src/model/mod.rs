//! Reference model of the session registry.
//!
//! [`ModelRegistry`] is a deliberately naive re-statement of registry
//! semantics over small integer ids. Model-based tests apply the same
//! [`Operation`] sequence to the model and to a real `SessionRegistry` and
//! compare [`ObservableState`] after every step.

mod operation;
mod registry;

pub use operation::{ModelRoomId, ModelUserId, Operation, OperationError};
pub use registry::{ModelRegistry, ObservableState};

/// Inactivity threshold the model reaps with, in virtual seconds.
pub const MODEL_INACTIVITY_SECS: u64 = 300;

/// Room name the real registry uses for a model room id.
pub fn room_name(room: ModelRoomId) -> String {
    format!("room-{room}")
}

/// Token text the real registry uses for a model user id.
pub fn user_token(user: ModelUserId) -> String {
    format!("user-{user}")
}

/// Inverse of [`user_token`].
pub fn parse_user_token(token: &str) -> Option<ModelUserId> {
    token.strip_prefix("user-")?.parse().ok()
}

/// Inverse of [`room_name`].
pub fn parse_room_name(name: &str) -> Option<ModelRoomId> {
    name.strip_prefix("room-")?.parse().ok()
}
