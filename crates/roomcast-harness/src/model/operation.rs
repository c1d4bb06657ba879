//! Operations for model-based testing.
//!
//! Operations are generated randomly (by proptest or a fuzzer) and applied to
//! both the model and the real registry.

use arbitrary::Arbitrary;

/// User identifier (kept small so operations collide often).
pub type ModelUserId = u8;

/// Room identifier.
pub type ModelRoomId = u8;

/// Registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Create an empty room.
    CreateRoom {
        /// Room to create.
        room: ModelRoomId,
    },

    /// Register a user and add it to a room.
    Join {
        /// Joining user.
        user: ModelUserId,
        /// Target room.
        room: ModelRoomId,
        /// Request host status.
        host: bool,
    },

    /// Remove a user from a room.
    Leave {
        /// Leaving user.
        user: ModelUserId,
        /// Room to leave.
        room: ModelRoomId,
    },

    /// Delete a room, keeping its users registered.
    DeleteRoom {
        /// Room to delete.
        room: ModelRoomId,
    },

    /// Delete a user and detach it from its room.
    DeleteUser {
        /// User to delete.
        user: ModelUserId,
    },

    /// Mark a user active.
    Touch {
        /// User to touch.
        user: ModelUserId,
    },

    /// Move the virtual clock forward.
    AdvanceTime {
        /// Seconds to advance.
        secs: u8,
    },

    /// Evict users idle for longer than the model threshold.
    Reap,
}

/// Errors an operation can produce, reduced to what both sides agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Room already exists.
    AlreadyExists,
    /// Room does not exist.
    RoomNotFound,
    /// User is not registered.
    UserNotFound,
}
