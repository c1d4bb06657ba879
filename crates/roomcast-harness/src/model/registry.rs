//! Model registry state machine.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    MODEL_INACTIVITY_SECS,
    operation::{ModelRoomId, ModelUserId, Operation, OperationError},
};

#[derive(Debug, Clone, Default)]
struct ModelRoom {
    host: Option<ModelUserId>,
    members: BTreeSet<ModelUserId>,
}

#[derive(Debug, Clone)]
struct ModelUser {
    room: Option<ModelRoomId>,
    last_active: u64,
}

/// Membership view both implementations can produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableState {
    /// Room → (host, members)
    pub rooms: BTreeMap<ModelRoomId, (Option<ModelUserId>, BTreeSet<ModelUserId>)>,
    /// User → (room, is host)
    pub users: BTreeMap<ModelUserId, (Option<ModelRoomId>, bool)>,
}

/// Reference registry with empty-room reclamation enabled.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    rooms: BTreeMap<ModelRoomId, ModelRoom>,
    users: BTreeMap<ModelUserId, ModelUser>,
    now: u64,
}

impl ModelRegistry {
    /// Empty registry at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: &Operation) -> Result<(), OperationError> {
        match *op {
            Operation::CreateRoom { room } => {
                if self.rooms.contains_key(&room) {
                    return Err(OperationError::AlreadyExists);
                }
                self.rooms.insert(room, ModelRoom::default());
                Ok(())
            },
            Operation::Join { user, room, host } => {
                let now = self.now;
                self.users
                    .entry(user)
                    .and_modify(|u| u.last_active = now)
                    .or_insert(ModelUser { room: None, last_active: now });
                self.add_member(user, room, host)
            },
            Operation::Leave { user, room } => {
                self.detach(user, room);
                Ok(())
            },
            Operation::DeleteRoom { room } => {
                let removed = self.rooms.remove(&room).ok_or(OperationError::RoomNotFound)?;
                for member in removed.members {
                    if let Some(u) = self.users.get_mut(&member) {
                        u.room = None;
                    }
                }
                Ok(())
            },
            Operation::DeleteUser { user } => {
                if let Some(room) = self.users.get(&user).and_then(|u| u.room) {
                    self.detach(user, room);
                }
                self.users.remove(&user);
                Ok(())
            },
            Operation::Touch { user } => {
                let u = self.users.get_mut(&user).ok_or(OperationError::UserNotFound)?;
                u.last_active = self.now;
                Ok(())
            },
            Operation::AdvanceTime { secs } => {
                self.now += u64::from(secs);
                Ok(())
            },
            Operation::Reap => {
                let stale: Vec<ModelUserId> = self
                    .users
                    .iter()
                    .filter(|(_, u)| self.now - u.last_active > MODEL_INACTIVITY_SECS)
                    .map(|(id, _)| *id)
                    .collect();
                for user in stale {
                    self.apply(&Operation::DeleteUser { user })?;
                }
                Ok(())
            },
        }
    }

    /// Current membership view.
    pub fn observable_state(&self) -> ObservableState {
        let rooms = self
            .rooms
            .iter()
            .map(|(id, room)| (*id, (room.host, room.members.clone())))
            .collect();
        let users = self
            .users
            .iter()
            .map(|(id, user)| {
                let is_host = user
                    .room
                    .and_then(|room| self.rooms.get(&room))
                    .is_some_and(|room| room.host == Some(*id));
                (*id, (user.room, is_host))
            })
            .collect();
        ObservableState { rooms, users }
    }

    fn add_member(
        &mut self,
        user: ModelUserId,
        room: ModelRoomId,
        host: bool,
    ) -> Result<(), OperationError> {
        if !self.rooms.contains_key(&room) {
            return Err(OperationError::RoomNotFound);
        }

        if let Some(previous) = self.users.get(&user).and_then(|u| u.room)
            && previous != room
        {
            self.detach(user, previous);
        }

        let Some(entry) = self.rooms.get_mut(&room) else {
            return Err(OperationError::RoomNotFound);
        };
        entry.members.insert(user);
        if host && entry.host.is_none() {
            entry.host = Some(user);
        }
        if let Some(u) = self.users.get_mut(&user) {
            u.room = Some(room);
        }
        Ok(())
    }

    fn detach(&mut self, user: ModelUserId, room: ModelRoomId) {
        if let Some(entry) = self.rooms.get_mut(&room) {
            let removed = entry.members.remove(&user);
            if entry.host == Some(user) {
                entry.host = None;
            }
            if removed && entry.members.is_empty() {
                self.rooms.remove(&room);
            }
        }
        if let Some(u) = self.users.get_mut(&user)
            && u.room == Some(room)
        {
            u.room = None;
        }
    }
}
