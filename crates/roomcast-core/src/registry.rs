//! Session registry: rooms, users and the tokens that bind them.
//!
//! The registry maintains two maps behind one lock: room name → room entry
//! (password, host, member tokens) and token → user entry (display name,
//! return address, room, last activity). Membership is recorded on both sides
//! so a user can be detached from its room in O(1) when it leaves, is deleted,
//! or is reaped.
//!
//! # Concurrency
//!
//! All state lives in a single [`RwLock`]. Snapshots (lookups, recipient
//! lists) take the read lock and may run alongside each other; every mutation
//! takes the write lock. Methods are synchronous and never hold the lock
//! across an await point.
//!
//! # Invariants
//!
//! - A room name is present at most once.
//! - A token maps to at most one user, and a user is a member of at most one
//!   room.
//! - `user.room == Some(name)` if and only if the token is in that room's
//!   member set.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
    net::SocketAddr,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::{env::Environment, error::RegistryError};

/// Opaque bearer credential.
///
/// Possession authorizes sending to the room the token was issued for.
/// Rendered as 32 lowercase hex characters (128 random bits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    /// Draw a fresh token from the environment's RNG.
    pub fn generate<E: Environment>(env: &E) -> Self {
        Self(format!("{:032x}", env.random_u128()))
    }

    /// Token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time view of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Unique, case-sensitive name
    pub name: String,
    /// Stored password. Never checked.
    pub password: Option<String>,
    /// Member that created the room, while it remains a member
    pub host: Option<Token>,
    /// Current member tokens
    pub members: BTreeSet<Token>,
}

/// Point-in-time view of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Bearer token identifying the user
    pub token: Token,
    /// Name shown to other members
    pub display_name: String,
    /// Chat-socket address, learned from the first datagram
    pub return_addr: Option<SocketAddr>,
    /// Whether this user created its room
    pub is_host: bool,
    /// Room this user belongs to
    pub room: Option<String>,
}

impl User {
    /// A user that has not joined a room or sent a datagram yet.
    pub fn new(token: Token, display_name: impl Into<String>) -> Self {
        Self {
            token,
            display_name: display_name.into(),
            return_addr: None,
            is_host: false,
            room: None,
        }
    }
}

/// A fan-out target: a member other than the sender with a known address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Member token
    pub token: Token,
    /// Member display name (for logging)
    pub display_name: String,
    /// Chat-socket address to deliver to
    pub addr: SocketAddr,
}

/// Registry behavior knobs.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Delete a room as soon as its last member leaves, is deleted, or is
    /// reaped. Explicit [`Registry::delete_room`] works either way.
    pub reclaim_empty_rooms: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { reclaim_empty_rooms: true }
    }
}

/// Room and user table operations.
///
/// Each operation is serialized against concurrent callers. Lookups return
/// owned snapshots, never references into the registry.
pub trait Registry: Send + Sync {
    /// Create a room. Atomic check-and-insert.
    fn create_room(&self, name: &str, password: Option<String>) -> Result<Room, RegistryError>;

    /// Look up a room by name.
    fn find_room(&self, name: &str) -> Result<Room, RegistryError>;

    /// Delete a room. Its members stay registered but belong to no room.
    fn delete_room(&self, name: &str) -> Result<(), RegistryError>;

    /// Add `user` to `room`, upserting by token.
    ///
    /// The first member added with `is_host = true` becomes the room's host.
    /// A user already in another room is moved out of it first.
    fn add_member(&self, room: &str, user: &User, is_host: bool) -> Result<(), RegistryError>;

    /// Remove `token` from `room`. Idempotent.
    fn remove_member(&self, room: &str, token: &Token);

    /// Register (or refresh) a user under `user.token` and mark it active.
    ///
    /// Membership (`room`, `is_host`) is owned by [`Self::add_member`] and
    /// [`Self::remove_member`]; those fields of `user` are ignored.
    fn register_user(&self, user: User);

    /// Look up a user by token.
    fn find_user(&self, token: &Token) -> Result<User, RegistryError>;

    /// Delete a user and detach it from its room. Idempotent.
    fn delete_user(&self, token: &Token);

    /// Record activity for `token` at the current time.
    fn touch(&self, token: &Token) -> Result<(), RegistryError>;

    /// Record the chat-socket address datagrams from `token` arrive from.
    fn set_return_address(&self, token: &Token, addr: SocketAddr) -> Result<(), RegistryError>;

    /// Check that `token` identifies a user who is a member of `room`.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` for an unknown token
    /// - `RoomNotFound` for an unknown room
    /// - `NotAuthorized` if the user is not a member of `room`
    fn authorize(&self, room: &str, token: &Token) -> Result<User, RegistryError>;

    /// Snapshot of every member of `room` except `exclude` that has a known
    /// return address.
    fn recipients(&self, room: &str, exclude: &Token) -> Result<Vec<Recipient>, RegistryError>;

    /// Evict every user idle for longer than `threshold`. Returns the evicted
    /// users as they were just before eviction.
    fn reap_inactive(&self, threshold: Duration) -> Vec<User>;

    /// Names of all current rooms, sorted.
    fn room_names(&self) -> Vec<String>;

    /// Number of registered users.
    fn user_count(&self) -> usize;
}

#[derive(Debug)]
struct RoomEntry {
    password: Option<String>,
    host: Option<Token>,
    members: HashSet<Token>,
}

impl RoomEntry {
    fn snapshot(&self, name: &str) -> Room {
        Room {
            name: name.to_string(),
            password: self.password.clone(),
            host: self.host.clone(),
            members: self.members.iter().cloned().collect(),
        }
    }
}

#[derive(Debug)]
struct UserEntry<I> {
    user: User,
    last_activity: I,
}

#[derive(Debug)]
struct State<I> {
    rooms: HashMap<String, RoomEntry>,
    users: HashMap<Token, UserEntry<I>>,
}

impl<I> State<I> {
    /// Remove `token` from `room_name`'s member set and clear the user's
    /// membership fields if they point at that room. A room is only reclaimed
    /// when this call removed its last member.
    fn detach(&mut self, room_name: &str, token: &Token, reclaim_empty: bool) {
        if let Some(room) = self.rooms.get_mut(room_name) {
            let removed = room.members.remove(token);
            if room.host.as_ref() == Some(token) {
                room.host = None;
            }
            if removed && reclaim_empty && room.members.is_empty() {
                self.rooms.remove(room_name);
                tracing::info!(room = %room_name, "reclaimed empty room");
            }
        }

        if let Some(entry) = self.users.get_mut(token)
            && entry.user.room.as_deref() == Some(room_name)
        {
            entry.user.room = None;
            entry.user.is_host = false;
        }
    }
}

/// In-memory [`Registry`] guarded by a single read/write lock.
///
/// Generic over [`Environment`] so last-activity timestamps can use virtual
/// time in tests.
pub struct SessionRegistry<E: Environment> {
    state: RwLock<State<E::Instant>>,
    env: E,
    config: RegistryConfig,
}

impl<E: Environment> SessionRegistry<E> {
    /// Create an empty registry with default configuration.
    pub fn new(env: E) -> Self {
        Self::with_config(env, RegistryConfig::default())
    }

    /// Create an empty registry.
    pub fn with_config(env: E, config: RegistryConfig) -> Self {
        Self {
            state: RwLock::new(State { rooms: HashMap::new(), users: HashMap::new() }),
            env,
            config,
        }
    }

    /// Environment the registry reads time from.
    pub fn env(&self) -> &E {
        &self.env
    }

    // A panic while holding the lock leaves maps that are still structurally
    // valid, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, State<E::Instant>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State<E::Instant>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Environment> Registry for SessionRegistry<E> {
    fn create_room(&self, name: &str, password: Option<String>) -> Result<Room, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::InvalidName);
        }

        let mut state = self.write();
        if state.rooms.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }

        let entry = RoomEntry { password, host: None, members: HashSet::new() };
        let room = entry.snapshot(name);
        state.rooms.insert(name.to_string(), entry);

        tracing::info!(room = %name, "room created");
        Ok(room)
    }

    fn find_room(&self, name: &str) -> Result<Room, RegistryError> {
        let state = self.read();
        state
            .rooms
            .get(name)
            .map(|room| room.snapshot(name))
            .ok_or_else(|| RegistryError::RoomNotFound(name.to_string()))
    }

    fn delete_room(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.write();
        let room =
            state.rooms.remove(name).ok_or_else(|| RegistryError::RoomNotFound(name.to_string()))?;

        for token in &room.members {
            if let Some(entry) = state.users.get_mut(token) {
                entry.user.room = None;
                entry.user.is_host = false;
            }
        }

        tracing::info!(room = %name, members = room.members.len(), "room deleted");
        Ok(())
    }

    fn add_member(&self, room: &str, user: &User, is_host: bool) -> Result<(), RegistryError> {
        let now = self.env.now();
        let mut state = self.write();

        if !state.rooms.contains_key(room) {
            return Err(RegistryError::RoomNotFound(room.to_string()));
        }

        let previous_room = state.users.get(&user.token).and_then(|entry| entry.user.room.clone());
        if let Some(previous) = previous_room.filter(|previous| previous != room) {
            state.detach(&previous, &user.token, self.config.reclaim_empty_rooms);
        }

        let Some(entry) = state.rooms.get_mut(room) else {
            return Err(RegistryError::RoomNotFound(room.to_string()));
        };
        entry.members.insert(user.token.clone());
        if is_host && entry.host.is_none() {
            entry.host = Some(user.token.clone());
        }
        let host = entry.host.as_ref() == Some(&user.token);

        let record = state.users.entry(user.token.clone()).or_insert_with(|| UserEntry {
            user: User::new(user.token.clone(), user.display_name.clone()),
            last_activity: now,
        });
        record.user.room = Some(room.to_string());
        record.user.is_host = host;

        tracing::debug!(%room, user = %user.display_name, host, "member added");
        Ok(())
    }

    fn remove_member(&self, room: &str, token: &Token) {
        let mut state = self.write();
        state.detach(room, token, self.config.reclaim_empty_rooms);
    }

    fn register_user(&self, user: User) {
        let now = self.env.now();
        let mut state = self.write();

        match state.users.get_mut(&user.token) {
            Some(entry) => {
                entry.user.display_name = user.display_name;
                if user.return_addr.is_some() {
                    entry.user.return_addr = user.return_addr;
                }
                entry.last_activity = now;
            },
            None => {
                let user = User { room: None, is_host: false, ..user };
                state.users.insert(user.token.clone(), UserEntry { user, last_activity: now });
            },
        }
    }

    fn find_user(&self, token: &Token) -> Result<User, RegistryError> {
        let state = self.read();
        state.users.get(token).map(|entry| entry.user.clone()).ok_or(RegistryError::UserNotFound)
    }

    fn delete_user(&self, token: &Token) {
        let mut state = self.write();
        let room = state.users.get(token).and_then(|entry| entry.user.room.clone());
        if let Some(room) = room {
            state.detach(&room, token, self.config.reclaim_empty_rooms);
        }
        state.users.remove(token);
    }

    fn touch(&self, token: &Token) -> Result<(), RegistryError> {
        let now = self.env.now();
        let mut state = self.write();
        let entry = state.users.get_mut(token).ok_or(RegistryError::UserNotFound)?;
        entry.last_activity = now;
        Ok(())
    }

    fn set_return_address(&self, token: &Token, addr: SocketAddr) -> Result<(), RegistryError> {
        let mut state = self.write();
        let entry = state.users.get_mut(token).ok_or(RegistryError::UserNotFound)?;
        entry.user.return_addr = Some(addr);
        Ok(())
    }

    fn authorize(&self, room: &str, token: &Token) -> Result<User, RegistryError> {
        let state = self.read();
        let user = state.users.get(token).ok_or(RegistryError::Unauthenticated)?;
        let entry = state.rooms.get(room).ok_or_else(|| RegistryError::RoomNotFound(room.to_string()))?;

        if !entry.members.contains(token) {
            return Err(RegistryError::NotAuthorized { room: room.to_string() });
        }

        Ok(user.user.clone())
    }

    fn recipients(&self, room: &str, exclude: &Token) -> Result<Vec<Recipient>, RegistryError> {
        let state = self.read();
        let entry = state.rooms.get(room).ok_or_else(|| RegistryError::RoomNotFound(room.to_string()))?;

        let recipients = entry
            .members
            .iter()
            .filter(|token| *token != exclude)
            .filter_map(|token| state.users.get(token))
            .filter_map(|member| {
                member.user.return_addr.map(|addr| Recipient {
                    token: member.user.token.clone(),
                    display_name: member.user.display_name.clone(),
                    addr,
                })
            })
            .collect();

        Ok(recipients)
    }

    fn reap_inactive(&self, threshold: Duration) -> Vec<User> {
        let mut state = self.write();

        let stale: Vec<Token> = state
            .users
            .iter()
            .filter(|(_, entry)| self.env.elapsed_since(entry.last_activity) > threshold)
            .map(|(token, _)| token.clone())
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for token in stale {
            let room = state.users.get(&token).and_then(|entry| entry.user.room.clone());
            if let Some(room) = &room {
                state.detach(room, &token, self.config.reclaim_empty_rooms);
            }
            if let Some(entry) = state.users.remove(&token) {
                evicted.push(User { room, ..entry.user });
            }
        }

        evicted
    }

    fn room_names(&self) -> Vec<String> {
        let state = self.read();
        let mut names: Vec<String> = state.rooms.keys().cloned().collect();
        names.sort();
        names
    }

    fn user_count(&self) -> usize {
        self.read().users.len()
    }
}

impl<E: Environment> fmt::Debug for SessionRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("SessionRegistry")
            .field("room_count", &state.rooms.len())
            .field("user_count", &state.users.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use super::*;

    /// Manually advanced clock with a counter-based RNG.
    #[derive(Clone, Default)]
    struct TestEnv {
        now: Arc<Mutex<Duration>>,
        counter: Arc<AtomicU64>,
    }

    impl TestEnv {
        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Environment for TestEnv {
        type Instant = Duration;

        fn now(&self) -> Self::Instant {
            *self.now.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            self.advance(duration);
            std::future::ready(())
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let next = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = next.to_be_bytes()[i % 8];
            }
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn join(registry: &SessionRegistry<TestEnv>, room: &str, name: &str, host: bool) -> Token {
        let token = Token::generate(registry.env());
        let user = User::new(token.clone(), name);
        registry.register_user(user.clone());
        registry.add_member(room, &user, host).unwrap();
        token
    }

    #[test]
    fn token_is_32_hex_chars() {
        let env = TestEnv::default();
        let token = Token::generate(&env);
        assert_eq!(token.as_str().len(), 32);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, Token::generate(&env));
    }

    #[test]
    fn create_room_once() {
        let registry = SessionRegistry::new(TestEnv::default());

        let room = registry.create_room("lobby", Some("pw".to_string())).unwrap();
        assert_eq!(room.name, "lobby");
        assert_eq!(room.password.as_deref(), Some("pw"));
        assert!(room.members.is_empty());

        assert_eq!(
            registry.create_room("lobby", None),
            Err(RegistryError::AlreadyExists("lobby".to_string()))
        );
    }

    #[test]
    fn room_names_are_case_sensitive() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();
        assert!(registry.create_room("Lobby", None).is_ok());
    }

    #[test]
    fn empty_room_name_is_rejected() {
        let registry = SessionRegistry::new(TestEnv::default());
        assert_eq!(registry.create_room("", None), Err(RegistryError::InvalidName));
    }

    #[test]
    fn delete_then_recreate() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();
        registry.delete_room("lobby").unwrap();
        assert!(registry.create_room("lobby", None).is_ok());
    }

    #[test]
    fn delete_missing_room_fails() {
        let registry = SessionRegistry::new(TestEnv::default());
        assert_eq!(
            registry.delete_room("nowhere"),
            Err(RegistryError::RoomNotFound("nowhere".to_string()))
        );
    }

    #[test]
    fn first_host_is_creator() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();

        let alice = join(&registry, "lobby", "alice", true);
        let bob = join(&registry, "lobby", "bob", true);

        let room = registry.find_room("lobby").unwrap();
        assert_eq!(room.host, Some(alice.clone()));
        assert!(registry.find_user(&alice).unwrap().is_host);
        assert!(!registry.find_user(&bob).unwrap().is_host);
    }

    #[test]
    fn add_member_is_idempotent() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();

        let user = User::new(Token::from("t1"), "alice");
        registry.register_user(user.clone());
        registry.add_member("lobby", &user, false).unwrap();
        registry.add_member("lobby", &user, false).unwrap();

        assert_eq!(registry.find_room("lobby").unwrap().members.len(), 1);
    }

    #[test]
    fn add_member_to_missing_room_fails() {
        let registry = SessionRegistry::new(TestEnv::default());
        let user = User::new(Token::from("t1"), "alice");
        assert_eq!(
            registry.add_member("lobby", &user, false),
            Err(RegistryError::RoomNotFound("lobby".to_string()))
        );
    }

    #[test]
    fn user_moves_between_rooms() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("a", None).unwrap();
        registry.create_room("b", None).unwrap();
        let _anchor = join(&registry, "a", "anchor", false);

        let user = User::new(Token::from("t1"), "alice");
        registry.register_user(user.clone());
        registry.add_member("a", &user, false).unwrap();
        registry.add_member("b", &user, false).unwrap();

        assert!(!registry.find_room("a").unwrap().members.contains(&user.token));
        assert!(registry.find_room("b").unwrap().members.contains(&user.token));
        assert_eq!(registry.find_user(&user.token).unwrap().room.as_deref(), Some("b"));
    }

    #[test]
    fn remove_member_is_idempotent_and_reclaims() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();
        let alice = join(&registry, "lobby", "alice", true);

        registry.remove_member("lobby", &alice);
        registry.remove_member("lobby", &alice);

        assert!(registry.find_room("lobby").is_err());
        assert_eq!(registry.find_user(&alice).unwrap().room, None);
    }

    #[test]
    fn removing_a_stranger_keeps_fresh_room() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();

        registry.remove_member("lobby", &Token::from("stranger"));

        assert!(registry.find_room("lobby").is_ok());
    }

    #[test]
    fn empty_rooms_kept_when_reclaim_disabled() {
        let config = RegistryConfig { reclaim_empty_rooms: false };
        let registry = SessionRegistry::with_config(TestEnv::default(), config);
        registry.create_room("lobby", None).unwrap();
        let alice = join(&registry, "lobby", "alice", true);

        registry.remove_member("lobby", &alice);

        let room = registry.find_room("lobby").unwrap();
        assert!(room.members.is_empty());
        assert_eq!(room.host, None);
    }

    #[test]
    fn register_user_keeps_membership() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();
        let alice = join(&registry, "lobby", "alice", true);

        registry.register_user(User::new(alice.clone(), "alice2"));

        let user = registry.find_user(&alice).unwrap();
        assert_eq!(user.display_name, "alice2");
        assert_eq!(user.room.as_deref(), Some("lobby"));
        assert!(user.is_host);
    }

    #[test]
    fn delete_user_detaches_from_room() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();
        let alice = join(&registry, "lobby", "alice", true);
        let bob = join(&registry, "lobby", "bob", false);

        registry.delete_user(&bob);

        assert_eq!(registry.find_user(&bob), Err(RegistryError::UserNotFound));
        let room = registry.find_room("lobby").unwrap();
        assert_eq!(room.members.into_iter().collect::<Vec<_>>(), vec![alice]);
    }

    #[test]
    fn touch_and_address_require_user() {
        let registry = SessionRegistry::new(TestEnv::default());
        let ghost = Token::from("ghost");
        assert_eq!(registry.touch(&ghost), Err(RegistryError::UserNotFound));
        assert_eq!(registry.set_return_address(&ghost, addr(1)), Err(RegistryError::UserNotFound));
    }

    #[test]
    fn authorize_distinguishes_failures() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();
        registry.create_room("other", None).unwrap();
        let alice = join(&registry, "lobby", "alice", true);
        let _bob = join(&registry, "other", "bob", true);

        assert_eq!(registry.authorize("lobby", &alice).unwrap().display_name, "alice");
        assert_eq!(
            registry.authorize("lobby", &Token::from("nope")),
            Err(RegistryError::Unauthenticated)
        );
        assert_eq!(
            registry.authorize("missing", &alice),
            Err(RegistryError::RoomNotFound("missing".to_string()))
        );
        assert_eq!(
            registry.authorize("other", &alice),
            Err(RegistryError::NotAuthorized { room: "other".to_string() })
        );
    }

    #[test]
    fn recipients_skip_sender_and_unknown_addresses() {
        let registry = SessionRegistry::new(TestEnv::default());
        registry.create_room("lobby", None).unwrap();
        let alice = join(&registry, "lobby", "alice", true);
        let bob = join(&registry, "lobby", "bob", false);
        let _carol = join(&registry, "lobby", "carol", false);

        registry.set_return_address(&alice, addr(1000)).unwrap();
        registry.set_return_address(&bob, addr(2000)).unwrap();

        let recipients = registry.recipients("lobby", &alice).unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].token, bob);
        assert_eq!(recipients[0].addr, addr(2000));
    }

    #[test]
    fn reaper_evicts_only_stale_users() {
        let env = TestEnv::default();
        let registry = SessionRegistry::new(env.clone());
        registry.create_room("lobby", None).unwrap();
        let alice = join(&registry, "lobby", "alice", true);
        let bob = join(&registry, "lobby", "bob", false);

        env.advance(Duration::from_secs(200));
        registry.touch(&bob).unwrap();
        env.advance(Duration::from_secs(150));

        let evicted = registry.reap_inactive(Duration::from_secs(300));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].token, alice);
        assert_eq!(evicted[0].room.as_deref(), Some("lobby"));

        assert_eq!(registry.find_user(&alice), Err(RegistryError::UserNotFound));
        let room = registry.find_room("lobby").unwrap();
        assert!(!room.members.contains(&alice));
        assert!(room.members.contains(&bob));
    }

    #[test]
    fn reaper_keeps_user_exactly_at_threshold() {
        let env = TestEnv::default();
        let registry = SessionRegistry::new(env.clone());
        registry.create_room("lobby", None).unwrap();
        let alice = join(&registry, "lobby", "alice", true);

        env.advance(Duration::from_secs(300));
        assert!(registry.reap_inactive(Duration::from_secs(300)).is_empty());

        env.advance(Duration::from_secs(1));
        assert_eq!(registry.reap_inactive(Duration::from_secs(300)).len(), 1);
        assert_eq!(registry.find_user(&alice), Err(RegistryError::UserNotFound));
        assert!(registry.room_names().is_empty());
    }
}
