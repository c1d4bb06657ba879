//! Fuzz target for SessionRegistry against the reference model
//!
//! # Invariants
//!
//! - Every operation returns the same result on model and registry
//! - Membership and host views agree after every operation

#![no_main]

use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use roomcast_core::{Registry, RegistryError, SessionRegistry, Token, User};
use roomcast_harness::{
    MODEL_INACTIVITY_SECS, ModelRegistry, Operation, OperationError, SimEnv,
    model::{room_name, user_token},
};

fn reduce(err: RegistryError) -> OperationError {
    match err {
        RegistryError::AlreadyExists(_) => OperationError::AlreadyExists,
        RegistryError::UserNotFound | RegistryError::Unauthenticated => {
            OperationError::UserNotFound
        },
        _ => OperationError::RoomNotFound,
    }
}

fn apply(
    registry: &SessionRegistry<SimEnv>,
    env: &SimEnv,
    op: &Operation,
) -> Result<(), OperationError> {
    let token = |user: u8| Token::from(user_token(user));
    match *op {
        Operation::CreateRoom { room } => {
            registry.create_room(&room_name(room), None).map(|_| ()).map_err(reduce)
        },
        Operation::Join { user, room, host } => {
            let record = User::new(token(user), format!("u{user}"));
            registry.register_user(record.clone());
            registry.add_member(&room_name(room), &record, host).map_err(reduce)
        },
        Operation::Leave { user, room } => {
            registry.remove_member(&room_name(room), &token(user));
            Ok(())
        },
        Operation::DeleteRoom { room } => registry.delete_room(&room_name(room)).map_err(reduce),
        Operation::DeleteUser { user } => {
            registry.delete_user(&token(user));
            Ok(())
        },
        Operation::Touch { user } => registry.touch(&token(user)).map_err(reduce),
        Operation::AdvanceTime { secs } => {
            env.advance(Duration::from_secs(u64::from(secs)));
            Ok(())
        },
        Operation::Reap => {
            registry.reap_inactive(Duration::from_secs(MODEL_INACTIVITY_SECS));
            Ok(())
        },
    }
}

fuzz_target!(|ops: Vec<Operation>| {
    let env = SimEnv::new();
    let registry = SessionRegistry::new(env.clone());
    let mut model = ModelRegistry::new();

    for op in ops.iter().take(256) {
        assert_eq!(model.apply(op), apply(&registry, &env, op), "divergence on {op:?}");
    }

    let expected: Vec<String> =
        model.observable_state().rooms.keys().map(|room| room_name(*room)).collect();
    let mut actual = registry.room_names();
    actual.sort_by_key(|name| name.trim_start_matches("room-").parse::<u8>().unwrap_or(u8::MAX));
    assert_eq!(expected, actual);
});
