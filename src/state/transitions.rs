use crate::{
    dto::room::RoomSnapshot,
    error::ServiceError,
    services::room_events::broadcast_room_updated,
    state::{SharedState, room::Room},
};

/// Run `action` on a room under its lock, then broadcast the updated room and
/// return the action's value with the room as seen by `viewer`.
///
/// Nothing is broadcast when the action fails; the room is left as the action
/// left it, which for every room operation means untouched.
pub async fn run_room_action_with_broadcast<F, T>(
    state: &SharedState,
    code: &str,
    viewer: Option<&str>,
    action: F,
) -> Result<(T, RoomSnapshot), ServiceError>
where
    F: FnOnce(&mut Room) -> Result<T, ServiceError>,
{
    let entry = state
        .room(code)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` does not exist")))?;
    let mut room = entry.room().lock().await;

    let value = action(&mut room)?;
    room.touch();
    broadcast_room_updated(&entry, &room);
    Ok((value, RoomSnapshot::for_viewer(&room, viewer)))
}
