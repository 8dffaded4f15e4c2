use serde::Serialize;
use tracing::{trace, warn};

use crate::{
    dto::{
        room::RoomSnapshot,
        sse::{RoomUpdatedEvent, ServerEvent},
    },
    state::{RoomEntry, room::Room},
};

/// Event name carried by every room change.
pub const EVENT_ROOM_UPDATED: &str = "room.updated";

/// Broadcast the spectator view of `room` to everyone watching it.
pub fn broadcast_room_updated(entry: &RoomEntry, room: &Room) {
    let payload = RoomUpdatedEvent(RoomSnapshot::for_viewer(room, None));
    send_room_event(entry, EVENT_ROOM_UPDATED, &payload);
}

/// Build the event sent to a subscriber right after it connects.
pub fn initial_event(room: &Room) -> Option<ServerEvent> {
    let payload = RoomUpdatedEvent(RoomSnapshot::for_viewer(room, None));
    match ServerEvent::json(Some(EVENT_ROOM_UPDATED.to_string()), &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(room = %room.code, error = %err, "failed to serialize initial room event");
            None
        }
    }
}

fn send_room_event(entry: &RoomEntry, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(payload) => {
            let delivered = entry.events().broadcast(payload);
            trace!(event, delivered, "room event sent");
        }
        Err(err) => warn!(event, error = %err, "failed to serialize room SSE payload"),
    }
}
