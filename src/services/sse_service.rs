use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::room_events,
    state::SharedState,
};

/// Subscribe to a room's event stream.
///
/// Also returns the current spectator view so the client starts from a full
/// snapshot instead of waiting for the next change.
pub async fn subscribe_room(
    state: &SharedState,
    code: &str,
) -> Result<(broadcast::Receiver<ServerEvent>, Option<ServerEvent>), ServiceError> {
    let code = code.trim().to_ascii_uppercase();
    let entry = state
        .room(&code)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` does not exist")))?;
    // subscribe under the lock so no update slips between snapshot and stream
    let room = entry.room().lock().await;
    let receiver = entry.events().subscribe();
    let initial = room_events::initial_event(&room);
    debug!(room = %code, subscribers = entry.events().subscriber_count(), "room SSE subscriber added");
    Ok((receiver, initial))
}

/// Convert a broadcast receiver into an SSE response, forwarding events until
/// the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Option<ServerEvent>,
    room: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(payload) = initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        // room evicted
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // every event carries the full room, the next one catches up
                            debug!(room = %room, skipped, "room SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(room = %room, "room SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}
