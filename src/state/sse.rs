use tokio::sync::broadcast;
use tracing::trace;

use crate::dto::sse::ServerEvent;

/// Fan-out of one room's events to its SSE subscribers.
///
/// Slow subscribers lag and skip events rather than holding the room back.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Hub keeping at most `capacity` undelivered events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send `event` to the current subscribers, returning how many got it.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        match self.sender.send(event) {
            Ok(delivered) => delivered,
            Err(broadcast::error::SendError(event)) => {
                trace!(event = ?event.event, "no SSE subscriber for room event");
                0
            }
        }
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: &str) -> ServerEvent {
        ServerEvent {
            event: Some("room.updated".into()),
            data: data.into(),
        }
    }

    #[tokio::test]
    async fn subscribers_only_see_later_events() {
        let hub = SseHub::new(4);
        assert_eq!(hub.broadcast(event("lost")), 0);

        let mut receiver = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.broadcast(event("kept")), 1);
        assert_eq!(receiver.recv().await.unwrap().data, "kept");
    }
}
