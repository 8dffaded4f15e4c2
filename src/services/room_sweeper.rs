use std::time::Instant;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::{AppState, SharedState};

/// Evict idle rooms on the configured interval, forever.
pub async fn run(state: SharedState) {
    let policy = *state.config().rooms();
    let mut ticker = interval(policy.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let evicted = sweep_idle_rooms(&state, Instant::now());
        if evicted > 0 {
            info!(evicted, remaining = state.room_count(), "idle rooms evicted");
        }
    }
}

/// Drop every room idle for longer than the TTL, returning how many went.
///
/// Rooms whose lock is held are busy by definition and survive this sweep.
pub fn sweep_idle_rooms(state: &AppState, now: Instant) -> usize {
    let ttl = state.config().rooms().idle_ttl;
    let mut evicted = 0;

    state.rooms().retain(|code, entry| match entry.room().try_lock() {
        Ok(room) if room.idle_for(now) > ttl => {
            debug!(room = %code, phase = ?room.phase(), "evicting idle room");
            evicted += 1;
            false
        }
        Ok(_) => true,
        Err(_) => true,
    });

    evicted
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::{AppConfig, RoomPolicy},
        services::ai_provider::HeuristicProvider,
        state::room::{GameVariant, Room},
    };

    fn state_with_ttl(idle_ttl: Duration) -> SharedState {
        let config = AppConfig::default().with_room_policy(RoomPolicy {
            idle_ttl,
            ..RoomPolicy::default()
        });
        AppState::new(config, Arc::new(HeuristicProvider))
    }

    #[tokio::test]
    async fn idle_rooms_are_evicted_and_fresh_ones_kept() {
        let state = state_with_ttl(Duration::from_secs(60));
        let start = Instant::now();

        state
            .insert_room(Room::new("STALE1", GameVariant::Scale))
            .unwrap();
        let mut fresh = Room::new("FRESH1", GameVariant::Code);
        fresh.set_last_activity(start + Duration::from_secs(100));
        state.insert_room(fresh).unwrap();

        assert_eq!(sweep_idle_rooms(&state, start + Duration::from_secs(120)), 1);
        assert!(state.room("STALE1").is_none());
        assert!(state.room("FRESH1").is_some());
    }

    #[tokio::test]
    async fn busy_rooms_survive_the_sweep() {
        let state = state_with_ttl(Duration::from_secs(1));
        let entry = state
            .insert_room(Room::new("BUSY01", GameVariant::Scale))
            .unwrap();
        let now = Instant::now() + Duration::from_secs(30);

        let guard = entry.room().lock().await;
        assert_eq!(sweep_idle_rooms(&state, now), 0);
        drop(guard);
        assert_eq!(sweep_idle_rooms(&state, now), 1);
    }
}
