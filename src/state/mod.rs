pub mod coordinator;
pub mod errors;
pub mod model;
pub mod registry;
pub mod room;
pub mod scoring;
mod sse;
pub mod state_machine;
pub mod transitions;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    services::{
        ai_provider::ContributionProvider,
        ai_worker::{self, AiSupervisor},
    },
};

pub use self::errors::GameError;
pub use self::room::Room;
pub use self::sse::SseHub;
pub use self::state_machine::{RoundPhase, Snapshot};

/// Shared handle on the application state, cloned into handlers and tasks.
pub type SharedState = Arc<AppState>;

/// Buffered events per room before slow SSE subscribers start lagging.
const ROOM_EVENT_CAPACITY: usize = 32;

/// One live room: the game state behind its lock and the room's event hub.
pub struct RoomEntry {
    room: Mutex<Room>,
    events: SseHub,
}

impl RoomEntry {
    /// Wrap a freshly created room.
    pub fn new(room: Room) -> Self {
        Self {
            room: Mutex::new(room),
            events: SseHub::new(ROOM_EVENT_CAPACITY),
        }
    }

    /// Per-room lock; every action on the room runs while holding it.
    pub fn room(&self) -> &Mutex<Room> {
        &self.room
    }

    /// Broadcast hub feeding the room's SSE stream.
    pub fn events(&self) -> &SseHub {
        &self.events
    }
}

/// Central application state: configuration, live rooms and the AI supervisor.
pub struct AppState {
    config: AppConfig,
    rooms: DashMap<String, Arc<RoomEntry>>,
    ai: AiSupervisor,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Spawns the AI dispatcher, so this must be called from within a Tokio runtime.
    pub fn new(config: AppConfig, provider: Arc<dyn ContributionProvider>) -> SharedState {
        let (ai, receiver) = AiSupervisor::new(provider, *config.ai());
        let state = Arc::new(Self {
            config,
            rooms: DashMap::new(),
            ai,
        });
        tokio::spawn(ai_worker::run_dispatcher(Arc::downgrade(&state), receiver));
        state
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// AI task queue.
    pub fn ai(&self) -> &AiSupervisor {
        &self.ai
    }

    /// Look a room up by code.
    ///
    /// Returns a cloned handle so no map guard is held while the room lock is awaited.
    pub fn room(&self, code: &str) -> Option<Arc<RoomEntry>> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    /// Register a room, returning `None` when its code is already in use.
    pub fn insert_room(&self, room: Room) -> Option<Arc<RoomEntry>> {
        match self.rooms.entry(room.code.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let entry = Arc::new(RoomEntry::new(room));
                slot.insert(entry.clone());
                Some(entry)
            }
        }
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Room store, for the idle sweeper.
    pub(crate) fn rooms(&self) -> &DashMap<String, Arc<RoomEntry>> {
        &self.rooms
    }
}
