/// Live connections and room membership.
pub mod connections;
/// Per-room runtime, lock registry and countdown handles.
pub mod room;
/// Room lifecycle state machine.
pub mod state_machine;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::{
        models::GameId,
        room_store::{MemoryRoomStore, RoomStore},
    },
    error::ServiceError,
};

pub use self::connections::{AttachError, ConnectionId, ConnectionRegistry, Identity, Role};
pub use self::room::{RoomGuard, RoomRegistry, RoomRuntime, TimerHandle};
pub use self::state_machine::{ApplyError, Plan, PlanError, PlanId};

/// Reference-counted handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: configuration, record store, room runtimes and live connections.
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<dyn RoomStore>,
    rooms: RoomRegistry,
    connections: ConnectionRegistry,
}

impl AppState {
    /// Construct a new [`AppState`] backed by an in-memory store, wrapped in an [`Arc`] so it can
    /// be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_store(config, Arc::new(MemoryRoomStore::new()))
    }

    /// Construct the state around an explicit store implementation.
    pub fn with_store(config: AppConfig, store: Arc<dyn RoomStore>) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            store,
            rooms: RoomRegistry::new(),
            connections: ConnectionRegistry::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Record store holding games, players and answers.
    pub fn store(&self) -> &dyn RoomStore {
        self.store.as_ref()
    }

    /// Arena of per-room runtimes.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Registry of live connections and room membership.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Acquire the lock of the room backing `game_id`.
    ///
    /// Rooms created outside of this process state (e.g. seeded directly into the store) get a
    /// runtime resumed from their persisted state on first access.
    pub async fn lock_room(&self, game_id: GameId) -> Result<RoomGuard, ServiceError> {
        let room = match self.rooms.get(game_id) {
            Some(room) => room,
            None => {
                let game = self
                    .store
                    .game(game_id)
                    .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;
                self.rooms.get_or_insert(game_id, game.state.into())
            }
        };
        Ok(room.lock_owned().await)
    }
}
