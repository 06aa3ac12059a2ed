use axum::extract::ws::Message;
use dashmap::DashMap;
use indexmap::IndexSet;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::dao::models::{GameId, PlayerId};

/// Identifier generated for every accepted WebSocket connection.
pub type ConnectionId = Uuid;

/// What a connection represents inside its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Controls progression and grading.
    Host,
    /// Participant backed by a player record.
    Player(PlayerId),
}

/// Room attribution of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// Room the connection joined.
    pub game_id: GameId,
    /// Host or player within that room.
    pub role: Role,
}

impl Identity {
    /// Whether this connection may issue host actions for its room.
    pub fn is_host(&self) -> bool {
        matches!(self.role, Role::Host)
    }

    /// Player id when the connection belongs to a participant.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self.role {
            Role::Player(id) => Some(id),
            Role::Host => None,
        }
    }
}

/// Handle used to push frames to one connected client.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Connection identifier.
    pub id: ConnectionId,
    /// Outbound queue drained by the connection's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
    identity: Option<Identity>,
}

/// Errors raised when attributing a connection to a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// The connection was never registered or has already been closed.
    #[error("connection `{0}` is not registered")]
    UnknownConnection(ConnectionId),
    /// The connection already joined a room during its lifetime.
    #[error("connection already joined room {0}")]
    AlreadyAttached(GameId),
}

/// Registry of live connections and the membership set of every room.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    rooms: DashMap<GameId, IndexSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh connection that has not joined any room yet.
    pub fn register(&self, tx: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            ConnectionHandle {
                id,
                tx,
                identity: None,
            },
        );
        id
    }

    /// Attribute a connection to a room. A connection joins at most one room for its lifetime.
    pub fn attach(&self, id: ConnectionId, identity: Identity) -> Result<(), AttachError> {
        {
            let mut handle = self
                .connections
                .get_mut(&id)
                .ok_or(AttachError::UnknownConnection(id))?;
            if let Some(existing) = handle.identity {
                return Err(AttachError::AlreadyAttached(existing.game_id));
            }
            handle.identity = Some(identity);
        }

        self.rooms.entry(identity.game_id).or_default().insert(id);
        Ok(())
    }

    /// Room attribution of a connection, if it joined one.
    pub fn identity(&self, id: ConnectionId) -> Option<Identity> {
        self.connections.get(&id).and_then(|handle| handle.identity)
    }

    /// Sender half for a single connection.
    pub fn sender(&self, id: ConnectionId) -> Option<mpsc::UnboundedSender<Message>> {
        self.connections.get(&id).map(|handle| handle.tx.clone())
    }

    /// Connections currently attributed to `game_id`, in join order.
    pub fn members(&self, game_id: GameId) -> Vec<ConnectionHandle> {
        let ids: Vec<ConnectionId> = self
            .rooms
            .get(&game_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();

        ids.into_iter()
            .filter_map(|id| self.connections.get(&id).map(|handle| handle.clone()))
            .collect()
    }

    /// Number of connections currently attributed to `game_id`.
    pub fn member_count(&self, game_id: GameId) -> usize {
        self.rooms.get(&game_id).map_or(0, |members| members.len())
    }

    /// Forget a connection, removing it from its room's membership set.
    ///
    /// Returns the identity the connection held, if any.
    pub fn unregister(&self, id: ConnectionId) -> Option<Identity> {
        let (_, handle) = self.connections.remove(&id)?;
        let identity = handle.identity?;
        if let Some(mut members) = self.rooms.get_mut(&identity.game_id) {
            members.shift_remove(&id);
        }
        Some(identity)
    }
}
