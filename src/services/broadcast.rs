use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    dao::models::GameId,
    dto::ws::ServerMessage,
    state::{ConnectionId, SharedState},
};

/// Serialize a message into a text frame, logging (and dropping) serialization failures.
fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(err) => {
            warn!(kind = message.kind(), error = %err, "failed to serialize server message");
            None
        }
    }
}

/// Push a message onto one connection's writer channel.
///
/// Returns `false` when the writer is gone; callers never retry.
pub fn send_to_tx(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) -> bool {
    let Some(frame) = encode(message) else {
        return true;
    };
    tx.send(frame).is_ok()
}

/// Send a message to a single connection by id.
pub fn send_to(state: &SharedState, connection_id: ConnectionId, message: &ServerMessage) {
    let Some(tx) = state.connections().sender(connection_id) else {
        debug!(%connection_id, kind = message.kind(), "dropping message for unknown connection");
        return;
    };
    if !send_to_tx(&tx, message) {
        debug!(%connection_id, kind = message.kind(), "connection writer closed; message dropped");
    }
}

/// Deliver a message to every connection of a room, optionally skipping one.
///
/// Callers hold the room lock so frames reach each member in transition order.
pub fn broadcast_to_room(
    state: &SharedState,
    game_id: GameId,
    message: &ServerMessage,
    exclude: Option<ConnectionId>,
) {
    let Some(frame) = encode(message) else {
        return;
    };

    let mut delivered = 0usize;
    for member in state.connections().members(game_id) {
        if Some(member.id) == exclude {
            continue;
        }
        if member.tx.send(frame.clone()).is_err() {
            debug!(
                game_id,
                connection_id = %member.id,
                kind = message.kind(),
                "dead connection skipped during broadcast"
            );
            continue;
        }
        delivered += 1;
    }

    debug!(game_id, kind = message.kind(), delivered, "room broadcast");
}
