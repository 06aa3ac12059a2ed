use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ClientMessage, InboundError, ServerMessage},
    error::ServiceError,
    services::{broadcast, game_service},
    state::{ConnectionId, SharedState},
};

/// Failure while handling one inbound frame.
#[derive(Debug, Error)]
enum ClientError {
    /// Frame could not be parsed or validated.
    #[error(transparent)]
    Inbound(#[from] InboundError),
    /// Request was rejected by the game service.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ClientError {
    /// Text reported to the originating client, if the error should be reported at all.
    fn client_message(&self) -> Option<String> {
        match self {
            ClientError::Inbound(err) => Some(err.to_string()),
            ClientError::Service(err) if err.is_reportable() => Some(err.detail().to_string()),
            ClientError::Service(_) => None,
        }
    }
}

/// Handle the full lifecycle of a quiz client WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = state.connections().register(outbound_tx.clone());
    info!(%connection_id, "quiz client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if !handle_text(&state, connection_id, &outbound_tx, text.as_str()).await {
                    info!(%connection_id, "connection closed while replying, terminating");
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                debug!(%connection_id, "client closed the connection");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {
                debug!(%connection_id, "ignoring binary frame");
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    game_service::leave_game(&state, connection_id).await;
    info!(%connection_id, "quiz client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Parse, dispatch and report the outcome of one text frame.
///
/// Returns `false` once the connection's writer is gone.
async fn handle_text(
    state: &SharedState,
    connection_id: ConnectionId,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    text: &str,
) -> bool {
    debug!(%connection_id, payload = %text, "received client message");

    let result = match ClientMessage::from_json_str(text) {
        Ok(message) => dispatch(state, connection_id, message).await,
        Err(err) => Err(err.into()),
    };

    let Err(err) = result else {
        return true;
    };

    match err.client_message() {
        Some(message) => {
            warn!(%connection_id, error = %err, "client request rejected");
            broadcast::send_to_tx(outbound_tx, &ServerMessage::error(message))
        }
        None => {
            debug!(%connection_id, error = %err, "client request dropped");
            true
        }
    }
}

async fn dispatch(
    state: &SharedState,
    connection_id: ConnectionId,
    message: ClientMessage,
) -> Result<(), ClientError> {
    match message {
        ClientMessage::JoinGame(request) => {
            game_service::join_game(state, connection_id, request).await?
        }
        ClientMessage::HostAction(request) => {
            game_service::host_action(state, connection_id, request).await?
        }
        ClientMessage::SubmitAnswer(request) => {
            game_service::submit_answer(state, connection_id, request).await?
        }
    }
    Ok(())
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
