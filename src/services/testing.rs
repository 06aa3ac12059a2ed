//! Helpers shared by the service tests: fake clients backed by in-process channels.

use axum::extract::ws::Message;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    config::AppConfig,
    dto::{
        game::{CreateGameRequest, CreateGameResponse},
        ws::{HostActionKind, HostActionRequest, JoinGameRequest, SubmitAnswerRequest},
    },
    error::ServiceError,
    services::game_service,
    state::{AppState, ConnectionId, SharedState},
};

/// A registered connection whose outbound frames can be inspected.
pub struct TestClient {
    pub id: ConnectionId,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl TestClient {
    pub fn connect(state: &SharedState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = state.connections().register(tx);
        Self { id, rx }
    }

    /// Every frame received so far, decoded.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            if let Message::Text(text) = frame {
                frames.push(serde_json::from_str(text.as_str()).unwrap());
            }
        }
        frames
    }

    /// Tags of every frame received so far.
    pub fn kinds(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|frame| frame["type"].as_str().unwrap().to_string())
            .collect()
    }

    /// Last received frame of the given type.
    pub fn last_of(&mut self, kind: &str) -> Option<Value> {
        self.drain().into_iter().rev().find(|frame| frame["type"] == kind)
    }

    pub async fn join(
        &self,
        state: &SharedState,
        room_code: &str,
        name: &str,
    ) -> Result<(), ServiceError> {
        game_service::join_game(
            state,
            self.id,
            JoinGameRequest {
                room_code: room_code.into(),
                player_name: name.into(),
            },
        )
        .await
    }

    pub async fn host(
        &self,
        state: &SharedState,
        action: HostActionKind,
        value: Option<&str>,
    ) -> Result<(), ServiceError> {
        game_service::host_action(
            state,
            self.id,
            HostActionRequest {
                action,
                value: value.map(str::to_string),
            },
        )
        .await
    }

    pub async fn submit(
        &self,
        state: &SharedState,
        answer: &str,
        time_to_answer_ms: u64,
    ) -> Result<(), ServiceError> {
        game_service::submit_answer(
            state,
            self.id,
            SubmitAnswerRequest {
                answer: answer.into(),
                time_to_answer_ms,
            },
        )
        .await
    }
}

pub fn state() -> SharedState {
    state_with(AppConfig::default())
}

pub fn state_with(config: AppConfig) -> SharedState {
    AppState::new(config)
}

/// Create a room with `total_questions` questions.
pub fn open_room(state: &SharedState, total_questions: u32) -> CreateGameResponse {
    game_service::create_game(
        state,
        CreateGameRequest {
            host_id: Some("host-test".into()),
            total_questions: Some(total_questions),
        },
    )
    .unwrap()
}
