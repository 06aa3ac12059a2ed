use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::PlayerId,
    dto::{
        game::{GameSummary, LeaderboardEntry, PlayerSummary},
        validation::{validate_player_name, validate_room_code},
    },
};

/// Messages accepted from quiz WebSocket clients, framed as `{"type": ..., "data": {...}}`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGame(JoinGameRequest),
    HostAction(HostActionRequest),
    SubmitAnswer(SubmitAnswerRequest),
}

/// Join a room as a player, or as its host when `playerName` is the host sentinel.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    #[validate(custom(function = "validate_player_name"))]
    pub player_name: String,
}

/// Host-only commands driving the question cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HostActionKind {
    NextQuestion,
    SetAnswer,
    EndGame,
}

/// Host command with its optional argument (the correct letter for `set_answer`).
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct HostActionRequest {
    pub action: HostActionKind,
    #[serde(default)]
    #[validate(length(max = 8))]
    pub value: Option<String>,
}

/// Answer submitted by a player for the running question.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 8))]
    pub answer: String,
    /// Client-measured milliseconds since the question started.
    #[serde(alias = "timeToAnswer")]
    pub time_to_answer_ms: u64,
}

/// Reasons an inbound frame is rejected before dispatch.
#[derive(Debug, Error)]
pub enum InboundError {
    #[error("invalid message format: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid message format: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(text)?;
        match &message {
            Self::JoinGame(request) => request.validate()?,
            Self::HostAction(request) => request.validate()?,
            Self::SubmitAnswer(request) => request.validate()?,
        }
        Ok(message)
    }
}

/// Messages pushed to quiz WebSocket clients, framed as `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    HostJoined {
        game: GameSummary,
    },
    JoinedGame {
        game: GameSummary,
        player: PlayerSummary,
        players: Vec<PlayerSummary>,
    },
    PlayerJoined {
        player: PlayerSummary,
        player_count: usize,
    },
    PlayerLeft {
        player_id: PlayerId,
        player_count: usize,
    },
    QuestionStarted {
        question_number: u32,
        timer: u32,
    },
    TimerUpdate {
        timer: u32,
    },
    TimerExpired {
        question_number: u32,
    },
    /// Private acknowledgement for the submitting player.
    AnswerSubmitted {
        answer: char,
        time_to_answer: u64,
    },
    /// Progress notice; reports counts only so answers do not leak before grading.
    AnswerStats {
        answered_count: usize,
        total_players: usize,
    },
    QuestionScored {
        correct_answer: char,
        leaderboard: Vec<LeaderboardEntry>,
        question_number: u32,
    },
    GameEnded {
        leaderboard: Vec<LeaderboardEntry>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    /// Error notice sent to the originating connection only.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire tag of the message, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HostJoined { .. } => "host_joined",
            Self::JoinedGame { .. } => "joined_game",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::QuestionStarted { .. } => "question_started",
            Self::TimerUpdate { .. } => "timer_update",
            Self::TimerExpired { .. } => "timer_expired",
            Self::AnswerSubmitted { .. } => "answer_submitted",
            Self::AnswerStats { .. } => "answer_stats",
            Self::QuestionScored { .. } => "question_scored",
            Self::GameEnded { .. } => "game_ended",
            Self::Error { .. } => "error",
        }
    }
}
