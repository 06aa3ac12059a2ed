use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, GameId, GameState, PlayerEntity, PlayerId},
    dto::format_system_time,
    services::scoring::RankedPlayer,
};

/// Payload used to open a new quiz room.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Opaque host identity; generated when omitted.
    #[validate(length(min = 1, max = 64))]
    pub host_id: Option<String>,
    /// Number of questions in the game; the configured default applies when omitted.
    #[validate(range(min = 1, max = 100))]
    pub total_questions: Option<u32>,
}

/// Public projection of a room.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: GameId,
    pub room_code: String,
    pub host_id: String,
    pub current_question: u32,
    pub total_questions: u32,
    pub game_state: GameState,
    /// Remaining seconds of the running question.
    pub timer: u32,
    #[schema(value_type = Option<String>)]
    pub correct_answer: Option<char>,
    pub created_at: String,
}

impl From<GameEntity> for GameSummary {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            room_code: value.room_code,
            host_id: value.host_id,
            current_question: value.current_question,
            total_questions: value.total_questions,
            game_state: value.state,
            timer: value.timer,
            correct_answer: value.correct_answer,
            created_at: format_system_time(value.created_at),
        }
    }
}

/// Public projection of a participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub game_id: GameId,
    pub name: String,
    pub total_score: u32,
    pub joined_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            name: value.name,
            total_score: value.total_score,
            joined_at: format_system_time(value.joined_at),
        }
    }
}

/// Leaderboard line: a player and their 1-based rank.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    #[serde(flatten)]
    pub player: PlayerSummary,
    pub rank: u32,
}

impl From<RankedPlayer> for LeaderboardEntry {
    fn from(value: RankedPlayer) -> Self {
        Self {
            player: value.player.into(),
            rank: value.rank,
        }
    }
}

/// Response returned once a room has been created.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    pub game: GameSummary,
    pub room_code: String,
}

/// Room lookup result with its current players.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameDetailsResponse {
    pub game: GameSummary,
    pub players: Vec<PlayerSummary>,
}

/// Ranked players of a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Convert ranked players into their wire projection.
pub fn leaderboard_entries(ranked: Vec<RankedPlayer>) -> Vec<LeaderboardEntry> {
    ranked.into_iter().map(LeaderboardEntry::from).collect()
}
