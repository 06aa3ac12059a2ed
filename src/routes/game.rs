use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dao::models::GameId,
    dto::game::{
        CreateGameRequest, CreateGameResponse, GameDetailsResponse, LeaderboardResponse,
    },
    error::AppError,
    services::{game_service, query_service},
    state::SharedState,
};

/// Routes handling room creation and lookups.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/games", post(create_game))
        .route("/api/games/{id}", get(get_game))
        .route("/api/games/{id}/leaderboard", get(get_leaderboard))
}

/// Open a new quiz room.
#[utoipa::path(
    post,
    path = "/api/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = CreateGameResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<CreateGameResponse>, AppError> {
    let created = game_service::create_game(&state, payload)?;
    Ok(Json(created))
}

/// Look up a room by its code.
#[utoipa::path(
    get,
    path = "/api/games/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Room code of the game, e.g. `QZ-AB12`")),
    responses(
        (status = 200, description = "Game and its players", body = GameDetailsResponse),
        (status = 404, description = "Unknown room code")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(room_code): Path<String>,
) -> Result<Json<GameDetailsResponse>, AppError> {
    let details = query_service::get_game(&state, &room_code).await?;
    Ok(Json(details))
}

/// Ranked players of a game.
#[utoipa::path(
    get,
    path = "/api/games/{id}/leaderboard",
    tag = "game",
    params(("id" = u64, Path, description = "Numeric identifier of the game")),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let leaderboard = query_service::get_leaderboard(&state, game_id).await?;
    Ok(Json(leaderboard))
}
