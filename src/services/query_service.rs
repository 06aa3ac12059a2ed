use crate::{
    dao::models::GameId,
    dto::game::{GameDetailsResponse, LeaderboardResponse, PlayerSummary, leaderboard_entries},
    error::ServiceError,
    services::scoring,
    state::SharedState,
};

/// Look up a room by its code together with its current players.
pub async fn get_game(
    state: &SharedState,
    room_code: &str,
) -> Result<GameDetailsResponse, ServiceError> {
    let store = state.store();
    let game_id = store
        .game_by_room_code(room_code)
        .map(|game| game.id)
        .ok_or_else(|| ServiceError::NotFound(format!("game `{room_code}` not found")))?;

    let _room = state.lock_room(game_id).await?;
    let game = store
        .game(game_id)
        .ok_or_else(|| ServiceError::NotFound(format!("game `{room_code}` not found")))?;
    let players = store
        .players_by_game(game_id)
        .into_iter()
        .map(PlayerSummary::from)
        .collect();

    Ok(GameDetailsResponse {
        game: game.into(),
        players,
    })
}

/// Ranked players of a game.
pub async fn get_leaderboard(
    state: &SharedState,
    game_id: GameId,
) -> Result<LeaderboardResponse, ServiceError> {
    let _room = state.lock_room(game_id).await?;
    let players = state.store().players_by_game(game_id);

    Ok(LeaderboardResponse {
        leaderboard: leaderboard_entries(scoring::leaderboard(players)),
    })
}
