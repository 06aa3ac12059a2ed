use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Room Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::game::get_leaderboard,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::CreateGameResponse,
            crate::dto::game::GameDetailsResponse,
            crate::dto::game::LeaderboardResponse,
            crate::dto::game::LeaderboardEntry,
            crate::dto::game::GameSummary,
            crate::dto::game::PlayerSummary,
            crate::dto::ws::JoinGameRequest,
            crate::dto::ws::HostActionRequest,
            crate::dto::ws::HostActionKind,
            crate::dto::ws::SubmitAnswerRequest,
            crate::dao::models::GameState,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Room creation and lookups"),
        (name = "quiz", description = "WebSocket protocol for hosts and players"),
    )
)]
pub struct ApiDoc;
