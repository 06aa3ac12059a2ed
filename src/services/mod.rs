/// Room-wide and targeted delivery of server messages.
pub mod broadcast;
/// OpenAPI documentation generation.
pub mod documentation;
/// Room lifecycle: creation, joins, host actions, answer intake and grading.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Read-only room and leaderboard lookups.
pub mod query_service;
/// Speed-based scoring and leaderboard ranking.
pub mod scoring;
/// Per-question countdown tasks.
pub mod timer_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;

#[cfg(test)]
pub(crate) mod testing;
