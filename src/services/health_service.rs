use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with the health payload, including the number of live rooms.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.rooms().count();
    debug!(rooms, "health check");
    HealthResponse::ok(rooms)
}
