use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness along with the live room count and AI backlog.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.room_count(), state.ai().in_flight())
}
