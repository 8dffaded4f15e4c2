use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the process serves requests.
    pub status: String,
    /// Live rooms held in memory.
    pub rooms: usize,
    /// AI contributions currently being produced.
    pub ai_in_flight: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(rooms: usize, ai_in_flight: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
            ai_in_flight,
        }
    }
}
