use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod rooms;
pub mod sse;

/// Compose all route trees and the documentation UI, then attach the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sse::router())
        .merge(rooms::router())
        .merge(docs::router())
        .with_state(state)
}
