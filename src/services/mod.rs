/// Source of AI clues and guesses.
pub mod ai_provider;
/// Supervised AI contribution tasks.
pub mod ai_worker;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Server-Sent Events message generation for rooms.
pub mod room_events;
/// Room operations shared by HTTP handlers and AI workers.
pub mod room_service;
/// Idle room eviction.
pub mod room_sweeper;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
