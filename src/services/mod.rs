/// Admin credential checks.
pub mod auth_service;
/// Host operations on the game state row.
pub mod board_service;
/// Buzzer WebSocket sessions and claims.
pub mod buzzer_service;
/// Round, question and answer editing.
pub mod content_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Bulk content import.
pub mod import_service;
/// Bounded retries for idempotent writes.
pub mod retry;
/// Server-Sent Events payload encoding.
pub mod sse_events;
/// Server-Sent Events fan-out.
pub mod sse_service;
/// Storage connection supervision and degraded mode.
pub mod storage_supervisor;
/// Per-screen projections.
pub mod view_service;
