/// Admin service for venue settings and entry roster operations.
pub mod admin_service;
/// Core reservation board logic.
pub mod board_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Server-Sent Events message generation.
pub mod feed_events;
/// Server-Sent Events broadcasting service.
pub mod feed_service;
/// Health check service.
pub mod health_service;
/// Member registration and profile lookups.
pub mod member_service;
/// Entry session check-in handling.
pub mod session_service;
/// Storage connection supervisor with reconciliation.
pub mod storage_supervisor;
