/// Durable identity data storage and retrieval operations.
pub mod venue_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
