use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for the MongoDB backend.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Per-operation MongoDB failures, each keeping the driver error as source.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save member `{id}`")]
    SaveMember {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save entry session `{id}`")]
    SaveEntrySession {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save venue settings")]
    SaveSettings {
        #[source]
        source: MongoError,
    },
    #[error("failed to load members")]
    LoadMembers {
        #[source]
        source: MongoError,
    },
    #[error("failed to load entry sessions")]
    LoadEntrySessions {
        #[source]
        source: MongoError,
    },
    #[error("failed to load venue settings")]
    LoadSettings {
        #[source]
        source: MongoError,
    },
}
