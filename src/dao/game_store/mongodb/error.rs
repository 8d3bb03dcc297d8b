use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
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
    #[error("failed to provision the game state document")]
    ProvisionState {
        #[source]
        source: MongoError,
    },
    #[error("failed to load the game state document")]
    LoadState {
        #[source]
        source: MongoError,
    },
    #[error("failed to update the game state document")]
    UpdateState {
        #[source]
        source: MongoError,
    },
    #[error("game state document is missing")]
    MissingState,
    #[error("failed to query collection `{collection}`")]
    Query {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert `{id}` into collection `{collection}`")]
    Insert {
        collection: &'static str,
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete from collection `{collection}`")]
    Delete {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("invalid identifier `{value}` stored in `{collection}`")]
    InvalidId {
        collection: &'static str,
        value: String,
    },
}
