//! Error types shared by the CouchDB storage implementation.

use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request never got an HTTP answer.
    #[error("CouchDB {method} `{path}` failed")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered with a status the caller does not handle.
    #[error("CouchDB {method} `{path}` answered {status}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
    },
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to deserialize CouchDB document `{path}`")]
    DeserializeValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("game state document `{doc_id}` is missing")]
    MissingState { doc_id: &'static str },
    /// Concurrent writers kept bumping the revision of a document.
    #[error("gave up writing `{path}` after {attempts} revision conflicts")]
    ConflictRetriesExhausted { path: String, attempts: u32 },
    #[error("invalid document ID `{doc_id}`: {kind}")]
    InvalidDocId { doc_id: String, kind: &'static str },
}

impl CouchDaoError {
    pub(super) fn transport(method: Method, path: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            method,
            path: path.to_owned(),
            source,
        }
    }

    pub(super) fn status(method: Method, path: &str, status: StatusCode) -> Self {
        Self::Status {
            method,
            path: path.to_owned(),
            status,
        }
    }
}
