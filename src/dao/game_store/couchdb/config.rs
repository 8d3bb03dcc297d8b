use std::time::Duration;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "feud";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the CouchDB backend.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, without the database segment.
    pub base_url: String,
    pub database: String,
    /// Basic-auth `(username, password)` pair.
    pub credentials: Option<(String, String)>,
    /// Upper bound on any single HTTP round trip.
    pub request_timeout: Duration,
}

impl CouchConfig {
    pub fn new(base_url: &str, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            database: database.into(),
            credentials: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` (defaults to `feud`)
    /// and the optional `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        let base_url =
            std::env::var("COUCH_BASE_URL").map_err(|_| CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL",
            })?;
        let database = std::env::var("COUCH_DB")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        let mut config = Self::new(&base_url, database);
        config.credentials = std::env::var("COUCH_USERNAME")
            .ok()
            .zip(std::env::var("COUCH_PASSWORD").ok());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_its_trailing_slash() {
        let config = CouchConfig::new("http://localhost:5984/", "feud");
        assert_eq!(config.base_url, "http://localhost:5984");
        assert!(config.credentials.is_none());
    }
}
