use std::time::Duration;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "feud";
const APP_NAME: &str = "feud-back";
/// Keeps a dead server from stalling a request for the driver's 30 s default.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_PING_ATTEMPTS: u32 = 3;

/// Connection settings for the MongoDB backend.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
    /// Pings tried before a fresh connection is declared unreachable.
    pub ping_attempts: u32,
}

impl MongoConfig {
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_owned());
        options
            .server_selection_timeout
            .get_or_insert(SERVER_SELECTION_TIMEOUT);

        Ok(Self {
            options,
            database_name: db_name.unwrap_or(DEFAULT_DB).to_owned(),
            ping_attempts: DEFAULT_PING_ATTEMPTS,
        })
    }

    /// Build a configuration from `MONGO_URI`, the optional `MONGO_DB` and
    /// `MONGO_PING_ATTEMPTS`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = std::env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let db = std::env::var("MONGO_DB").ok();
        let mut config = Self::from_uri(&uri, db.as_deref()).await?;
        if let Some(attempts) = std::env::var("MONGO_PING_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
        {
            config.ping_attempts = attempts.max(1);
        }
        Ok(config)
    }
}
