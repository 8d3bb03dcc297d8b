//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::{DEFAULT_TEAM_A_NAME, DEFAULT_TEAM_B_NAME};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FEUD_BACK_CONFIG_PATH";
/// Environment variable that overrides the configured admin secret.
const ADMIN_SECRET_ENV: &str = "FEUD_ADMIN_SECRET";

const DEFAULT_ADMIN_SECRET: &str = "feud";
const DEFAULT_FEED_CAPACITY: usize = 64;
const DEFAULT_WRITE_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Shared credential gating the host and editor surfaces.
    pub admin_secret: String,
    /// Name given to team `a` when none is set.
    pub default_team_a_name: String,
    /// Name given to team `b` when none is set.
    pub default_team_b_name: String,
    /// Capacity of each change feed channel.
    pub feed_capacity: usize,
    /// Attempts for idempotent host writes before giving up.
    pub write_retry_attempts: u32,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults,
    /// then apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides(env::var(ADMIN_SECRET_ENV).ok())
    }

    /// Parse a JSON document; absent keys keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    fn with_env_overrides(mut self, admin_secret: Option<String>) -> Self {
        if let Some(secret) = admin_secret.filter(|value| !value.is_empty()) {
            info!("admin secret overridden from environment");
            self.admin_secret = secret;
        }
        self
    }

    /// Name for `team_a` falling back to the configured default when blank.
    pub fn team_a_name_or_default(&self, name: &str) -> String {
        non_blank(name).unwrap_or_else(|| self.default_team_a_name.clone())
    }

    /// Name for `team_b` falling back to the configured default when blank.
    pub fn team_b_name_or_default(&self, name: &str) -> String {
        non_blank(name).unwrap_or_else(|| self.default_team_b_name.clone())
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_secret: DEFAULT_ADMIN_SECRET.to_owned(),
            default_team_a_name: DEFAULT_TEAM_A_NAME.to_owned(),
            default_team_b_name: DEFAULT_TEAM_B_NAME.to_owned(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
            write_retry_attempts: DEFAULT_WRITE_RETRY_ATTEMPTS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    admin_secret: Option<String>,
    default_team_a_name: Option<String>,
    default_team_b_name: Option<String>,
    feed_capacity: Option<usize>,
    write_retry_attempts: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            admin_secret: value.admin_secret.unwrap_or(defaults.admin_secret),
            default_team_a_name: value
                .default_team_a_name
                .unwrap_or(defaults.default_team_a_name),
            default_team_b_name: value
                .default_team_b_name
                .unwrap_or(defaults.default_team_b_name),
            feed_capacity: value.feed_capacity.unwrap_or(defaults.feed_capacity),
            write_retry_attempts: value
                .write_retry_attempts
                .unwrap_or(defaults.write_retry_attempts)
                .max(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = AppConfig::from_json(r#"{"admin_secret":"s3cret","feed_capacity":8}"#)
            .unwrap();
        assert_eq!(config.admin_secret, "s3cret");
        assert_eq!(config.feed_capacity, 8);
        assert_eq!(config.default_team_a_name, "Team A");
        assert_eq!(config.write_retry_attempts, 3);
    }

    #[test]
    fn environment_secret_wins_over_file() {
        let config = AppConfig::default().with_env_overrides(Some("from-env".into()));
        assert_eq!(config.admin_secret, "from-env");

        let config = AppConfig::default().with_env_overrides(Some(String::new()));
        assert_eq!(config.admin_secret, "feud");
    }

    #[test]
    fn blank_team_names_fall_back() {
        let config = AppConfig::default();
        assert_eq!(config.team_a_name_or_default("   "), "Team A");
        assert_eq!(config.team_b_name_or_default(" Owls "), "Owls");
    }
}
