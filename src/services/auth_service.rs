use crate::{config::AppConfig, error::ServiceError, state::SharedState};

/// Check a presented credential against the shared admin secret.
pub fn verify_secret(config: &AppConfig, presented: Option<&str>) -> Result<(), ServiceError> {
    match presented {
        None => Err(ServiceError::Unauthorized("missing admin token".into())),
        Some(secret) if secret == config.admin_secret => Ok(()),
        Some(_) => Err(ServiceError::Unauthorized("invalid admin token".into())),
    }
}

/// Login check used by the host and editor screens.
pub fn login(state: &SharedState, secret: &str) -> Result<(), ServiceError> {
    verify_secret(state.config(), Some(secret))
}
