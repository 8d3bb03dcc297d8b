use serde::Deserialize;
use utoipa::ToSchema;

/// Credential check submitted by the login screen.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub secret: String,
}
