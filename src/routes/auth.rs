use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
    routing::post,
};

use crate::{
    dto::auth::LoginRequest,
    error::AppError,
    services::auth_service,
    state::SharedState,
};

/// Header carrying the shared admin secret on host and editor requests.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Login check for the host and editor screens.
pub fn router() -> Router<SharedState> {
    Router::new().route("/auth/login", post(login))
}

/// Check a secret against the configured admin credential.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 204, description = "Secret accepted"),
        (status = 401, description = "Secret rejected")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<StatusCode, AppError> {
    auth_service::login(&state, &payload.secret)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reject requests whose `x-admin-token` header does not match the secret.
pub(crate) async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = admin_token(req.headers());
    auth_service::verify_secret(state.config(), provided)?;
    Ok(next.run(req).await)
}

/// Value of the admin header, if present and valid UTF-8.
pub(crate) fn admin_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
}
