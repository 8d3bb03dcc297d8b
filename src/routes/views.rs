use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
};

use crate::{
    dto::view::{ViewPage, ViewPayload},
    error::AppError,
    routes::auth::admin_token,
    services::view_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new().route("/views/{page}", get(get_view))
}

/// Projection of the shared state for one screen.
#[utoipa::path(
    get,
    path = "/views/{page}",
    tag = "views",
    params(
        ("page" = ViewPage, Path, description = "Screen to render"),
        ("X-Admin-Token" = Option<String>, Header, description = "Shared admin secret, required for `host` and `editor`")
    ),
    responses(
        (status = 200, description = "Screen payload", body = ViewPayload),
        (status = 401, description = "Missing or invalid admin secret")
    )
)]
pub async fn get_view(
    State(state): State<SharedState>,
    Path(page): Path<ViewPage>,
    headers: HeaderMap,
) -> Result<Json<ViewPayload>, AppError> {
    Ok(Json(
        view_service::view(&state, page, admin_token(&headers)).await?,
    ))
}
