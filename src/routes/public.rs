use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{content::ContentTree, state::GameStateSnapshot},
    error::AppError,
    services::{board_service, content_service},
    state::SharedState,
};

/// Read-only endpoints shared by every screen.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/state", get(get_state))
        .route("/public/content", get(get_content))
}

/// Current game state row.
#[utoipa::path(
    get,
    path = "/public/state",
    tag = "public",
    responses(
        (status = 200, description = "Current game state", body = GameStateSnapshot),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_state(
    State(state): State<SharedState>,
) -> Result<Json<GameStateSnapshot>, AppError> {
    Ok(Json(board_service::current_state(&state).await?))
}

/// Rounds with their questions and ranked answers.
#[utoipa::path(
    get,
    path = "/public/content",
    tag = "public",
    responses(
        (status = 200, description = "Content hierarchy", body = ContentTree),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_content(State(state): State<SharedState>) -> Result<Json<ContentTree>, AppError> {
    Ok(Json(content_service::content_tree(&state).await?))
}
