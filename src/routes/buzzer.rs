//! Buzzer device surface: the WebSocket session and its REST fallback.

use axum::{
    Json, Router,
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
    routing::{get, post},
};

use crate::{
    dao::models::TeamTag,
    dto::ws::ClaimResponse,
    error::AppError,
    services::buzzer_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/buzzer/{team}/claim", post(claim))
}

/// Upgrade into a buzzer session. The device must identify its team with
/// the first message.
#[utoipa::path(
    get,
    path = "/ws",
    tag = "buzzers",
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
pub async fn ws_handler(State(state): State<SharedState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| buzzer_service::handle_socket(state, socket))
}

/// Try to latch the buzzer for `team` without holding a socket open.
#[utoipa::path(
    post,
    path = "/buzzer/{team}/claim",
    tag = "buzzers",
    params(("team" = TeamTag, Path, description = "Claiming team")),
    responses(
        (status = 200, description = "Claim resolved; `won` tells whether it latched", body = ClaimResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn claim(
    State(state): State<SharedState>,
    Path(team): Path<TeamTag>,
) -> Result<Json<ClaimResponse>, AppError> {
    Ok(Json(buzzer_service::claim_for(&state, team).await?))
}
