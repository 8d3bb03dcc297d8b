use axum::{Json, Router, extract::State, middleware, routing::post};

use crate::{
    dto::host::{
        ActionOutcome, RevealRequest, SelectQuestionRequest, SetScoreRequest, TeamNamesRequest,
    },
    error::AppError,
    routes::auth::require_admin_token,
    services::board_service,
    state::SharedState,
};

/// Host control surface. Every route requires the admin secret.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/host/question", post(select_question))
        .route("/host/clear", post(clear_board))
        .route("/host/reveal", post(reveal))
        .route("/host/reveal-all", post(reveal_all))
        .route("/host/strike", post(give_strike))
        .route("/host/buzzer/reset", post(reset_buzzer))
        .route("/host/score", post(set_score))
        .route("/host/scores/reset", post(reset_scores))
        .route("/host/teams", post(set_team_names))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Put a question on the board and re-arm the buzzer.
#[utoipa::path(
    post,
    path = "/host/question",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = SelectQuestionRequest,
    responses(
        (status = 200, description = "Question selected", body = ActionOutcome),
        (status = 404, description = "Unknown question")
    )
)]
pub async fn select_question(
    State(state): State<SharedState>,
    Json(payload): Json<SelectQuestionRequest>,
) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(
        board_service::select_question(&state, payload.question_id).await?,
    ))
}

/// Take the question off the board.
#[utoipa::path(
    post,
    path = "/host/clear",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Board cleared", body = ActionOutcome))
)]
pub async fn clear_board(State(state): State<SharedState>) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(board_service::clear_board(&state).await?))
}

/// Reveal one answer and credit its points to the buzzer winner.
#[utoipa::path(
    post,
    path = "/host/reveal",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = RevealRequest,
    responses((status = 200, description = "Reveal attempted; `applied` tells whether it scored", body = ActionOutcome))
)]
pub async fn reveal(
    State(state): State<SharedState>,
    Json(payload): Json<RevealRequest>,
) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(board_service::reveal(&state, payload.answer_id).await?))
}

/// Reveal every answer of the current question without scoring.
#[utoipa::path(
    post,
    path = "/host/reveal-all",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "All answers revealed", body = ActionOutcome))
)]
pub async fn reveal_all(State(state): State<SharedState>) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(board_service::reveal_all(&state).await?))
}

#[utoipa::path(
    post,
    path = "/host/strike",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Strike attempted", body = ActionOutcome))
)]
pub async fn give_strike(State(state): State<SharedState>) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(board_service::give_strike(&state).await?))
}

#[utoipa::path(
    post,
    path = "/host/buzzer/reset",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Buzzer re-armed", body = ActionOutcome))
)]
pub async fn reset_buzzer(
    State(state): State<SharedState>,
) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(board_service::reset_buzzer(&state).await?))
}

/// Overwrite one team's score.
#[utoipa::path(
    post,
    path = "/host/score",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = SetScoreRequest,
    responses((status = 200, description = "Score set", body = ActionOutcome))
)]
pub async fn set_score(
    State(state): State<SharedState>,
    Json(payload): Json<SetScoreRequest>,
) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(
        board_service::set_score(&state, payload.team, payload.value).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/host/scores/reset",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Scores zeroed", body = ActionOutcome))
)]
pub async fn reset_scores(
    State(state): State<SharedState>,
) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(board_service::reset_scores(&state).await?))
}

/// Rename both teams.
#[utoipa::path(
    post,
    path = "/host/teams",
    tag = "host",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = TeamNamesRequest,
    responses((status = 200, description = "Teams renamed", body = ActionOutcome))
)]
pub async fn set_team_names(
    State(state): State<SharedState>,
    Json(payload): Json<TeamNamesRequest>,
) -> Result<Json<ActionOutcome>, AppError> {
    Ok(Json(
        board_service::set_team_names(&state, &payload.team_a_name, &payload.team_b_name).await?,
    ))
}
