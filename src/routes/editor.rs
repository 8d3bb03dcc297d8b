use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        content::{AnswerInput, CreatedResponse, QuestionInput, RoundInput},
        import::{ImportBatch, ImportReport},
    },
    error::AppError,
    routes::auth::require_admin_token,
    services::{content_service, import_service},
    state::SharedState,
};

/// Content editor endpoints. Every route requires the admin secret.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/editor/rounds", post(create_round))
        .route("/editor/rounds/{id}", delete(delete_round))
        .route("/editor/rounds/{id}/questions", post(create_question))
        .route("/editor/questions/{id}", delete(delete_question))
        .route("/editor/questions/{id}/answers", post(create_answer))
        .route("/editor/answers/{id}", delete(delete_answer))
        .route("/editor/import", post(import))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Append a round.
#[utoipa::path(
    post,
    path = "/editor/rounds",
    tag = "editor",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = RoundInput,
    responses((status = 201, description = "Round created", body = CreatedResponse))
)]
pub async fn create_round(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RoundInput>>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let created = content_service::create_round(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete a round with its questions and answers.
#[utoipa::path(
    delete,
    path = "/editor/rounds/{id}",
    tag = "editor",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret"),
    ("id" = Uuid, Path, description = "Round to delete")),
    responses(
        (status = 204, description = "Round deleted"),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn delete_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    content_service::delete_round(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Append a question to a round.
#[utoipa::path(
    post,
    path = "/editor/rounds/{id}/questions",
    tag = "editor",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret"),
    ("id" = Uuid, Path, description = "Owning round")),
    request_body = QuestionInput,
    responses(
        (status = 201, description = "Question created", body = CreatedResponse),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn create_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<QuestionInput>>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let created = content_service::create_question(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/editor/questions/{id}",
    tag = "editor",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret"),
    ("id" = Uuid, Path, description = "Question to delete")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Unknown question")
    )
)]
pub async fn delete_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    content_service::delete_question(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Attach an answer to a question.
#[utoipa::path(
    post,
    path = "/editor/questions/{id}/answers",
    tag = "editor",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret"),
    ("id" = Uuid, Path, description = "Owning question")),
    request_body = AnswerInput,
    responses(
        (status = 201, description = "Answer created", body = CreatedResponse),
        (status = 404, description = "Unknown question")
    )
)]
pub async fn create_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<AnswerInput>>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let created = content_service::create_answer(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/editor/answers/{id}",
    tag = "editor",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret"),
    ("id" = Uuid, Path, description = "Answer to delete")),
    responses(
        (status = 204, description = "Answer deleted"),
        (status = 404, description = "Unknown answer")
    )
)]
pub async fn delete_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    content_service::delete_answer(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Load rounds, questions and answers in bulk.
///
/// The body is parsed and validated as a whole before anything is written.
/// A failed insert stops the import and the rounds written so far stay.
#[utoipa::path(
    post,
    path = "/editor/import",
    tag = "editor",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = ImportBatch,
    responses(
        (status = 200, description = "Every round imported", body = ImportReport),
        (status = 400, description = "Malformed or invalid batch; nothing written"),
        (status = 502, description = "Import stopped part-way", body = ImportReport)
    )
)]
pub async fn import(
    State(state): State<SharedState>,
    body: String,
) -> Result<Json<ImportReport>, AppError> {
    let batch = import_service::parse_batch(&body)?;
    Ok(Json(import_service::run_import(&state, batch).await?))
}
