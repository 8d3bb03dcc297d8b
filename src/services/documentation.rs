use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Feud Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::buzzer::ws_handler,
        crate::routes::buzzer::claim,
        crate::routes::auth::login,
        crate::routes::public::get_state,
        crate::routes::public::get_content,
        crate::routes::views::get_view,
        crate::routes::host::select_question,
        crate::routes::host::clear_board,
        crate::routes::host::reveal,
        crate::routes::host::reveal_all,
        crate::routes::host::give_strike,
        crate::routes::host::reset_buzzer,
        crate::routes::host::set_score,
        crate::routes::host::reset_scores,
        crate::routes::host::set_team_names,
        crate::routes::editor::create_round,
        crate::routes::editor::delete_round,
        crate::routes::editor::create_question,
        crate::routes::editor::delete_question,
        crate::routes::editor::create_answer,
        crate::routes::editor::delete_answer,
        crate::routes::editor::import,
    ),
    components(
        schemas(
            crate::dao::models::BuzzerState,
            crate::dao::models::TeamTag,
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::auth::LoginRequest,
            crate::dto::state::GameStateSnapshot,
            crate::dto::host::SelectQuestionRequest,
            crate::dto::host::RevealRequest,
            crate::dto::host::SetScoreRequest,
            crate::dto::host::TeamNamesRequest,
            crate::dto::host::ActionOutcome,
            crate::dto::content::RoundInput,
            crate::dto::content::QuestionInput,
            crate::dto::content::AnswerInput,
            crate::dto::content::CreatedResponse,
            crate::dto::content::ContentTree,
            crate::dto::import::ImportBatch,
            crate::dto::import::ImportReport,
            crate::dto::view::ViewPage,
            crate::dto::view::ViewPayload,
            crate::dto::ws::BuzzerInboundMessage,
            crate::dto::ws::BuzzerOutboundMessage,
            crate::dto::ws::ClaimResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::state::feed::ContentChange,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "buzzers", description = "Buzzer device operations"),
        (name = "auth", description = "Admin credential check"),
        (name = "public", description = "Read-only game state and content"),
        (name = "views", description = "Per-screen projections"),
        (name = "host", description = "Host control surface"),
        (name = "editor", description = "Content editing and bulk import"),
    )
)]
pub struct ApiDoc;
