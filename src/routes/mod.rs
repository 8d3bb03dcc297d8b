use axum::Router;

use crate::state::SharedState;

pub mod auth;
pub mod buzzer;
pub mod docs;
pub mod editor;
pub mod health;
pub mod host;
pub mod public;
pub mod sse;
pub mod views;

/// Compose every route tree and bind the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(public::router())
        .merge(views::router())
        .merge(auth::router())
        .merge(buzzer::router())
        .merge(host::router(state.clone()))
        .merge(editor::router(state.clone()))
        .merge(docs::router());

    api_router.with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{config::AppConfig, dao::game_store::memory::MemoryGameStore, state::AppState};

    async fn app() -> Router<()> {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::default())).await;
        router(state)
    }

    #[tokio::test]
    async fn host_routes_require_the_admin_header() {
        let app = app().await;

        let denied = app
            .clone()
            .oneshot(Request::post("/host/strike").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .oneshot(
                Request::post("/host/scores/reset")
                    .header("x-admin-token", "feud")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn editor_rejects_blank_round_names() {
        let response = app()
            .await
            .oneshot(
                Request::post("/editor/rounds")
                    .header("x-admin-token", "feud")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rest_claim_latches_once() {
        let app = app().await;
        let first = app
            .clone()
            .oneshot(Request::post("/buzzer/a/claim").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(first.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, serde_json::json!({"team": "a", "won": true}));

        let second = app
            .oneshot(Request::post("/buzzer/b/claim").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(second.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["won"], false);
    }
}
