//! Screen projections served to the host, display, buzzer and editor pages.

use std::sync::Arc;

use crate::{
    dao::{
        game_store::GameStore,
        models::{AnswerEntity, GameStateEntity, QuestionEntity},
    },
    dto::view::{BuzzerView, DisplayView, HostView, ViewPage, ViewPayload},
    error::ServiceError,
    services::{auth_service, content_service},
    state::SharedState,
};

/// Project the current state for `page`. Host and editor pages require the
/// admin secret in `credential`.
pub async fn view(
    state: &SharedState,
    page: ViewPage,
    credential: Option<&str>,
) -> Result<ViewPayload, ServiceError> {
    if page.requires_credential() {
        auth_service::verify_secret(state.config(), credential)?;
    }
    let store = state.require_game_store().await?;

    let payload = match page {
        ViewPage::Editor => ViewPayload::Editor(content_service::load_tree(&store).await?),
        ViewPage::Buzzer => ViewPayload::Buzzer(BuzzerView::from(&store.load_state().await?)),
        ViewPage::Host => {
            let row = store.load_state().await?;
            let question = board_question(&store, &row).await?;
            ViewPayload::Host(HostView::project(&row, question))
        }
        ViewPage::Display => {
            let row = store.load_state().await?;
            let question = board_question(&store, &row).await?;
            ViewPayload::Display(DisplayView::project(&row, question))
        }
    };
    Ok(payload)
}

/// Question currently on the board with its answers. A dangling pointer
/// renders as an empty board.
async fn board_question(
    store: &Arc<dyn GameStore>,
    row: &GameStateEntity,
) -> Result<Option<(QuestionEntity, Vec<AnswerEntity>)>, ServiceError> {
    let Some(question_id) = row.current_question_id else {
        return Ok(None);
    };
    let Some(question) = store.find_question(question_id).await? else {
        return Ok(None);
    };
    let answers = store.answers_for_question(question_id).await?;
    Ok(Some((question, answers)))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{game_store::memory::MemoryGameStore, models::RoundEntity},
        services::board_service,
        state::AppState,
    };

    async fn seeded() -> (SharedState, QuestionEntity) {
        let store = Arc::new(MemoryGameStore::default());
        let round = RoundEntity {
            id: Uuid::new_v4(),
            name: "Round 1".into(),
            position: 0,
        };
        let question = QuestionEntity {
            id: Uuid::new_v4(),
            round_id: round.id,
            text: "Name a fruit".into(),
            position: 0,
        };
        store.insert_round(round).await.unwrap();
        store.insert_question(question.clone()).await.unwrap();
        for (rank, text) in [(1, "Apple"), (2, "Banana")] {
            store
                .insert_answer(AnswerEntity {
                    id: Uuid::new_v4(),
                    question_id: question.id,
                    text: text.into(),
                    display_order: rank,
                })
                .await
                .unwrap();
        }
        let state = AppState::with_store(AppConfig::default(), store).await;
        (state, question)
    }

    #[tokio::test]
    async fn host_and_editor_pages_need_the_secret() {
        let (state, _) = seeded().await;
        for page in [ViewPage::Host, ViewPage::Editor] {
            assert!(matches!(
                view(&state, page, None).await,
                Err(ServiceError::Unauthorized(_))
            ));
            assert!(view(&state, page, Some("feud")).await.is_ok());
        }
        assert!(view(&state, ViewPage::Display, None).await.is_ok());
        assert!(view(&state, ViewPage::Buzzer, None).await.is_ok());
    }

    #[tokio::test]
    async fn display_shows_selected_question_with_hidden_answers() {
        let (state, question) = seeded().await;
        board_service::select_question(&state, question.id)
            .await
            .unwrap();

        let ViewPayload::Display(display) = view(&state, ViewPage::Display, None).await.unwrap()
        else {
            panic!("expected display payload");
        };
        assert_eq!(display.question_text.as_deref(), Some("Name a fruit"));
        assert_eq!(display.answers.len(), 2);
        assert!(display.answers.iter().all(|a| a.text.is_none()));

        let ViewPayload::Host(host) = view(&state, ViewPage::Host, Some("feud")).await.unwrap()
        else {
            panic!("expected host payload");
        };
        let answers = host.question.unwrap().answers;
        assert_eq!(answers[0].text, "Apple");
        assert_eq!(answers[0].points, 50);
    }
}
