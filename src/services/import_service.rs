//! Bulk content loader.

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        models::{AnswerEntity, QuestionEntity, RoundEntity},
        storage::StorageResult,
    },
    dto::import::{ImportBatch, ImportReport, ImportRound},
    error::ServiceError,
    state::{
        SharedState,
        feed::{ChangeKind, ContentChange, ContentTable},
    },
};

/// Parse and validate a whole batch before anything is written.
pub fn parse_batch(body: &str) -> Result<ImportBatch, ServiceError> {
    let batch: ImportBatch = serde_json::from_str(body)
        .map_err(|err| ServiceError::InvalidInput(format!("malformed import: {err}")))?;
    batch
        .validate()
        .map_err(|err| ServiceError::InvalidInput(format!("validation failed: {err}")))?;
    Ok(batch)
}

/// Write the batch round by round: the round, then all its questions, then
/// all their answers. The first failed insert stops the import; rounds
/// written before it stay in place. No deduplication is attempted.
pub async fn run_import(
    state: &SharedState,
    batch: ImportBatch,
) -> Result<ImportReport, ServiceError> {
    let store = state.require_game_store().await?;
    let first_position = store.list_rounds().await?.len() as u32;

    let mut committed = 0;
    for (offset, round) in batch.0.into_iter().enumerate() {
        let name = round.round_name.clone();
        let position = first_position + offset as u32;

        if let Err(err) = import_round(state, round, position).await {
            warn!(round = %name, error = %err, "import stopped");
            return Err(ServiceError::Import(ImportReport {
                rounds_committed: committed,
                failed_round: Some(name),
                message: err.to_string(),
            }));
        }
        committed += 1;
    }

    info!(rounds = committed, "import finished");
    Ok(ImportReport {
        rounds_committed: committed,
        failed_round: None,
        message: format!("imported {committed} round(s)"),
    })
}

async fn import_round(state: &SharedState, round: ImportRound, position: u32) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    let round_id = Uuid::new_v4();
    insert(state, ContentTable::Round, round_id, store.insert_round(RoundEntity {
        id: round_id,
        name: round.round_name.trim().to_owned(),
        position,
    }))
    .await?;

    let mut answers = Vec::new();
    for (index, question) in round.questions.into_iter().enumerate() {
        let question_id = Uuid::new_v4();
        insert(
            state,
            ContentTable::Question,
            question_id,
            store.insert_question(QuestionEntity {
                id: question_id,
                round_id,
                text: question.text.trim().to_owned(),
                position: index as u32,
            }),
        )
        .await?;
        answers.extend(question.answers.into_iter().map(|answer| AnswerEntity {
            id: Uuid::new_v4(),
            question_id,
            text: answer.text.trim().to_owned(),
            display_order: answer.order,
        }));
    }

    for answer in answers {
        let id = answer.id;
        insert(state, ContentTable::Answer, id, store.insert_answer(answer)).await?;
    }
    Ok(())
}

async fn insert(
    state: &SharedState,
    table: ContentTable,
    id: Uuid,
    write: impl Future<Output = StorageResult<()>>,
) -> Result<(), ServiceError> {
    write.await?;
    state.feed().publish_content(ContentChange {
        table,
        kind: ChangeKind::Insert,
        id,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::{GameStore, memory::MemoryGameStore},
            models::{BuzzerSlot, BuzzerState, GameStateEntity, StatePatch},
            storage::StorageError,
        },
        services::content_service,
        state::AppState,
    };

    const BATCH: &str = r#"[
        {"round_name": "Warmup", "questions": [
            {"text": "Name a color", "answers": [{"text": "Red", "order": 1}, {"text": "Blue", "order": 2}]}
        ]},
        {"round_name": "Final", "questions": [
            {"text": "Name a month", "answers": [{"text": "May", "order": 1}]},
            {"text": "Name a day", "answers": [{"text": "Friday", "order": 1}]}
        ]}
    ]"#;

    /// Memory store whose round inserts start failing after `budget` successes.
    struct FlakyRounds {
        inner: MemoryGameStore,
        budget: AtomicUsize,
    }

    impl GameStore for FlakyRounds {
        fn load_state(&self) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
            self.inner.load_state()
        }
        fn update_state(&self, patch: StatePatch) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
            self.inner.update_state(patch)
        }
        fn update_state_if(
            &self,
            expected_version: u64,
            patch: StatePatch,
        ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
            self.inner.update_state_if(expected_version, patch)
        }
        fn compare_and_swap_buzzer(
            &self,
            expected: BuzzerState,
            next: BuzzerSlot,
        ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
            self.inner.compare_and_swap_buzzer(expected, next)
        }
        fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
            self.inner.list_rounds()
        }
        fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
            self.inner.list_questions()
        }
        fn list_answers(&self) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
            self.inner.list_answers()
        }
        fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
            self.inner.find_round(id)
        }
        fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
            self.inner.find_question(id)
        }
        fn answers_for_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
            self.inner.answers_for_question(id)
        }
        fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
            let allowed = self
                .budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if allowed {
                self.inner.insert_round(round)
            } else {
                Box::pin(async { Err(StorageError::corrupted("insert rejected")) })
            }
        }
        fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_question(question)
        }
        fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_answer(answer)
        }
        fn delete_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete_round(id)
        }
        fn delete_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete_question(id)
        }
        fn delete_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete_answer(id)
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    #[tokio::test]
    async fn whole_batch_is_written_in_order() {
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::default());
        let state = AppState::with_store(AppConfig::default(), store).await;

        let report = run_import(&state, parse_batch(BATCH).unwrap()).await.unwrap();
        assert_eq!(report.rounds_committed, 2);
        assert!(report.failed_round.is_none());

        let tree = content_service::content_tree(&state).await.unwrap();
        let names: Vec<_> = tree.rounds.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Warmup", "Final"]);
        assert_eq!(tree.rounds[1].questions.len(), 2);
        assert_eq!(tree.rounds[0].questions[0].answers[1].text, "Blue");
    }

    #[tokio::test]
    async fn failure_reports_the_round_in_progress() {
        let store: Arc<dyn GameStore> = Arc::new(FlakyRounds {
            inner: MemoryGameStore::default(),
            budget: AtomicUsize::new(1),
        });
        let state = AppState::with_store(AppConfig::default(), store.clone()).await;

        let err = run_import(&state, parse_batch(BATCH).unwrap())
            .await
            .unwrap_err();
        let ServiceError::Import(report) = err else {
            panic!("expected an import error, got {err:?}");
        };
        assert_eq!(report.rounds_committed, 1);
        assert_eq!(report.failed_round.as_deref(), Some("Final"));
        assert_eq!(store.list_rounds().await.unwrap().len(), 1);
        assert_eq!(store.list_answers().await.unwrap().len(), 2);
    }

    #[test]
    fn malformed_input_is_rejected_before_any_write() {
        assert!(matches!(
            parse_batch("{not json"),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_batch(r#"[{"round_name": "", "questions": []}]"#),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(parse_batch("[]"), Err(ServiceError::InvalidInput(_))));
    }
}
