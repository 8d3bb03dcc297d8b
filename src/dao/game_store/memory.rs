//! Process-local storage backend. Used when no database is configured and as
//! the compare-and-swap cell in tests.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{
        AnswerEntity, BuzzerSlot, BuzzerState, GameStateEntity, QuestionEntity, RoundEntity,
        StatePatch,
    },
    storage::StorageResult,
};

/// Game store keeping every table behind a single async mutex.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    state: GameStateEntity,
    rounds: Vec<RoundEntity>,
    questions: Vec<QuestionEntity>,
    answers: Vec<AnswerEntity>,
}

impl MemoryGameStore {
    /// Create a store whose state row starts as `seed`.
    pub fn new(seed: GameStateEntity) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables {
                state: seed,
                ..Tables::default()
            })),
        }
    }
}

fn sorted_by_position<T: Clone>(items: &[T], key: impl Fn(&T) -> (u32, Uuid)) -> Vec<T> {
    let mut items = items.to_vec();
    items.sort_by_key(|item| key(item));
    items
}

impl GameStore for MemoryGameStore {
    fn load_state(&self) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.lock().await.state.clone()) })
    }

    fn update_state(&self, patch: StatePatch) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.lock().await;
            patch.apply_to(&mut guard.state);
            Ok(guard.state.clone())
        })
    }

    fn update_state_if(
        &self,
        expected_version: u64,
        patch: StatePatch,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.lock().await;
            if guard.state.version != expected_version {
                return Ok(None);
            }
            patch.apply_to(&mut guard.state);
            Ok(Some(guard.state.clone()))
        })
    }

    fn compare_and_swap_buzzer(
        &self,
        expected: BuzzerState,
        next: BuzzerSlot,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.lock().await;
            if guard.state.buzzer_state != expected {
                return Ok(None);
            }
            StatePatch {
                buzzer: Some(next),
                ..StatePatch::default()
            }
            .apply_to(&mut guard.state);
            Ok(Some(guard.state.clone()))
        })
    }

    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.lock().await;
            Ok(sorted_by_position(&guard.rounds, |r| (r.position, r.id)))
        })
    }

    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.lock().await;
            Ok(sorted_by_position(&guard.questions, |q| (q.position, q.id)))
        })
    }

    fn list_answers(&self) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.lock().await.answers.clone()) })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.lock().await;
            Ok(guard.rounds.iter().find(|round| round.id == id).cloned())
        })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.lock().await;
            Ok(guard.questions.iter().find(|q| q.id == id).cloned())
        })
    }

    fn answers_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.lock().await;
            Ok(guard
                .answers
                .iter()
                .filter(|answer| answer.question_id == question_id)
                .cloned()
                .collect())
        })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.lock().await.rounds.push(round);
            Ok(())
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.lock().await.questions.push(question);
            Ok(())
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.lock().await.answers.push(answer);
            Ok(())
        })
    }

    fn delete_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.lock().await;
            let before = guard.rounds.len();
            guard.rounds.retain(|round| round.id != id);
            if guard.rounds.len() == before {
                return Ok(false);
            }

            let question_ids: Vec<Uuid> = guard
                .questions
                .iter()
                .filter(|q| q.round_id == id)
                .map(|q| q.id)
                .collect();
            guard.questions.retain(|q| q.round_id != id);
            guard
                .answers
                .retain(|answer| !question_ids.contains(&answer.question_id));
            Ok(true)
        })
    }

    fn delete_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.lock().await;
            let before = guard.questions.len();
            guard.questions.retain(|q| q.id != id);
            if guard.questions.len() == before {
                return Ok(false);
            }
            guard.answers.retain(|answer| answer.question_id != id);
            Ok(true)
        })
    }

    fn delete_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.lock().await;
            let before = guard.answers.len();
            guard.answers.retain(|answer| answer.id != id);
            Ok(guard.answers.len() != before)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
