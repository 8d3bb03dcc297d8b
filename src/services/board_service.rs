//! Host operations. Each one computes a patch with the pure board rules,
//! writes it and publishes the resulting row image.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::{GameStateEntity, StatePatch, TeamTag},
    },
    dto::{host::ActionOutcome, state::GameStateSnapshot},
    error::ServiceError,
    services::retry::retry_idempotent,
    state::{SharedState, board},
};

/// Current row image.
pub async fn current_state(state: &SharedState) -> Result<GameStateSnapshot, ServiceError> {
    let store = state.require_game_store().await?;
    Ok(store.load_state().await?.into())
}

/// Write `patch` and fan the new image out to subscribers.
pub(crate) async fn commit(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    patch: StatePatch,
) -> Result<GameStateEntity, ServiceError> {
    let image = store.update_state(patch).await?;
    state.feed().publish_state(image.clone());
    Ok(image)
}

/// Write `patch` computed from the row image `read`, only if no other write
/// landed since. A refused write yields the current row as `ignored`.
async fn commit_from(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    read: &GameStateEntity,
    patch: StatePatch,
) -> Result<ActionOutcome, ServiceError> {
    match store.update_state_if(read.version, patch).await? {
        Some(image) => {
            state.feed().publish_state(image.clone());
            Ok(applied(image))
        }
        None => {
            debug!(version = read.version, "row changed since it was read; write dropped");
            Ok(ignored(store.load_state().await?))
        }
    }
}

/// [`commit`] with bounded retries; only for patches that are safe to replay.
async fn commit_idempotent(
    state: &SharedState,
    operation: &'static str,
    patch: StatePatch,
) -> Result<ActionOutcome, ServiceError> {
    let store = state.require_game_store().await?;
    let image = retry_idempotent(state.config().write_retry_attempts, operation, || {
        store.update_state(patch.clone())
    })
    .await?;
    state.feed().publish_state(image.clone());
    Ok(applied(image))
}

fn applied(image: GameStateEntity) -> ActionOutcome {
    ActionOutcome {
        applied: true,
        state: image.into(),
    }
}

fn ignored(image: GameStateEntity) -> ActionOutcome {
    ActionOutcome {
        applied: false,
        state: image.into(),
    }
}

/// Put a question on the board, resetting strikes, reveals and the buzzer.
pub async fn select_question(
    state: &SharedState,
    question_id: Uuid,
) -> Result<ActionOutcome, ServiceError> {
    let store = state.require_game_store().await?;
    if store.find_question(question_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "question `{question_id}` not found"
        )));
    }
    info!(%question_id, "question selected");
    commit_idempotent(state, "select_question", board::select_question(question_id)).await
}

/// Same as [`select_question`] with no question on the board.
pub async fn clear_board(state: &SharedState) -> Result<ActionOutcome, ServiceError> {
    commit_idempotent(state, "clear_board", board::clear_board()).await
}

/// Reveal one answer of the current question, crediting the buzzer winner.
pub async fn reveal(state: &SharedState, answer_id: Uuid) -> Result<ActionOutcome, ServiceError> {
    let store = state.require_game_store().await?;
    let current = store.load_state().await?;

    let answer = match current.current_question_id {
        Some(question_id) => store
            .answers_for_question(question_id)
            .await?
            .into_iter()
            .find(|answer| answer.id == answer_id),
        None => None,
    };

    let Some(patch) = answer.and_then(|answer| board::reveal(&current, &answer)) else {
        debug!(%answer_id, "reveal ignored");
        return Ok(ignored(current));
    };

    let outcome = commit_from(state, &store, &current, patch).await?;
    if outcome.applied {
        info!(%answer_id, "answer revealed");
    }
    Ok(outcome)
}

/// Reveal every answer of the current question without scoring.
pub async fn reveal_all(state: &SharedState) -> Result<ActionOutcome, ServiceError> {
    let store = state.require_game_store().await?;
    let current = store.load_state().await?;

    let answers = match current.current_question_id {
        Some(question_id) => store.answers_for_question(question_id).await?,
        None => Vec::new(),
    };

    let Some(patch) = board::reveal_all(&current, &answers) else {
        debug!("reveal all ignored: no question on the board");
        return Ok(ignored(current));
    };
    commit_from(state, &store, &current, patch).await
}

/// Add a strike and re-open the buzzer.
pub async fn give_strike(state: &SharedState) -> Result<ActionOutcome, ServiceError> {
    let store = state.require_game_store().await?;
    let current = store.load_state().await?;

    let Some(patch) = board::give_strike(&current) else {
        debug!(strikes = current.strikes, "strike ignored");
        return Ok(ignored(current));
    };
    commit_from(state, &store, &current, patch).await
}

/// Force the buzzer open whatever its state.
pub async fn reset_buzzer(state: &SharedState) -> Result<ActionOutcome, ServiceError> {
    commit_idempotent(state, "reset_buzzer", board::reset_buzzer()).await
}

/// Manual score override.
pub async fn set_score(
    state: &SharedState,
    team: TeamTag,
    value: i32,
) -> Result<ActionOutcome, ServiceError> {
    info!(team = team.as_str(), value, "score overridden");
    commit_idempotent(state, "set_score", board::set_score(team, value)).await
}

pub async fn reset_scores(state: &SharedState) -> Result<ActionOutcome, ServiceError> {
    commit_idempotent(state, "reset_scores", board::reset_scores()).await
}

/// Rename both teams; blank names fall back to the configured defaults.
pub async fn set_team_names(
    state: &SharedState,
    team_a_name: &str,
    team_b_name: &str,
) -> Result<ActionOutcome, ServiceError> {
    let config = state.config();
    let patch = board::rename_teams(
        config.team_a_name_or_default(team_a_name),
        config.team_b_name_or_default(team_b_name),
    );
    commit_idempotent(state, "set_team_names", patch).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::{StreamExt, future::BoxFuture};
    use tokio::sync::oneshot;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::memory::MemoryGameStore,
            models::{AnswerEntity, BuzzerSlot, BuzzerState, QuestionEntity, RoundEntity},
            storage::StorageResult,
        },
        state::{AppState, buzzer},
    };

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum PausePoint {
        AfterStateWrite,
        BeforeAnswerLookup,
    }

    type Pause = (PausePoint, oneshot::Sender<()>, oneshot::Receiver<()>);

    /// Memory store that can hold one call at a chosen point until the test
    /// lets it continue, so another writer can run in between.
    #[derive(Clone, Default)]
    struct PausingStore {
        inner: MemoryGameStore,
        pause: Arc<Mutex<Option<Pause>>>,
    }

    impl PausingStore {
        /// Returns a receiver fired when the call reaches `point` and a
        /// sender that resumes it.
        fn pause_at(&self, point: PausePoint) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
            let (reached_tx, reached_rx) = oneshot::channel();
            let (resume_tx, resume_rx) = oneshot::channel();
            *self.pause.lock().unwrap() = Some((point, reached_tx, resume_rx));
            (reached_rx, resume_tx)
        }

        fn take(&self, point: PausePoint) -> Option<(oneshot::Sender<()>, oneshot::Receiver<()>)> {
            let mut guard = self.pause.lock().unwrap();
            match guard.take() {
                Some((armed, reached, resume)) if armed == point => Some((reached, resume)),
                other => {
                    *guard = other;
                    None
                }
            }
        }
    }

    async fn hold(pause: Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>) {
        if let Some((reached, resume)) = pause {
            let _ = reached.send(());
            let _ = resume.await;
        }
    }

    impl GameStore for PausingStore {
        fn load_state(&self) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
            self.inner.load_state()
        }
        fn update_state(&self, patch: StatePatch) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
            let write = self.inner.update_state(patch);
            let pause = self.take(PausePoint::AfterStateWrite);
            Box::pin(async move {
                let image = write.await?;
                hold(pause).await;
                Ok(image)
            })
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
            let lookup = self.inner.answers_for_question(id);
            let pause = self.take(PausePoint::BeforeAnswerLookup);
            Box::pin(async move {
                hold(pause).await;
                lookup.await
            })
        }
        fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_round(round)
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

    struct Board {
        state: SharedState,
        store: Arc<dyn GameStore>,
        question: Uuid,
        answers: Vec<Uuid>,
    }

    async fn board_with_question() -> Board {
        board_on(Arc::new(MemoryGameStore::default())).await
    }

    async fn board_on(store: Arc<dyn GameStore>) -> Board {
        let question = QuestionEntity {
            id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
            text: "Name something in a kitchen".into(),
            position: 0,
        };
        store.insert_question(question.clone()).await.unwrap();

        let mut answers = Vec::new();
        for rank in 1..=3 {
            let answer = AnswerEntity {
                id: Uuid::new_v4(),
                question_id: question.id,
                text: format!("answer {rank}"),
                display_order: rank,
            };
            answers.push(answer.id);
            store.insert_answer(answer).await.unwrap();
        }

        let state = AppState::with_store(AppConfig::default(), store.clone()).await;
        Board {
            state,
            store,
            question: question.id,
            answers,
        }
    }

    async fn buzz(board: &Board, team: TeamTag) -> bool {
        buzzer::claim(&buzzer::StoreCell(board.store.clone()), team)
            .await
            .unwrap()
            .is_won()
    }

    #[tokio::test]
    async fn scripted_round_updates_scores_and_strikes() {
        let board = board_with_question().await;
        let state = &board.state;

        select_question(state, board.question).await.unwrap();
        assert!(buzz(&board, TeamTag::A).await);

        let outcome = reveal(state, board.answers[0]).await.unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.state.team_a_score, 50);
        assert_eq!(outcome.state.revealed_answers, vec![board.answers[0]]);
        assert_eq!(outcome.state.buzzer_state, BuzzerState::Locked);

        let outcome = give_strike(state).await.unwrap();
        assert_eq!(outcome.state.strikes, 1);
        assert_eq!(outcome.state.buzzer_state, BuzzerState::Armed);
        assert_eq!(outcome.state.buzzer_winner, None);

        assert!(buzz(&board, TeamTag::B).await);
        let outcome = reveal(state, board.answers[1]).await.unwrap();
        assert_eq!(outcome.state.team_b_score, 40);
        assert_eq!(outcome.state.team_a_score, 50);
    }

    #[tokio::test]
    async fn double_reveal_is_a_no_op() {
        let board = board_with_question().await;
        select_question(&board.state, board.question).await.unwrap();
        buzz(&board, TeamTag::B).await;

        assert!(reveal(&board.state, board.answers[2]).await.unwrap().applied);
        let second = reveal(&board.state, board.answers[2]).await.unwrap();
        assert!(!second.applied);
        assert_eq!(second.state.team_b_score, 30);
    }

    #[tokio::test]
    async fn reveal_without_winner_is_ignored() {
        let board = board_with_question().await;
        select_question(&board.state, board.question).await.unwrap();

        let outcome = reveal(&board.state, board.answers[0]).await.unwrap();
        assert!(!outcome.applied);
        assert!(outcome.state.revealed_answers.is_empty());
    }

    #[tokio::test]
    async fn reveal_all_keeps_scores() {
        let board = board_with_question().await;
        select_question(&board.state, board.question).await.unwrap();
        buzz(&board, TeamTag::A).await;
        reveal(&board.state, board.answers[1]).await.unwrap();

        let outcome = reveal_all(&board.state).await.unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.state.team_a_score, 40);
        assert_eq!(outcome.state.team_b_score, 0);
        assert_eq!(outcome.state.revealed_answers.len(), 3);
        assert_eq!(outcome.state.buzzer_winner, None);
        assert_eq!(outcome.state.buzzer_state, BuzzerState::Locked);
    }

    #[tokio::test]
    async fn fourth_strike_changes_nothing() {
        let board = board_with_question().await;
        select_question(&board.state, board.question).await.unwrap();
        for _ in 0..3 {
            assert!(give_strike(&board.state).await.unwrap().applied);
        }

        let before = board.store.load_state().await.unwrap();
        let outcome = give_strike(&board.state).await.unwrap();
        assert!(!outcome.applied);
        assert_eq!(board.store.load_state().await.unwrap(), before);
    }

    #[tokio::test]
    async fn selecting_an_unknown_question_fails() {
        let board = board_with_question().await;
        let err = select_question(&board.state, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn writes_are_published_to_the_feed() {
        let board = board_with_question().await;
        let mut feed = board.state.feed().subscribe_state();

        set_score(&board.state, TeamTag::B, -15).await.unwrap();
        let image = feed.next().await.unwrap();
        assert_eq!(image.team_b_score, -15);

        reset_buzzer(&board.state).await.unwrap();
        assert_eq!(feed.next().await.unwrap().buzzer(), BuzzerSlot::armed());
    }

    #[tokio::test]
    async fn slow_write_does_not_publish_over_a_newer_one() {
        let store = PausingStore::default();
        let board = board_on(Arc::new(store.clone())).await;
        let mut feed = board.state.feed().subscribe_state();

        let (reached, resume) = store.pause_at(PausePoint::AfterStateWrite);
        let slow = tokio::spawn({
            let state = board.state.clone();
            async move { set_score(&state, TeamTag::A, 10).await }
        });
        reached.await.unwrap();

        set_score(&board.state, TeamTag::A, 20).await.unwrap();
        resume.send(()).unwrap();
        slow.await.unwrap().unwrap();

        assert_eq!(feed.next().await.unwrap().team_a_score, 20);
        reset_scores(&board.state).await.unwrap();
        assert_eq!(feed.next().await.unwrap().team_a_score, 0);
        assert_eq!(board.store.load_state().await.unwrap().team_a_score, 0);
    }

    #[tokio::test]
    async fn reveal_is_dropped_when_the_question_changes_underneath() {
        let store = PausingStore::default();
        let board = board_on(Arc::new(store.clone())).await;
        let next_question = QuestionEntity {
            id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
            text: "Name a farm animal".into(),
            position: 1,
        };
        board
            .store
            .insert_question(next_question.clone())
            .await
            .unwrap();

        select_question(&board.state, board.question).await.unwrap();
        assert!(buzz(&board, TeamTag::A).await);

        let (reached, resume) = store.pause_at(PausePoint::BeforeAnswerLookup);
        let pending = tokio::spawn({
            let state = board.state.clone();
            let answer = board.answers[0];
            async move { reveal(&state, answer).await }
        });
        reached.await.unwrap();

        select_question(&board.state, next_question.id).await.unwrap();
        resume.send(()).unwrap();

        let outcome = pending.await.unwrap().unwrap();
        assert!(!outcome.applied);
        assert_eq!(outcome.state.current_question_id, Some(next_question.id));
        assert!(outcome.state.revealed_answers.is_empty());
        assert_eq!(outcome.state.team_a_score, 0);
        assert_eq!(outcome.state.buzzer_state, BuzzerState::Armed);
        assert_eq!(outcome.state.buzzer_winner, None);
    }

    #[tokio::test]
    async fn blank_team_names_use_defaults() {
        let board = board_with_question().await;
        let outcome = set_team_names(&board.state, "Owls", "  ").await.unwrap();
        assert_eq!(outcome.state.team_a_name, "Owls");
        assert_eq!(outcome.state.team_b_name, "Team B");
    }

    #[tokio::test]
    async fn degraded_mode_rejects_host_actions() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            reset_scores(&state).await,
            Err(ServiceError::Degraded)
        ));
    }
}
