#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, BuzzerSlot, BuzzerState, GameStateEntity, QuestionEntity, RoundEntity,
    StatePatch,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for the game state row and the
/// round/question/answer content tables.
pub trait GameStore: Send + Sync {
    /// Read the singleton game state row.
    fn load_state(&self) -> BoxFuture<'static, StorageResult<GameStateEntity>>;
    /// Write the fields present in `patch` and return the post-mutation row.
    fn update_state(&self, patch: StatePatch) -> BoxFuture<'static, StorageResult<GameStateEntity>>;
    /// Write `patch` only while the stored row is still at `expected_version`.
    /// Returns `None` when another write landed since that version was read.
    fn update_state_if(
        &self,
        expected_version: u64,
        patch: StatePatch,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;
    /// Conditionally write the buzzer pair: applied only while the stored
    /// buzzer state equals `expected`. Returns the post-mutation row on success.
    fn compare_and_swap_buzzer(
        &self,
        expected: BuzzerState,
        next: BuzzerSlot,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;

    /// All rounds ordered by position.
    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    /// All questions ordered by position.
    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// All answers, unordered.
    fn list_answers(&self) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;
    /// Look up a round by id.
    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Look up a question by id.
    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Answers attached to `question_id`.
    fn answers_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;
    /// Persist a new round.
    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Persist a new question.
    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Persist a new answer.
    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a round together with its questions and their answers.
    fn delete_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a question together with its answers.
    fn delete_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a single answer. Returns `false` when it did not exist.
    fn delete_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    /// Cheap round-trip proving the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
