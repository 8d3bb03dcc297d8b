use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::open_database,
    error::{MongoDaoError, MongoResult},
    models::{
        ANSWER_COLLECTION_NAME, MongoAnswerDocument, MongoQuestionDocument, MongoRoundDocument,
        MongoStateDocument, QUESTION_COLLECTION_NAME, ROUND_COLLECTION_NAME,
        STATE_COLLECTION_NAME, doc_id, patch_to_update, state_at_version, state_filter,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{
        AnswerEntity, BuzzerSlot, BuzzerState, GameStateEntity, QuestionEntity, RoundEntity,
        StatePatch,
    },
    storage::StorageResult,
};

/// MongoDB-backed game store.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = open_database(&self.config).await?;
        self.state.write().await.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection, ensure indexes and provision the state row
    /// with `seed` when it does not exist yet.
    pub async fn connect(config: MongoConfig, seed: GameStateEntity) -> MongoResult<Self> {
        let database = open_database(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        store.provision_state(seed).await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let questions = self.questions().await;
        let index = IndexModel::builder()
            .keys(doc! {"round_id": 1, "position": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("question_round_idx".to_owned()))
                    .build(),
            )
            .build();
        questions
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUESTION_COLLECTION_NAME,
                index: "round_id,position",
                source,
            })?;

        let answers = self.answers().await;
        let index = IndexModel::builder()
            .keys(doc! {"question_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("answer_question_idx".to_owned()))
                    .build(),
            )
            .build();
        answers
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ANSWER_COLLECTION_NAME,
                index: "question_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn state_collection(&self) -> Collection<MongoStateDocument> {
        self.database()
            .await
            .collection::<MongoStateDocument>(STATE_COLLECTION_NAME)
    }

    async fn rounds(&self) -> Collection<MongoRoundDocument> {
        self.database()
            .await
            .collection::<MongoRoundDocument>(ROUND_COLLECTION_NAME)
    }

    async fn questions(&self) -> Collection<MongoQuestionDocument> {
        self.database()
            .await
            .collection::<MongoQuestionDocument>(QUESTION_COLLECTION_NAME)
    }

    async fn answers(&self) -> Collection<MongoAnswerDocument> {
        self.database()
            .await
            .collection::<MongoAnswerDocument>(ANSWER_COLLECTION_NAME)
    }

    async fn provision_state(&self, seed: GameStateEntity) -> MongoResult<()> {
        let collection = self.state_collection().await;
        let existing = collection
            .find_one(state_filter())
            .await
            .map_err(|source| MongoDaoError::ProvisionState { source })?;
        if existing.is_none() {
            collection
                .insert_one(MongoStateDocument::from(seed))
                .await
                .map_err(|source| MongoDaoError::ProvisionState { source })?;
        }
        Ok(())
    }

    async fn load_state(&self) -> MongoResult<GameStateEntity> {
        let collection = self.state_collection().await;
        let document = collection
            .find_one(state_filter())
            .await
            .map_err(|source| MongoDaoError::LoadState { source })?
            .ok_or(MongoDaoError::MissingState)?;
        document.try_into()
    }

    async fn update_state(&self, patch: StatePatch) -> MongoResult<GameStateEntity> {
        let collection = self.state_collection().await;
        let document = collection
            .find_one_and_update(state_filter(), patch_to_update(&patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdateState { source })?
            .ok_or(MongoDaoError::MissingState)?;
        document.try_into()
    }

    async fn update_state_if(
        &self,
        expected_version: u64,
        patch: StatePatch,
    ) -> MongoResult<Option<GameStateEntity>> {
        let collection = self.state_collection().await;
        collection
            .find_one_and_update(state_at_version(expected_version), patch_to_update(&patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdateState { source })?
            .map(GameStateEntity::try_from)
            .transpose()
    }

    async fn compare_and_swap_buzzer(
        &self,
        expected: BuzzerState,
        next: BuzzerSlot,
    ) -> MongoResult<Option<GameStateEntity>> {
        let patch = StatePatch {
            buzzer: Some(next),
            ..StatePatch::default()
        };
        let mut filter = state_filter();
        filter.insert("buzzer_state", expected.as_str());

        let collection = self.state_collection().await;
        collection
            .find_one_and_update(filter, patch_to_update(&patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdateState { source })?
            .map(GameStateEntity::try_from)
            .transpose()
    }

    async fn list_rounds(&self) -> MongoResult<Vec<RoundEntity>> {
        let documents: Vec<MongoRoundDocument> = self
            .rounds()
            .await
            .find(doc! {})
            .sort(doc! {"position": 1})
            .await
            .map_err(|source| query_error(ROUND_COLLECTION_NAME, source))?
            .try_collect()
            .await
            .map_err(|source| query_error(ROUND_COLLECTION_NAME, source))?;
        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_questions(&self) -> MongoResult<Vec<QuestionEntity>> {
        let documents: Vec<MongoQuestionDocument> = self
            .questions()
            .await
            .find(doc! {})
            .sort(doc! {"position": 1})
            .await
            .map_err(|source| query_error(QUESTION_COLLECTION_NAME, source))?
            .try_collect()
            .await
            .map_err(|source| query_error(QUESTION_COLLECTION_NAME, source))?;
        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_answers(&self, filter: mongodb::bson::Document) -> MongoResult<Vec<AnswerEntity>> {
        let documents: Vec<MongoAnswerDocument> = self
            .answers()
            .await
            .find(filter)
            .sort(doc! {"display_order": 1})
            .await
            .map_err(|source| query_error(ANSWER_COLLECTION_NAME, source))?
            .try_collect()
            .await
            .map_err(|source| query_error(ANSWER_COLLECTION_NAME, source))?;
        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_round(&self, id: Uuid) -> MongoResult<Option<RoundEntity>> {
        self.rounds()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| query_error(ROUND_COLLECTION_NAME, source))?
            .map(RoundEntity::try_from)
            .transpose()
    }

    async fn find_question(&self, id: Uuid) -> MongoResult<Option<QuestionEntity>> {
        self.questions()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| query_error(QUESTION_COLLECTION_NAME, source))?
            .map(QuestionEntity::try_from)
            .transpose()
    }

    async fn delete_round(&self, id: Uuid) -> MongoResult<bool> {
        let round_id = id.to_string();
        let question_ids: Vec<String> = self
            .questions()
            .await
            .find(doc! {"round_id": &round_id})
            .await
            .map_err(|source| query_error(QUESTION_COLLECTION_NAME, source))?
            .try_collect::<Vec<MongoQuestionDocument>>()
            .await
            .map_err(|source| query_error(QUESTION_COLLECTION_NAME, source))?
            .into_iter()
            .map(|question| question.id)
            .collect();

        self.answers()
            .await
            .delete_many(doc! {"question_id": {"$in": question_ids}})
            .await
            .map_err(|source| delete_error(ANSWER_COLLECTION_NAME, source))?;
        self.questions()
            .await
            .delete_many(doc! {"round_id": &round_id})
            .await
            .map_err(|source| delete_error(QUESTION_COLLECTION_NAME, source))?;
        let result = self
            .rounds()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| delete_error(ROUND_COLLECTION_NAME, source))?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_question(&self, id: Uuid) -> MongoResult<bool> {
        self.answers()
            .await
            .delete_many(doc! {"question_id": id.to_string()})
            .await
            .map_err(|source| delete_error(ANSWER_COLLECTION_NAME, source))?;
        let result = self
            .questions()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| delete_error(QUESTION_COLLECTION_NAME, source))?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_answer(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .answers()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| delete_error(ANSWER_COLLECTION_NAME, source))?;
        Ok(result.deleted_count > 0)
    }
}

fn query_error(collection: &'static str, source: mongodb::error::Error) -> MongoDaoError {
    MongoDaoError::Query { collection, source }
}

fn delete_error(collection: &'static str, source: mongodb::error::Error) -> MongoDaoError {
    MongoDaoError::Delete { collection, source }
}

impl GameStore for MongoGameStore {
    fn load_state(&self) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
        let store = self.clone();
        Box::pin(async move { store.load_state().await.map_err(Into::into) })
    }

    fn update_state(&self, patch: StatePatch) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
        let store = self.clone();
        Box::pin(async move { store.update_state(patch).await.map_err(Into::into) })
    }

    fn update_state_if(
        &self,
        expected_version: u64,
        patch: StatePatch,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_state_if(expected_version, patch)
                .await
                .map_err(Into::into)
        })
    }

    fn compare_and_swap_buzzer(
        &self,
        expected: BuzzerState,
        next: BuzzerSlot,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .compare_and_swap_buzzer(expected, next)
                .await
                .map_err(Into::into)
        })
    }

    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_rounds().await.map_err(Into::into) })
    }

    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_questions().await.map_err(Into::into) })
    }

    fn list_answers(&self) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_answers(doc! {}).await.map_err(Into::into) })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_round(id).await.map_err(Into::into) })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_question(id).await.map_err(Into::into) })
    }

    fn answers_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_answers(doc! {"question_id": question_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = round.id;
            store
                .rounds()
                .await
                .insert_one(MongoRoundDocument::from(round))
                .await
                .map_err(|source| MongoDaoError::Insert {
                    collection: ROUND_COLLECTION_NAME,
                    id,
                    source,
                })?;
            Ok(())
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = question.id;
            store
                .questions()
                .await
                .insert_one(MongoQuestionDocument::from(question))
                .await
                .map_err(|source| MongoDaoError::Insert {
                    collection: QUESTION_COLLECTION_NAME,
                    id,
                    source,
                })?;
            Ok(())
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = answer.id;
            store
                .answers()
                .await
                .insert_one(MongoAnswerDocument::from(answer))
                .await
                .map_err(|source| MongoDaoError::Insert {
                    collection: ANSWER_COLLECTION_NAME,
                    id,
                    source,
                })?;
            Ok(())
        })
    }

    fn delete_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_round(id).await.map_err(Into::into) })
    }

    fn delete_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_question(id).await.map_err(Into::into) })
    }

    fn delete_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_answer(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
