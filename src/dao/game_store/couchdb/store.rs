use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{
        AnswerEntity, BuzzerSlot, BuzzerState, GameStateEntity, QuestionEntity, RoundEntity,
        StatePatch,
    },
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        ANSWER_PREFIX, AllDocsResponse, CouchAnswerDocument, CouchQuestionDocument,
        CouchRoundDocument, CouchStateDocument, END_SUFFIX, QUESTION_PREFIX, ROUND_PREFIX,
        RevisionOnly, STATE_DOC_ID, answer_doc_id, question_doc_id, round_doc_id,
    },
};

/// Attempts at a read-modify-write cycle on the state document before
/// surrendering to concurrent writers.
const MAX_CONFLICT_RETRIES: u32 = 8;

enum PutOutcome {
    Written,
    Conflict,
}

/// CouchDB-backed game store. Every conditional write relies on the
/// document `_rev`, so a stale read turns into a 409 and a retry.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Ensure the database exists and provision the state document with
    /// `seed` when it is absent.
    pub async fn connect(config: CouchConfig, seed: GameStateEntity) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url);
        let database = Arc::<str>::from(config.database);
        let auth = config
            .credentials
            .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        store.provision_state(seed).await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.with_auth(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::transport(Method::GET, &self.database, source))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                info!(database = %self.database, "creating CouchDB database");
                let created = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| {
                        CouchDaoError::transport(Method::PUT, &self.database, source)
                    })?;
                match created.status() {
                    status if status.is_success() => Ok(()),
                    status => Err(CouchDaoError::status(Method::PUT, &self.database, status)),
                }
            }
            other => Err(CouchDaoError::status(Method::GET, &self.database, other)),
        }
    }

    async fn provision_state(&self, seed: GameStateEntity) -> CouchResult<()> {
        if self
            .get_document::<RevisionOnly>(STATE_DOC_ID)
            .await?
            .is_some()
        {
            return Ok(());
        }
        // A concurrent instance may have provisioned in between; its row wins.
        match self
            .put_document(STATE_DOC_ID, &CouchStateDocument::new(seed))
            .await?
        {
            PutOutcome::Written => debug!("provisioned CouchDB game state document"),
            PutOutcome::Conflict => debug!("game state document already provisioned"),
        }
        Ok(())
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::transport(Method::GET, doc_id, source))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::status(Method::GET, doc_id, other)),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<PutOutcome>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::transport(Method::PUT, doc_id, source))?;

        match response.status() {
            StatusCode::CONFLICT => Ok(PutOutcome::Conflict),
            status if status.is_success() => Ok(PutOutcome::Written),
            other => Err(CouchDaoError::status(Method::PUT, doc_id, other)),
        }
    }

    /// Delete a document by id; `false` when it does not exist.
    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let Some(current) = self.get_document::<RevisionOnly>(doc_id).await? else {
                return Ok(false);
            };

            let response = self
                .request(Method::DELETE, doc_id)
                .query(&[("rev", current.rev)])
                .send()
                .await
                .map_err(|source| CouchDaoError::transport(Method::DELETE, doc_id, source))?;

            match response.status() {
                StatusCode::NOT_FOUND => return Ok(false),
                StatusCode::CONFLICT => continue,
                status if status.is_success() => return Ok(true),
                other => {
                    return Err(CouchDaoError::status(Method::DELETE, doc_id, other));
                }
            }
        }

        Err(CouchDaoError::ConflictRetriesExhausted {
            path: doc_id.to_string(),
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::transport(Method::GET, ALL_DOCS, source))?;

        if !response.status().is_success() {
            return Err(CouchDaoError::status(
                Method::GET,
                ALL_DOCS,
                response.status(),
            ));
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        let mut documents = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed = from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: row.id.clone(),
                    source,
                })?;
                documents.push(parsed);
            }
        }

        Ok(documents)
    }

    async fn read_state(&self) -> CouchResult<CouchStateDocument> {
        self.get_document::<CouchStateDocument>(STATE_DOC_ID)
            .await?
            .ok_or(CouchDaoError::MissingState {
                doc_id: STATE_DOC_ID,
            })
    }

    /// Read-modify-write of the state document. `mutate` returns `false` to
    /// abandon the write after inspecting the freshly read row.
    async fn modify_state<F>(&self, mut mutate: F) -> CouchResult<Option<GameStateEntity>>
    where
        F: FnMut(&mut GameStateEntity) -> bool,
    {
        for attempt in 1..=MAX_CONFLICT_RETRIES {
            let mut doc = self.read_state().await?;
            if !mutate(&mut doc.state) {
                return Ok(None);
            }
            match self.put_document(STATE_DOC_ID, &doc).await? {
                PutOutcome::Written => return Ok(Some(doc.state)),
                PutOutcome::Conflict => {
                    debug!(attempt, "game state revision conflict, re-reading");
                }
            }
        }

        Err(CouchDaoError::ConflictRetriesExhausted {
            path: STATE_DOC_ID.to_string(),
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    async fn update_state(&self, patch: StatePatch) -> CouchResult<GameStateEntity> {
        self.modify_state(|state| {
            patch.apply_to(state);
            true
        })
        .await?
        .ok_or(CouchDaoError::MissingState {
            doc_id: STATE_DOC_ID,
        })
    }

    async fn update_state_if(
        &self,
        expected_version: u64,
        patch: StatePatch,
    ) -> CouchResult<Option<GameStateEntity>> {
        self.modify_state(|state| {
            if state.version != expected_version {
                return false;
            }
            patch.apply_to(state);
            true
        })
        .await
    }

    async fn compare_and_swap_buzzer(
        &self,
        expected: BuzzerState,
        next: BuzzerSlot,
    ) -> CouchResult<Option<GameStateEntity>> {
        self.modify_state(|state| {
            if state.buzzer_state != expected {
                return false;
            }
            StatePatch {
                buzzer: Some(next),
                ..StatePatch::default()
            }
            .apply_to(state);
            true
        })
        .await
    }

    async fn rounds(&self) -> CouchResult<Vec<RoundEntity>> {
        let mut rounds = self
            .list_documents::<CouchRoundDocument>(ROUND_PREFIX)
            .await?
            .into_iter()
            .map(RoundEntity::try_from)
            .collect::<CouchResult<Vec<_>>>()?;
        rounds.sort_by_key(|round| (round.position, round.id));
        Ok(rounds)
    }

    async fn questions(&self) -> CouchResult<Vec<QuestionEntity>> {
        let mut questions = self
            .list_documents::<CouchQuestionDocument>(QUESTION_PREFIX)
            .await?
            .into_iter()
            .map(QuestionEntity::try_from)
            .collect::<CouchResult<Vec<_>>>()?;
        questions.sort_by_key(|question| (question.position, question.id));
        Ok(questions)
    }

    async fn answers(&self) -> CouchResult<Vec<AnswerEntity>> {
        self.list_documents::<CouchAnswerDocument>(ANSWER_PREFIX)
            .await?
            .into_iter()
            .map(AnswerEntity::try_from)
            .collect()
    }

    async fn insert<T: Serialize>(&self, doc_id: String, document: T) -> CouchResult<()> {
        match self.put_document(&doc_id, &document).await? {
            PutOutcome::Written => Ok(()),
            PutOutcome::Conflict => Err(CouchDaoError::status(
                Method::PUT,
                &doc_id,
                StatusCode::CONFLICT,
            )),
        }
    }

    async fn delete_question_cascade(&self, id: Uuid) -> CouchResult<bool> {
        for answer in self.answers().await? {
            if answer.question_id == id {
                self.delete_document(&answer_doc_id(answer.id)).await?;
            }
        }
        self.delete_document(&question_doc_id(id)).await
    }

    async fn delete_round_cascade(&self, id: Uuid) -> CouchResult<bool> {
        for question in self.questions().await? {
            if question.round_id == id {
                self.delete_question_cascade(question.id).await?;
            }
        }
        self.delete_document(&round_doc_id(id)).await
    }

    async fn ping(&self) -> CouchResult<()> {
        let response = self
            .with_auth(self.client.get(self.database_url()))
            .send()
            .await
            .map_err(|source| CouchDaoError::transport(Method::GET, &self.database, source))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(CouchDaoError::status(Method::GET, &self.database, status)),
        }
    }
}

impl GameStore for CouchGameStore {
    fn load_state(&self) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read_state().await?.state) })
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
        Box::pin(async move { store.rounds().await.map_err(Into::into) })
    }

    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.questions().await.map_err(Into::into) })
    }

    fn list_answers(&self) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.answers().await.map_err(Into::into) })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchRoundDocument>(&round_doc_id(id))
                .await?;
            Ok(doc.map(RoundEntity::try_from).transpose()?)
        })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchQuestionDocument>(&question_doc_id(id))
                .await?;
            Ok(doc.map(QuestionEntity::try_from).transpose()?)
        })
    }

    fn answers_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let answers = store.answers().await?;
            Ok(answers
                .into_iter()
                .filter(|answer| answer.question_id == question_id)
                .collect())
        })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = round_doc_id(round.id);
            Ok(store.insert(doc_id, CouchRoundDocument::from(round)).await?)
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = question_doc_id(question.id);
            Ok(store
                .insert(doc_id, CouchQuestionDocument::from(question))
                .await?)
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = answer_doc_id(answer.id);
            Ok(store.insert(doc_id, CouchAnswerDocument::from(answer)).await?)
        })
    }

    fn delete_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_round_cascade(id).await.map_err(Into::into) })
    }

    fn delete_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_question_cascade(id).await.map_err(Into::into) })
    }

    fn delete_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&answer_doc_id(id))
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
