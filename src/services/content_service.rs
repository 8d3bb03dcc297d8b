use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::{AnswerEntity, QuestionEntity, RoundEntity},
    },
    dto::content::{AnswerInput, ContentTree, CreatedResponse, QuestionInput, RoundInput},
    error::ServiceError,
    services::board_service,
    state::{
        SharedState, board,
        feed::{ChangeKind, ContentChange, ContentTable},
    },
};

/// Full rounds → questions → answers hierarchy.
pub async fn content_tree(state: &SharedState) -> Result<ContentTree, ServiceError> {
    let store = state.require_game_store().await?;
    load_tree(&store).await
}

pub(crate) async fn load_tree(store: &Arc<dyn GameStore>) -> Result<ContentTree, ServiceError> {
    let rounds = store.list_rounds().await?;
    let questions = store.list_questions().await?;
    let answers = store.list_answers().await?;
    Ok(ContentTree::assemble(rounds, questions, answers))
}

fn publish(state: &SharedState, table: ContentTable, kind: ChangeKind, id: Uuid) {
    state
        .feed()
        .publish_content(ContentChange { table, kind, id });
}

pub async fn create_round(
    state: &SharedState,
    input: RoundInput,
) -> Result<CreatedResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let position = store.list_rounds().await?.len() as u32;
    let round = RoundEntity {
        id: Uuid::new_v4(),
        name: input.name.trim().to_owned(),
        position,
    };
    let id = round.id;
    store.insert_round(round).await?;
    publish(state, ContentTable::Round, ChangeKind::Insert, id);
    info!(round_id = %id, "round created");
    Ok(CreatedResponse { id })
}

pub async fn create_question(
    state: &SharedState,
    round_id: Uuid,
    input: QuestionInput,
) -> Result<CreatedResponse, ServiceError> {
    let store = state.require_game_store().await?;
    if store.find_round(round_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("round `{round_id}` not found")));
    }

    let position = store
        .list_questions()
        .await?
        .iter()
        .filter(|question| question.round_id == round_id)
        .count() as u32;
    let question = QuestionEntity {
        id: Uuid::new_v4(),
        round_id,
        text: input.text.trim().to_owned(),
        position,
    };
    let id = question.id;
    store.insert_question(question).await?;
    publish(state, ContentTable::Question, ChangeKind::Insert, id);
    Ok(CreatedResponse { id })
}

pub async fn create_answer(
    state: &SharedState,
    question_id: Uuid,
    input: AnswerInput,
) -> Result<CreatedResponse, ServiceError> {
    let store = state.require_game_store().await?;
    if store.find_question(question_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "question `{question_id}` not found"
        )));
    }

    let answer = AnswerEntity {
        id: Uuid::new_v4(),
        question_id,
        text: input.text.trim().to_owned(),
        display_order: input.display_order,
    };
    let id = answer.id;
    store.insert_answer(answer).await?;
    publish(state, ContentTable::Answer, ChangeKind::Insert, id);
    Ok(CreatedResponse { id })
}

/// Delete a round with its questions and answers.
pub async fn delete_round(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    if !store.delete_round(id).await? {
        return Err(ServiceError::NotFound(format!("round `{id}` not found")));
    }
    publish(state, ContentTable::Round, ChangeKind::Delete, id);
    info!(round_id = %id, "round deleted");
    release_board(state, &store).await
}

/// Delete a question with its answers.
pub async fn delete_question(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    if !store.delete_question(id).await? {
        return Err(ServiceError::NotFound(format!("question `{id}` not found")));
    }
    publish(state, ContentTable::Question, ChangeKind::Delete, id);
    release_board(state, &store).await
}

pub async fn delete_answer(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    if !store.delete_answer(id).await? {
        return Err(ServiceError::NotFound(format!("answer `{id}` not found")));
    }
    publish(state, ContentTable::Answer, ChangeKind::Delete, id);

    let current = store.load_state().await?;
    if let Some(patch) = board::forget_answer(&current, id) {
        board_service::commit(state, &store, patch).await?;
    }
    Ok(())
}

/// Clear the board when the question it shows no longer exists.
async fn release_board(state: &SharedState, store: &Arc<dyn GameStore>) -> Result<(), ServiceError> {
    let current = store.load_state().await?;
    let Some(question_id) = current.current_question_id else {
        return Ok(());
    };
    if store.find_question(question_id).await?.is_none() {
        info!(%question_id, "question on the board was deleted; clearing board");
        board_service::commit(state, store, board::clear_board()).await?;
    }
    Ok(())
}
