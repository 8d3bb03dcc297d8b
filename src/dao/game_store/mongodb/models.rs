use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    AnswerEntity, BuzzerState, GameStateEntity, QuestionEntity, RoundEntity, StatePatch, TeamTag,
};

pub const STATE_COLLECTION_NAME: &str = "game_state";
pub const ROUND_COLLECTION_NAME: &str = "rounds";
pub const QUESTION_COLLECTION_NAME: &str = "questions";
pub const ANSWER_COLLECTION_NAME: &str = "answers";
/// Fixed identifier of the singleton state row.
pub const STATE_DOC_ID: &str = "game_state";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStateDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub current_question_id: Option<String>,
    pub team_a_name: String,
    pub team_b_name: String,
    pub team_a_score: i32,
    pub team_b_score: i32,
    pub buzzer_state: BuzzerState,
    pub buzzer_winner: Option<TeamTag>,
    pub strikes: i32,
    #[serde(default)]
    pub revealed_answers: Vec<String>,
    pub updated_at: DateTime,
    #[serde(default)]
    pub version: i64,
}

impl From<GameStateEntity> for MongoStateDocument {
    fn from(value: GameStateEntity) -> Self {
        Self {
            id: STATE_DOC_ID.to_owned(),
            current_question_id: value.current_question_id.map(|id| id.to_string()),
            team_a_name: value.team_a_name,
            team_b_name: value.team_b_name,
            team_a_score: value.team_a_score,
            team_b_score: value.team_b_score,
            buzzer_state: value.buzzer_state,
            buzzer_winner: value.buzzer_winner,
            strikes: i32::from(value.strikes),
            revealed_answers: value
                .revealed_answers
                .iter()
                .map(Uuid::to_string)
                .collect(),
            updated_at: DateTime::from_system_time(value.updated_at),
            version: i64::try_from(value.version).unwrap_or(i64::MAX),
        }
    }
}

impl TryFrom<MongoStateDocument> for GameStateEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoStateDocument) -> MongoResult<Self> {
        let current_question_id = value
            .current_question_id
            .as_deref()
            .map(|raw| parse_id(STATE_COLLECTION_NAME, raw))
            .transpose()?;
        let revealed_answers = value
            .revealed_answers
            .iter()
            .map(|raw| parse_id(STATE_COLLECTION_NAME, raw))
            .collect::<MongoResult<Vec<_>>>()?;
        let strikes = u8::try_from(value.strikes).map_err(|_| MongoDaoError::InvalidId {
            collection: STATE_COLLECTION_NAME,
            value: value.strikes.to_string(),
        })?;
        let version = u64::try_from(value.version).map_err(|_| MongoDaoError::InvalidId {
            collection: STATE_COLLECTION_NAME,
            value: value.version.to_string(),
        })?;

        Ok(Self {
            current_question_id,
            team_a_name: value.team_a_name,
            team_b_name: value.team_b_name,
            team_a_score: value.team_a_score,
            team_b_score: value.team_b_score,
            buzzer_state: value.buzzer_state,
            buzzer_winner: value.buzzer_winner,
            strikes,
            revealed_answers,
            updated_at: value.updated_at.to_system_time(),
            version,
        })
    }
}

/// Translate a patch into a `$set` document touching only the patched fields.
pub fn patch_to_set(patch: &StatePatch) -> Document {
    let mut set = Document::new();
    if let Some(question) = patch.current_question_id {
        set.insert("current_question_id", question.map(|id| id.to_string()));
    }
    if let Some(name) = &patch.team_a_name {
        set.insert("team_a_name", name.clone());
    }
    if let Some(name) = &patch.team_b_name {
        set.insert("team_b_name", name.clone());
    }
    if let Some(score) = patch.team_a_score {
        set.insert("team_a_score", score);
    }
    if let Some(score) = patch.team_b_score {
        set.insert("team_b_score", score);
    }
    if let Some(slot) = patch.buzzer {
        set.insert("buzzer_state", slot.state().as_str());
        set.insert("buzzer_winner", slot.winner().map(TeamTag::as_str));
    }
    if let Some(strikes) = patch.strikes {
        set.insert("strikes", i32::from(strikes));
    }
    if let Some(revealed) = &patch.revealed_answers {
        set.insert(
            "revealed_answers",
            revealed.iter().map(Uuid::to_string).collect::<Vec<_>>(),
        );
    }
    set.insert("updated_at", DateTime::now());
    set
}

/// Full update document for a patch: the touched fields plus a version bump.
pub fn patch_to_update(patch: &StatePatch) -> Document {
    doc! {
        "$set": patch_to_set(patch),
        "$inc": {"version": 1_i64},
    }
}

/// Filter matching the state row only while it is at `version`.
pub fn state_at_version(version: u64) -> Document {
    let mut filter = state_filter();
    filter.insert("version", i64::try_from(version).unwrap_or(i64::MAX));
    filter
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub position: i64,
}

impl From<RoundEntity> for MongoRoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            position: i64::from(value.position),
        }
    }
}

impl TryFrom<MongoRoundDocument> for RoundEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRoundDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(ROUND_COLLECTION_NAME, &value.id)?,
            name: value.name,
            position: parse_position(ROUND_COLLECTION_NAME, value.position)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub round_id: String,
    pub text: String,
    pub position: i64,
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            round_id: value.round_id.to_string(),
            text: value.text,
            position: i64::from(value.position),
        }
    }
}

impl TryFrom<MongoQuestionDocument> for QuestionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoQuestionDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(QUESTION_COLLECTION_NAME, &value.id)?,
            round_id: parse_id(QUESTION_COLLECTION_NAME, &value.round_id)?,
            text: value.text,
            position: parse_position(QUESTION_COLLECTION_NAME, value.position)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub display_order: i32,
}

impl From<AnswerEntity> for MongoAnswerDocument {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: value.id.to_string(),
            question_id: value.question_id.to_string(),
            text: value.text,
            display_order: value.display_order,
        }
    }
}

impl TryFrom<MongoAnswerDocument> for AnswerEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoAnswerDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(ANSWER_COLLECTION_NAME, &value.id)?,
            question_id: parse_id(ANSWER_COLLECTION_NAME, &value.question_id)?,
            text: value.text,
            display_order: value.display_order,
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

pub fn state_filter() -> Document {
    doc! {"_id": STATE_DOC_ID}
}

fn parse_id(collection: &'static str, raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| MongoDaoError::InvalidId {
        collection,
        value: raw.to_owned(),
    })
}

fn parse_position(collection: &'static str, raw: i64) -> MongoResult<u32> {
    u32::try_from(raw).map_err(|_| MongoDaoError::InvalidId {
        collection,
        value: raw.to_string(),
    })
}
