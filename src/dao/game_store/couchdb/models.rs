use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::{
    game_store::couchdb::error::CouchDaoError,
    models::{AnswerEntity, GameStateEntity, QuestionEntity, RoundEntity},
};

pub const STATE_DOC_ID: &str = "state::singleton";
pub const ROUND_PREFIX: &str = "round::";
pub const QUESTION_PREFIX: &str = "question::";
pub const ANSWER_PREFIX: &str = "answer::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Minimal projection used to learn the current revision of a document.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchStateDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub state: GameStateEntity,
}

impl CouchStateDocument {
    pub fn new(state: GameStateEntity) -> Self {
        Self {
            id: STATE_DOC_ID.to_owned(),
            rev: None,
            state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRoundDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub name: String,
    pub position: u32,
}

impl From<RoundEntity> for CouchRoundDocument {
    fn from(round: RoundEntity) -> Self {
        Self {
            id: round_doc_id(round.id),
            rev: None,
            name: round.name,
            position: round.position,
        }
    }
}

impl TryFrom<CouchRoundDocument> for RoundEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchRoundDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            name: doc.name,
            position: doc.position,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchQuestionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub round_id: Uuid,
    pub text: String,
    pub position: u32,
}

impl From<QuestionEntity> for CouchQuestionDocument {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question_doc_id(question.id),
            rev: None,
            round_id: question.round_id,
            text: question.text,
            position: question.position,
        }
    }
}

impl TryFrom<CouchQuestionDocument> for QuestionEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchQuestionDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            round_id: doc.round_id,
            text: doc.text,
            position: doc.position,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchAnswerDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub question_id: Uuid,
    pub text: String,
    pub display_order: i32,
}

impl From<AnswerEntity> for CouchAnswerDocument {
    fn from(answer: AnswerEntity) -> Self {
        Self {
            id: answer_doc_id(answer.id),
            rev: None,
            question_id: answer.question_id,
            text: answer.text,
            display_order: answer.display_order,
        }
    }
}

impl TryFrom<CouchAnswerDocument> for AnswerEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchAnswerDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            question_id: doc.question_id,
            text: doc.text,
            display_order: doc.display_order,
        })
    }
}

pub fn round_doc_id(id: Uuid) -> String {
    format!("{ROUND_PREFIX}{id}")
}

pub fn question_doc_id(id: Uuid) -> String {
    format!("{QUESTION_PREFIX}{id}")
}

pub fn answer_doc_id(id: Uuid) -> String {
    format!("{ANSWER_PREFIX}{id}")
}

pub fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind: "invalid UUID",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_carry_the_table_prefix() {
        let id = Uuid::new_v4();
        let doc_id = question_doc_id(id);
        assert!(doc_id.starts_with(QUESTION_PREFIX));
        assert_eq!(extract_uuid(&doc_id).unwrap(), id);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(matches!(
            extract_uuid("round-1234"),
            Err(CouchDaoError::InvalidDocId {
                kind: "missing separator",
                ..
            })
        ));
        assert!(matches!(
            extract_uuid("round::not-a-uuid"),
            Err(CouchDaoError::InvalidDocId {
                kind: "invalid UUID",
                ..
            })
        ));
    }

    #[test]
    fn state_document_flattens_the_row() {
        let doc = CouchStateDocument::new(GameStateEntity::default());
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], STATE_DOC_ID);
        assert!(value.get("_rev").is_none());
        assert_eq!(value["buzzer_state"], "armed");
        assert_eq!(value["team_a_name"], "Team A");
    }
}
