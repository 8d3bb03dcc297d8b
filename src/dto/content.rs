//! Editor inputs and the content hierarchy served to screens.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{AnswerEntity, QuestionEntity, RoundEntity},
    dto::validation::{validate_non_blank, validate_rank},
    state::scoring::points_for_rank,
};

/// New round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RoundInput {
    #[validate(custom(function = "validate_non_blank"))]
    pub name: String,
}

/// New question appended to a round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct QuestionInput {
    #[validate(custom(function = "validate_non_blank"))]
    pub text: String,
}

/// New answer attached to a question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AnswerInput {
    #[validate(custom(function = "validate_non_blank"))]
    pub text: String,
    /// Popularity rank, 1 being the most popular.
    #[validate(custom(function = "validate_rank"))]
    pub display_order: i32,
}

/// Identifier of a freshly created record.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerNode {
    pub id: Uuid,
    pub question_id: Uuid,
    pub text: String,
    pub display_order: i32,
    /// Points awarded when revealed by a buzzer winner.
    pub points: i32,
}

impl From<AnswerEntity> for AnswerNode {
    fn from(answer: AnswerEntity) -> Self {
        Self {
            points: points_for_rank(answer.display_order),
            id: answer.id,
            question_id: answer.question_id,
            text: answer.text,
            display_order: answer.display_order,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionNode {
    pub id: Uuid,
    pub round_id: Uuid,
    pub text: String,
    pub answers: Vec<AnswerNode>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundNode {
    pub id: Uuid,
    pub name: String,
    pub questions: Vec<QuestionNode>,
}

/// Full rounds → questions → answers hierarchy.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ContentTree {
    pub rounds: Vec<RoundNode>,
}

impl ContentTree {
    /// Nest flat table listings. Rounds and questions keep the order they are
    /// given in; answers are sorted by rank. Orphans are dropped.
    pub fn assemble(
        rounds: Vec<RoundEntity>,
        questions: Vec<QuestionEntity>,
        answers: Vec<AnswerEntity>,
    ) -> Self {
        let mut answers = answers;
        answers.sort_by_key(|answer| (answer.display_order, answer.id));

        let mut by_question: IndexMap<Uuid, Vec<AnswerNode>> = IndexMap::new();
        for answer in answers {
            by_question
                .entry(answer.question_id)
                .or_default()
                .push(AnswerNode::from(answer));
        }

        let mut by_round: IndexMap<Uuid, Vec<QuestionNode>> = IndexMap::new();
        for question in questions {
            let answers = by_question.shift_remove(&question.id).unwrap_or_default();
            by_round.entry(question.round_id).or_default().push(QuestionNode {
                id: question.id,
                round_id: question.round_id,
                text: question.text,
                answers,
            });
        }

        let rounds = rounds
            .into_iter()
            .map(|round| RoundNode {
                questions: by_round.shift_remove(&round.id).unwrap_or_default(),
                id: round.id,
                name: round.name,
            })
            .collect();

        Self { rounds }
    }
}
