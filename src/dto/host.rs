//! Payloads of the host control surface.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::TeamTag;
use crate::dto::state::GameStateSnapshot;

/// Put a question on the board.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectQuestionRequest {
    pub question_id: Uuid,
}

/// Reveal a single answer for the current buzzer winner.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RevealRequest {
    pub answer_id: Uuid,
}

/// Manual override of one team's score.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetScoreRequest {
    pub team: TeamTag,
    /// New score; negative values are accepted.
    pub value: i32,
}

/// Rename both teams. Blank names fall back to the configured defaults.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamNamesRequest {
    #[serde(default)]
    pub team_a_name: String,
    #[serde(default)]
    pub team_b_name: String,
}

/// Result of a host action.
///
/// `applied` is `false` when a precondition did not hold (e.g. revealing an
/// answer twice); `state` is the current row either way.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionOutcome {
    pub applied: bool,
    pub state: GameStateSnapshot,
}
