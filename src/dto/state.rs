use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{BuzzerState, GameStateEntity, TeamTag},
    dto::format_system_time,
};

/// Wire image of the game state row, pushed on every change.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStateSnapshot {
    pub current_question_id: Option<Uuid>,
    pub team_a_name: String,
    pub team_b_name: String,
    pub team_a_score: i32,
    pub team_b_score: i32,
    pub buzzer_state: BuzzerState,
    pub buzzer_winner: Option<TeamTag>,
    pub strikes: u8,
    pub revealed_answers: Vec<Uuid>,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
    /// Row version; later images carry larger values.
    pub version: u64,
}

impl From<&GameStateEntity> for GameStateSnapshot {
    fn from(state: &GameStateEntity) -> Self {
        Self {
            current_question_id: state.current_question_id,
            team_a_name: state.team_a_name.clone(),
            team_b_name: state.team_b_name.clone(),
            team_a_score: state.team_a_score,
            team_b_score: state.team_b_score,
            buzzer_state: state.buzzer_state,
            buzzer_winner: state.buzzer_winner,
            strikes: state.strikes,
            revealed_answers: state.revealed_answers.clone(),
            updated_at: format_system_time(state.updated_at),
            version: state.version,
        }
    }
}

impl From<GameStateEntity> for GameStateSnapshot {
    fn from(state: GameStateEntity) -> Self {
        Self::from(&state)
    }
}
