//! Per-screen projections of the shared state.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{AnswerEntity, BuzzerState, GameStateEntity, QuestionEntity, TeamTag},
    dto::{content::ContentTree, state::GameStateSnapshot},
    state::scoring::points_for_rank,
};

/// Screens served by `/views/{page}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewPage {
    Host,
    Display,
    Buzzer,
    Editor,
}

impl ViewPage {
    /// Host and editor screens need the shared admin secret.
    pub fn requires_credential(self) -> bool {
        matches!(self, ViewPage::Host | ViewPage::Editor)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HostAnswer {
    pub id: Uuid,
    pub text: String,
    pub rank: i32,
    pub points: i32,
    pub revealed: bool,
}

/// Question on the board with every answer visible to the host.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HostQuestion {
    pub id: Uuid,
    pub text: String,
    pub answers: Vec<HostAnswer>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HostView {
    pub state: GameStateSnapshot,
    pub question: Option<HostQuestion>,
}

/// Board slot; the text stays hidden until revealed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DisplayAnswer {
    pub rank: i32,
    pub revealed: bool,
    pub text: Option<String>,
    pub points: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DisplayView {
    pub team_a_name: String,
    pub team_b_name: String,
    pub team_a_score: i32,
    pub team_b_score: i32,
    pub strikes: u8,
    pub buzzer_state: BuzzerState,
    pub buzzer_winner: Option<TeamTag>,
    pub question_text: Option<String>,
    pub answers: Vec<DisplayAnswer>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BuzzerView {
    pub buzzer_state: BuzzerState,
    pub buzzer_winner: Option<TeamTag>,
    pub team_a_name: String,
    pub team_b_name: String,
}

/// Any of the projections above.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ViewPayload {
    Host(HostView),
    Display(DisplayView),
    Buzzer(BuzzerView),
    Editor(ContentTree),
}

fn ranked(mut answers: Vec<AnswerEntity>) -> Vec<AnswerEntity> {
    answers.sort_by_key(|answer| (answer.display_order, answer.id));
    answers
}

impl HostView {
    pub fn project(
        state: &GameStateEntity,
        question: Option<(QuestionEntity, Vec<AnswerEntity>)>,
    ) -> Self {
        let question = question.map(|(question, answers)| HostQuestion {
            id: question.id,
            text: question.text,
            answers: ranked(answers)
                .into_iter()
                .map(|answer| HostAnswer {
                    revealed: state.is_revealed(answer.id),
                    points: points_for_rank(answer.display_order),
                    rank: answer.display_order,
                    id: answer.id,
                    text: answer.text,
                })
                .collect(),
        });
        Self {
            state: state.into(),
            question,
        }
    }
}

impl DisplayView {
    pub fn project(
        state: &GameStateEntity,
        question: Option<(QuestionEntity, Vec<AnswerEntity>)>,
    ) -> Self {
        let (question_text, answers) = match question {
            Some((question, answers)) => {
                let answers = ranked(answers)
                    .into_iter()
                    .map(|answer| {
                        let revealed = state.is_revealed(answer.id);
                        DisplayAnswer {
                            rank: answer.display_order,
                            revealed,
                            points: revealed.then(|| points_for_rank(answer.display_order)),
                            text: revealed.then_some(answer.text),
                        }
                    })
                    .collect();
                (Some(question.text), answers)
            }
            None => (None, Vec::new()),
        };

        Self {
            team_a_name: state.team_a_name.clone(),
            team_b_name: state.team_b_name.clone(),
            team_a_score: state.team_a_score,
            team_b_score: state.team_b_score,
            strikes: state.strikes,
            buzzer_state: state.buzzer_state,
            buzzer_winner: state.buzzer_winner,
            question_text,
            answers,
        }
    }
}

impl From<&GameStateEntity> for BuzzerView {
    fn from(state: &GameStateEntity) -> Self {
        Self {
            buzzer_state: state.buzzer_state,
            buzzer_winner: state.buzzer_winner,
            team_a_name: state.team_a_name.clone(),
            team_b_name: state.team_b_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (GameStateEntity, QuestionEntity, Vec<AnswerEntity>) {
        let question = QuestionEntity {
            id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
            text: "Name a planet".into(),
            position: 0,
        };
        let answers: Vec<AnswerEntity> = [(2, "Mars"), (1, "Earth")]
            .into_iter()
            .map(|(rank, text)| AnswerEntity {
                id: Uuid::new_v4(),
                question_id: question.id,
                text: text.into(),
                display_order: rank,
            })
            .collect();
        let mut state = GameStateEntity::default();
        state.current_question_id = Some(question.id);
        state.revealed_answers = vec![answers[0].id];
        (state, question, answers)
    }

    #[test]
    fn display_hides_unrevealed_text() {
        let (state, question, answers) = board();
        let view = DisplayView::project(&state, Some((question, answers)));

        assert_eq!(view.question_text.as_deref(), Some("Name a planet"));
        assert_eq!(view.answers[0].rank, 1);
        assert_eq!(view.answers[0].text, None);
        assert_eq!(view.answers[0].points, None);
        assert_eq!(view.answers[1].text.as_deref(), Some("Mars"));
        assert_eq!(view.answers[1].points, Some(40));
    }

    #[test]
    fn host_sees_everything() {
        let (state, question, answers) = board();
        let view = HostView::project(&state, Some((question, answers)));
        let question = view.question.unwrap();

        assert_eq!(question.answers[0].text, "Earth");
        assert!(!question.answers[0].revealed);
        assert!(question.answers[1].revealed);
    }

    #[test]
    fn credential_pages() {
        assert!(ViewPage::Host.requires_credential());
        assert!(ViewPage::Editor.requires_credential());
        assert!(!ViewPage::Display.requires_credential());
        assert!(!ViewPage::Buzzer.requires_credential());
    }
}
