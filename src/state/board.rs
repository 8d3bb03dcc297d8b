//! Pure board transitions. Each function inspects the current row and returns
//! the field patch to write, or `None` when a precondition does not hold.

use uuid::Uuid;

use crate::{
    dao::models::{AnswerEntity, BuzzerSlot, GameStateEntity, MAX_STRIKES, StatePatch, TeamTag},
    state::scoring::points_for_rank,
};

/// Put a question on the board and start a fresh cycle.
pub fn select_question(question_id: Uuid) -> StatePatch {
    fresh_board(Some(question_id))
}

/// Same effect as [`select_question`] but leaves no question selected.
pub fn clear_board() -> StatePatch {
    fresh_board(None)
}

fn fresh_board(question_id: Option<Uuid>) -> StatePatch {
    StatePatch {
        current_question_id: Some(question_id),
        buzzer: Some(BuzzerSlot::armed()),
        strikes: Some(0),
        revealed_answers: Some(Vec::new()),
        ..StatePatch::default()
    }
}

/// Reveal one answer and credit the buzzer winner.
///
/// Requires a latched winner, an answer of the current question and an
/// answer that is not already revealed. The buzzer stays locked on the
/// same winner.
pub fn reveal(state: &GameStateEntity, answer: &AnswerEntity) -> Option<StatePatch> {
    let winner = state.buzzer_winner?;
    if state.current_question_id != Some(answer.question_id) || state.is_revealed(answer.id) {
        return None;
    }

    let mut revealed = state.revealed_answers.clone();
    revealed.push(answer.id);
    let points = points_for_rank(answer.display_order);

    Some(
        StatePatch {
            buzzer: Some(BuzzerSlot::locked(Some(winner))),
            revealed_answers: Some(revealed),
            ..StatePatch::default()
        }
        .with_score(winner, state.score(winner).saturating_add(points)),
    )
}

/// Mark every answer of the current question revealed without scoring and
/// lock the buzzer with no winner.
pub fn reveal_all(state: &GameStateEntity, answers: &[AnswerEntity]) -> Option<StatePatch> {
    let question_id = state.current_question_id?;

    let mut revealed = state.revealed_answers.clone();
    for answer in answers.iter().filter(|a| a.question_id == question_id) {
        if !revealed.contains(&answer.id) {
            revealed.push(answer.id);
        }
    }

    Some(StatePatch {
        buzzer: Some(BuzzerSlot::locked(None)),
        revealed_answers: Some(revealed),
        ..StatePatch::default()
    })
}

/// Add a strike and re-open the buzzer.
pub fn give_strike(state: &GameStateEntity) -> Option<StatePatch> {
    if state.current_question_id.is_none() || state.strikes >= MAX_STRIKES {
        return None;
    }

    Some(StatePatch {
        strikes: Some(state.strikes + 1),
        buzzer: Some(BuzzerSlot::armed()),
        ..StatePatch::default()
    })
}

/// Host override re-opening the buzzer.
pub fn reset_buzzer() -> StatePatch {
    StatePatch {
        buzzer: Some(BuzzerSlot::armed()),
        ..StatePatch::default()
    }
}

/// Host override of one team's score.
pub fn set_score(team: TeamTag, value: i32) -> StatePatch {
    StatePatch::default().with_score(team, value)
}

/// Zero both scores.
pub fn reset_scores() -> StatePatch {
    StatePatch::default()
        .with_score(TeamTag::A, 0)
        .with_score(TeamTag::B, 0)
}

/// Rename both teams.
pub fn rename_teams(team_a: String, team_b: String) -> StatePatch {
    StatePatch {
        team_a_name: Some(team_a),
        team_b_name: Some(team_b),
        ..StatePatch::default()
    }
}

/// Patch keeping the row consistent after an answer was deleted.
pub fn forget_answer(state: &GameStateEntity, answer_id: Uuid) -> Option<StatePatch> {
    if !state.is_revealed(answer_id) {
        return None;
    }
    let revealed = state
        .revealed_answers
        .iter()
        .copied()
        .filter(|id| *id != answer_id)
        .collect();
    Some(StatePatch {
        revealed_answers: Some(revealed),
        ..StatePatch::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::BuzzerState;

    struct Fixture {
        question: Uuid,
        answers: Vec<AnswerEntity>,
        state: GameStateEntity,
    }

    impl Fixture {
        fn new() -> Self {
            let question = Uuid::new_v4();
            let answers = (1..=3)
                .map(|rank| AnswerEntity {
                    id: Uuid::new_v4(),
                    question_id: question,
                    text: format!("answer {rank}"),
                    display_order: rank,
                })
                .collect();
            let mut state = GameStateEntity::default();
            select_question(question).apply_to(&mut state);
            Self {
                question,
                answers,
                state,
            }
        }

        fn apply(&mut self, patch: Option<StatePatch>) -> bool {
            match patch {
                Some(patch) => {
                    patch.apply_to(&mut self.state);
                    true
                }
                None => false,
            }
        }

        fn claim(&mut self, team: TeamTag) {
            assert_eq!(self.state.buzzer_state, BuzzerState::Armed);
            self.state.set_buzzer(BuzzerSlot::locked(Some(team)));
        }
    }

    #[test]
    fn selecting_a_question_starts_from_a_clean_board() {
        let mut state = GameStateEntity::default();
        state.strikes = 2;
        state.revealed_answers = vec![Uuid::new_v4()];
        state.set_buzzer(BuzzerSlot::locked(Some(TeamTag::B)));
        state.team_a_score = 120;

        let question = Uuid::new_v4();
        select_question(question).apply_to(&mut state);

        assert_eq!(state.current_question_id, Some(question));
        assert_eq!(state.strikes, 0);
        assert!(state.revealed_answers.is_empty());
        assert_eq!(state.buzzer(), BuzzerSlot::armed());
        assert_eq!(state.team_a_score, 120);

        clear_board().apply_to(&mut state);
        assert_eq!(state.current_question_id, None);
    }

    #[test]
    fn full_round_scenario() {
        let mut fx = Fixture::new();
        let (first, second) = (fx.answers[0].clone(), fx.answers[1].clone());

        fx.claim(TeamTag::A);
        assert!(fx.apply(reveal(&fx.state, &first)));
        assert_eq!(fx.state.team_a_score, 50);
        assert_eq!(fx.state.revealed_answers, vec![first.id]);
        assert_eq!(fx.state.buzzer(), BuzzerSlot::locked(Some(TeamTag::A)));

        assert!(fx.apply(give_strike(&fx.state)));
        assert_eq!(fx.state.strikes, 1);
        assert_eq!(fx.state.buzzer(), BuzzerSlot::armed());

        fx.claim(TeamTag::B);
        assert!(fx.apply(reveal(&fx.state, &second)));
        assert_eq!(fx.state.team_b_score, 40);
        assert_eq!(fx.state.team_a_score, 50);
    }

    #[test]
    fn reveal_is_idempotent() {
        let mut fx = Fixture::new();
        let answer = fx.answers[2].clone();
        fx.claim(TeamTag::B);

        assert!(fx.apply(reveal(&fx.state, &answer)));
        assert!(!fx.apply(reveal(&fx.state, &answer)));
        assert_eq!(fx.state.team_b_score, 30);
        assert_eq!(fx.state.revealed_answers.len(), 1);
    }

    #[test]
    fn reveal_requires_a_winner_and_a_matching_question() {
        let mut fx = Fixture::new();
        let answer = fx.answers[0].clone();
        assert!(reveal(&fx.state, &answer).is_none());

        fx.claim(TeamTag::A);
        let foreign = AnswerEntity {
            question_id: Uuid::new_v4(),
            ..answer
        };
        assert!(reveal(&fx.state, &foreign).is_none());
    }

    #[test]
    fn reveal_all_never_scores() {
        let mut fx = Fixture::new();
        fx.claim(TeamTag::A);
        let first = fx.answers[0].clone();
        fx.apply(reveal(&fx.state, &first));
        let scores = (fx.state.team_a_score, fx.state.team_b_score);

        let answers = fx.answers.clone();
        assert!(fx.apply(reveal_all(&fx.state, &answers)));

        assert_eq!((fx.state.team_a_score, fx.state.team_b_score), scores);
        assert_eq!(fx.state.revealed_answers.len(), 3);
        assert_eq!(fx.state.revealed_answers[0], first.id);
        assert_eq!(fx.state.buzzer(), BuzzerSlot::locked(None));
        assert_eq!(fx.state.current_question_id, Some(fx.question));
    }

    #[test]
    fn strikes_stop_at_the_cap() {
        let mut fx = Fixture::new();
        for _ in 0..3 {
            assert!(fx.apply(give_strike(&fx.state)));
        }
        fx.claim(TeamTag::A);
        let before = fx.state.clone();

        assert!(give_strike(&fx.state).is_none());
        assert_eq!(fx.state, before);
    }

    #[test]
    fn strike_needs_a_selected_question() {
        let state = GameStateEntity::default();
        assert!(give_strike(&state).is_none());
    }

    #[test]
    fn manual_score_may_go_negative() {
        let mut state = GameStateEntity::default();
        set_score(TeamTag::B, -25).apply_to(&mut state);
        assert_eq!(state.team_b_score, -25);

        reset_scores().apply_to(&mut state);
        assert_eq!((state.team_a_score, state.team_b_score), (0, 0));
    }

    #[test]
    fn deleted_answers_leave_the_revealed_set() {
        let mut fx = Fixture::new();
        fx.claim(TeamTag::A);
        let answer = fx.answers[0].clone();
        fx.apply(reveal(&fx.state, &answer));

        assert!(forget_answer(&fx.state, fx.answers[1].id).is_none());
        assert!(fx.apply(forget_answer(&fx.state, answer.id)));
        assert!(fx.state.revealed_answers.is_empty());
    }
}
