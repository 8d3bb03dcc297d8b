use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Fallback display name of the first team when none is configured.
pub const DEFAULT_TEAM_A_NAME: &str = "Team A";
/// Fallback display name of the second team when none is configured.
pub const DEFAULT_TEAM_B_NAME: &str = "Team B";
/// Strikes cap for a single question.
pub const MAX_STRIKES: u8 = 3;

/// Availability of the shared buzzer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuzzerState {
    /// Open for claims.
    Armed,
    /// Closed; a winner may be latched.
    Locked,
}

impl BuzzerState {
    /// Stable lowercase representation used by the storage backends.
    pub fn as_str(self) -> &'static str {
        match self {
            BuzzerState::Armed => "armed",
            BuzzerState::Locked => "locked",
        }
    }
}

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TeamTag {
    /// First team.
    A,
    /// Second team.
    B,
}

impl TeamTag {
    /// Stable lowercase representation used by the storage backends.
    pub fn as_str(self) -> &'static str {
        match self {
            TeamTag::A => "a",
            TeamTag::B => "b",
        }
    }
}

/// Buzzer arbitration pair `{state, winner}`.
///
/// The constructors keep `winner` empty whenever the buzzer is armed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct BuzzerSlot {
    state: BuzzerState,
    winner: Option<TeamTag>,
}

impl BuzzerSlot {
    /// Open buzzer with no winner.
    pub const fn armed() -> Self {
        Self {
            state: BuzzerState::Armed,
            winner: None,
        }
    }

    /// Closed buzzer, optionally latching a winner.
    pub const fn locked(winner: Option<TeamTag>) -> Self {
        Self {
            state: BuzzerState::Locked,
            winner,
        }
    }

    /// Current availability.
    pub fn state(&self) -> BuzzerState {
        self.state
    }

    /// Latched winner, if any.
    pub fn winner(&self) -> Option<TeamTag> {
        self.winner
    }
}

impl Default for BuzzerSlot {
    fn default() -> Self {
        Self::armed()
    }
}

/// Singleton game state row shared by every screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStateEntity {
    /// Question currently on the board; `None` when the board is cleared.
    pub current_question_id: Option<Uuid>,
    /// Display name of team `a`.
    pub team_a_name: String,
    /// Display name of team `b`.
    pub team_b_name: String,
    /// Score of team `a` (may be negative after a manual override).
    pub team_a_score: i32,
    /// Score of team `b` (may be negative after a manual override).
    pub team_b_score: i32,
    /// Buzzer availability.
    pub buzzer_state: BuzzerState,
    /// Team that won the current arm cycle.
    pub buzzer_winner: Option<TeamTag>,
    /// Strikes given on the current question, in `0..=3`.
    pub strikes: u8,
    /// Answers already revealed for the current question, in reveal order.
    pub revealed_answers: Vec<Uuid>,
    /// Last time the row was written.
    pub updated_at: SystemTime,
    /// Write counter, bumped by every committed write. Orders row images.
    #[serde(default)]
    pub version: u64,
}

impl GameStateEntity {
    /// Build the row created once at provisioning time.
    pub fn provisioned(team_a_name: impl Into<String>, team_b_name: impl Into<String>) -> Self {
        Self {
            current_question_id: None,
            team_a_name: team_a_name.into(),
            team_b_name: team_b_name.into(),
            team_a_score: 0,
            team_b_score: 0,
            buzzer_state: BuzzerState::Armed,
            buzzer_winner: None,
            strikes: 0,
            revealed_answers: Vec::new(),
            updated_at: SystemTime::now(),
            version: 0,
        }
    }

    /// Buzzer pair view of the row.
    pub fn buzzer(&self) -> BuzzerSlot {
        match self.buzzer_state {
            BuzzerState::Armed => BuzzerSlot::armed(),
            BuzzerState::Locked => BuzzerSlot::locked(self.buzzer_winner),
        }
    }

    /// Overwrite both buzzer columns at once.
    pub fn set_buzzer(&mut self, slot: BuzzerSlot) {
        self.buzzer_state = slot.state();
        self.buzzer_winner = slot.winner();
    }

    /// Score of the given team.
    pub fn score(&self, team: TeamTag) -> i32 {
        match team {
            TeamTag::A => self.team_a_score,
            TeamTag::B => self.team_b_score,
        }
    }

    /// Whether the answer is already visible on the board.
    pub fn is_revealed(&self, answer_id: Uuid) -> bool {
        self.revealed_answers.contains(&answer_id)
    }
}

impl Default for GameStateEntity {
    fn default() -> Self {
        Self::provisioned(DEFAULT_TEAM_A_NAME, DEFAULT_TEAM_B_NAME)
    }
}

/// Field-level update of the game state row.
///
/// Only the fields set to `Some` are written, so two patches touching
/// disjoint fields never clobber each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    /// New question pointer (`Some(None)` clears the board).
    pub current_question_id: Option<Option<Uuid>>,
    /// New name of team `a`.
    pub team_a_name: Option<String>,
    /// New name of team `b`.
    pub team_b_name: Option<String>,
    /// New score of team `a`.
    pub team_a_score: Option<i32>,
    /// New score of team `b`.
    pub team_b_score: Option<i32>,
    /// New buzzer pair.
    pub buzzer: Option<BuzzerSlot>,
    /// New strike count.
    pub strikes: Option<u8>,
    /// New revealed answer list.
    pub revealed_answers: Option<Vec<Uuid>>,
}

impl StatePatch {
    /// Whether the patch touches no field.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set the score of one team.
    pub fn with_score(mut self, team: TeamTag, value: i32) -> Self {
        match team {
            TeamTag::A => self.team_a_score = Some(value),
            TeamTag::B => self.team_b_score = Some(value),
        }
        self
    }

    /// Apply the patch to an in-memory row image, stamp `updated_at` and
    /// bump `version`.
    pub fn apply_to(&self, state: &mut GameStateEntity) {
        if let Some(question) = self.current_question_id {
            state.current_question_id = question;
        }
        if let Some(name) = &self.team_a_name {
            state.team_a_name = name.clone();
        }
        if let Some(name) = &self.team_b_name {
            state.team_b_name = name.clone();
        }
        if let Some(score) = self.team_a_score {
            state.team_a_score = score;
        }
        if let Some(score) = self.team_b_score {
            state.team_b_score = score;
        }
        if let Some(slot) = self.buzzer {
            state.set_buzzer(slot);
        }
        if let Some(strikes) = self.strikes {
            state.strikes = strikes;
        }
        if let Some(revealed) = &self.revealed_answers {
            state.revealed_answers = revealed.clone();
        }
        state.updated_at = SystemTime::now();
        state.version += 1;
    }
}

/// Round of questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Stable identifier for the round.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Ordering key among rounds.
    pub position: u32,
}

/// Question belonging to a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Stable identifier for the question.
    pub id: Uuid,
    /// Owning round.
    pub round_id: Uuid,
    /// Question text shown on the board.
    pub text: String,
    /// Ordering key within the round.
    pub position: u32,
}

/// Survey answer belonging to a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Stable identifier for the answer.
    pub id: Uuid,
    /// Owning question.
    pub question_id: Uuid,
    /// Answer text.
    pub text: String,
    /// Popularity rank, drives the point value.
    pub display_order: i32,
}
