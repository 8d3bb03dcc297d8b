//! Buzzer arbitration: the arm/claim/reset state machine and the
//! compare-and-swap cell claims are resolved against.

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, warn};

pub use crate::dao::models::{BuzzerSlot, BuzzerState, TeamTag};
use crate::dao::{
    game_store::GameStore,
    models::GameStateEntity,
    storage::{StorageError, StorageResult},
};

/// Events that can be applied to the buzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzerEvent {
    /// Open the buzzer for a new cycle (question selected, board cleared, strike).
    Arm,
    /// A team tries to latch the buzzer.
    Claim(TeamTag),
    /// Host forces the buzzer open regardless of its state.
    Reset,
}

/// Error returned when an event is not allowed from the current slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid buzzer transition from {from:?} via {event:?}")]
pub struct InvalidTransition {
    /// Slot the event was applied to.
    pub from: BuzzerSlot,
    /// Rejected event.
    pub event: BuzzerEvent,
}

impl BuzzerSlot {
    /// Compute the slot reached by applying `event`.
    pub fn apply(self, event: BuzzerEvent) -> Result<BuzzerSlot, InvalidTransition> {
        match (self.state(), event) {
            (_, BuzzerEvent::Arm | BuzzerEvent::Reset) => Ok(BuzzerSlot::armed()),
            (BuzzerState::Armed, BuzzerEvent::Claim(team)) => Ok(BuzzerSlot::locked(Some(team))),
            (BuzzerState::Locked, BuzzerEvent::Claim(_)) => {
                Err(InvalidTransition { from: self, event })
            }
        }
    }
}

/// Image a [`BuzzerCell`] hands back, from which the buzzer pair can be read.
pub trait BuzzerImage {
    /// Buzzer pair carried by the image.
    fn slot(&self) -> BuzzerSlot;
}

impl BuzzerImage for GameStateEntity {
    fn slot(&self) -> BuzzerSlot {
        self.buzzer()
    }
}

impl BuzzerImage for BuzzerSlot {
    fn slot(&self) -> BuzzerSlot {
        *self
    }
}

/// Storage primitive the claim protocol runs against.
///
/// `try_transition` must be atomic: it writes `next` only when the stored
/// state still equals `expected`, and returns `None` otherwise.
pub trait BuzzerCell: Send + Sync {
    /// Image returned by reads and successful transitions.
    type Image: BuzzerImage + Send;

    /// Read the current image.
    fn observe(&self) -> BoxFuture<'static, StorageResult<Self::Image>>;

    /// Conditionally replace the slot.
    fn try_transition(
        &self,
        expected: BuzzerState,
        next: BuzzerSlot,
    ) -> BoxFuture<'static, StorageResult<Option<Self::Image>>>;
}

/// Adapter running claims directly against a [`GameStore`].
#[derive(Clone)]
pub struct StoreCell(pub Arc<dyn GameStore>);

impl BuzzerCell for StoreCell {
    type Image = GameStateEntity;

    fn observe(&self) -> BoxFuture<'static, StorageResult<GameStateEntity>> {
        self.0.load_state()
    }

    fn try_transition(
        &self,
        expected: BuzzerState,
        next: BuzzerSlot,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        self.0.compare_and_swap_buzzer(expected, next)
    }
}

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome<I> {
    /// The claim latched the buzzer; carries the post-write image.
    Won(I),
    /// The buzzer was already locked when the claim was made.
    NotArmed,
    /// The buzzer looked armed but another claim landed first.
    LostRace,
}

impl<I> ClaimOutcome<I> {
    /// Whether the claiming team now owns the buzzer.
    pub fn is_won(&self) -> bool {
        matches!(self, ClaimOutcome::Won(_))
    }
}

/// Try to latch the buzzer for `team`.
///
/// A storage failure on the conditional write is followed by a fresh read.
/// If that read shows the buzzer latched for `team`, the failed write had in
/// fact committed and the claim is won. Otherwise the write is attempted once
/// more only if the buzzer is still armed, so a claim never lands on a stale
/// arm cycle.
pub async fn claim<C>(cell: &C, team: TeamTag) -> StorageResult<ClaimOutcome<C::Image>>
where
    C: BuzzerCell + ?Sized,
{
    let observed = cell.observe().await?.slot();
    let next = match observed.apply(BuzzerEvent::Claim(team)) {
        Ok(next) => next,
        Err(rejected) => {
            debug!(team = team.as_str(), error = %rejected, "claim ignored");
            return Ok(ClaimOutcome::NotArmed);
        }
    };

    match cell.try_transition(BuzzerState::Armed, next).await {
        Ok(image) => Ok(settle(image, team)),
        Err(err) => retry_after_failure(cell, team, next, err).await,
    }
}

async fn retry_after_failure<C>(
    cell: &C,
    team: TeamTag,
    next: BuzzerSlot,
    first: StorageError,
) -> StorageResult<ClaimOutcome<C::Image>>
where
    C: BuzzerCell + ?Sized,
{
    warn!(team = team.as_str(), error = %first, "buzzer claim write failed; re-reading state");
    let current = cell.observe().await?;
    let slot = current.slot();
    if slot == next {
        debug!(team = team.as_str(), "claim write committed before failing");
        return Ok(ClaimOutcome::Won(current));
    }
    if slot.state() != BuzzerState::Armed {
        return Ok(ClaimOutcome::LostRace);
    }
    let image = cell.try_transition(BuzzerState::Armed, next).await?;
    Ok(settle(image, team))
}

fn settle<I>(image: Option<I>, team: TeamTag) -> ClaimOutcome<I> {
    match image {
        Some(image) => ClaimOutcome::Won(image),
        None => {
            debug!(team = team.as_str(), "claim lost the race");
            ClaimOutcome::LostRace
        }
    }
}
