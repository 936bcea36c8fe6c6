//! Checkpoint journeys and the cursor state machine.
//!
//! A merchant configures an offer with `total_steps` milestones. Each customer
//! holds one cursor per (merchant, offer); a tap advances the cursor and the
//! journey repeats once the last step has been reached. The arithmetic lives in
//! [`StepCursor`] so adapters only have to persist the result atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{
    AdvancementId, CheckpointRewardId, CustomerId, MerchantId, OfferId, StepId,
};

/// Direction of a cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorMovement {
    /// Move forward one step, wrapping past the last step to step 1.
    Advance,
    /// Move back one step, wrapping below step 1 to the last step.
    Rewind,
}

/// Invalid cursor construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepCursorError {
    /// Offers always have at least one step.
    #[error("total steps must be at least 1")]
    EmptyJourney,
    /// The cursor may not sit beyond the final step.
    #[error("current step {current} exceeds total steps {total}")]
    OutOfRange {
        /// Requested position.
        current: u32,
        /// Journey length.
        total: u32,
    },
}

/// Position of a customer within an offer.
///
/// Invariant: `1 <= total_steps` and `current_step <= total_steps`. Step 0
/// means the journey has been created but not started.
///
/// # Examples
/// ```
/// use loyalty_backend::domain::StepCursor;
///
/// let cursor = StepCursor::new(3, 3).expect("valid cursor");
/// assert_eq!(cursor.advanced().current_step(), 1);
/// assert_eq!(StepCursor::new(1, 3).unwrap().rewound().current_step(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepCursor {
    current_step: u32,
    total_steps: u32,
}

impl StepCursor {
    /// Build a cursor, rejecting positions outside `[0, total_steps]`.
    pub fn new(current_step: u32, total_steps: u32) -> Result<Self, StepCursorError> {
        if total_steps == 0 {
            return Err(StepCursorError::EmptyJourney);
        }
        if current_step > total_steps {
            return Err(StepCursorError::OutOfRange {
                current: current_step,
                total: total_steps,
            });
        }
        Ok(Self {
            current_step,
            total_steps,
        })
    }

    /// A journey that has not started yet.
    pub fn start(total_steps: u32) -> Result<Self, StepCursorError> {
        Self::new(0, total_steps)
    }

    /// Build a cursor from a stored position, pulling it back inside the
    /// journey if the offer has since been shortened.
    pub fn clamped(current_step: u32, total_steps: u32) -> Result<Self, StepCursorError> {
        Self::new(current_step.min(total_steps), total_steps)
    }

    /// Current position.
    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Journey length.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Next position; the step after the last one is step 1, never 0.
    #[must_use]
    pub fn advanced(self) -> Self {
        let next = self.current_step + 1;
        Self {
            current_step: if next > self.total_steps { 1 } else { next },
            ..self
        }
    }

    /// Previous position; the step before 1 (or an unstarted 0) is the last.
    #[must_use]
    pub fn rewound(self) -> Self {
        let current_step = if self.current_step <= 1 {
            self.total_steps
        } else {
            self.current_step - 1
        };
        Self {
            current_step,
            ..self
        }
    }

    /// Apply a movement.
    #[must_use]
    pub fn apply(self, movement: CursorMovement) -> Self {
        match movement {
            CursorMovement::Advance => self.advanced(),
            CursorMovement::Rewind => self.rewound(),
        }
    }
}

/// Milestone journey configured by a merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointOffer {
    /// Offer identifier.
    pub id: OfferId,
    /// Owning merchant.
    pub merchant_id: MerchantId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Number of steps, at least 1.
    pub total_steps: u32,
    /// Creation time; the earliest offer is the merchant's default.
    pub created_at: DateTime<Utc>,
}

/// One numbered milestone of an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointStep {
    /// Step identifier.
    pub id: StepId,
    /// Parent offer.
    pub offer_id: OfferId,
    /// Position in `[1, total_steps]`.
    pub step_number: u32,
    /// Reward granted on reaching this step.
    pub reward_id: Option<CheckpointRewardId>,
}

/// Reward granted by reaching a checkpoint step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointReward {
    /// Reward identifier.
    pub id: CheckpointRewardId,
    /// Owning merchant.
    pub merchant_id: MerchantId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional icon name or URL.
    pub icon: Option<String>,
}

/// Reward details returned after an advance lands on a rewarded step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    /// Reward identifier.
    pub id: CheckpointRewardId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

impl From<CheckpointReward> for RewardSummary {
    fn from(reward: CheckpointReward) -> Self {
        Self {
            id: reward.id,
            name: reward.name,
            description: reward.description,
        }
    }
}

/// Key of a customer's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckpointKey {
    /// Customer progressing through the journey.
    pub customer_id: CustomerId,
    /// Merchant owning the offer.
    pub merchant_id: MerchantId,
    /// Offer being progressed.
    pub offer_id: OfferId,
}

/// Stored cursor row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCheckpoint {
    /// Customer.
    pub customer_id: CustomerId,
    /// Merchant.
    pub merchant_id: MerchantId,
    /// Offer.
    pub offer_id: OfferId,
    /// Position in `[0, total_steps]`.
    pub current_step: u32,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Outcome of an atomic cursor move performed by a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorTransition {
    /// Position before the move.
    pub previous: StepCursor,
    /// Position after the move.
    pub current: StepCursor,
    /// Whether the cursor row was created by this move.
    pub created: bool,
}

/// Audit row written for every advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointAdvancement {
    /// Audit identifier.
    pub id: AdvancementId,
    /// Customer.
    pub customer_id: CustomerId,
    /// Merchant.
    pub merchant_id: MerchantId,
    /// Offer.
    pub offer_id: OfferId,
    /// Step reached by the advance.
    pub step_reached: u32,
    /// Offer length at the time of the advance.
    pub total_steps: u32,
    /// When the advance happened.
    pub created_at: DateTime<Utc>,
}

/// Result of advancing a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceResult {
    /// Offer that was advanced.
    pub offer_id: OfferId,
    /// Position after the advance.
    pub current_step: u32,
    /// Journey length.
    pub total_steps: u32,
    /// Reward attached to the new step, if any.
    pub reward: Option<RewardSummary>,
}

/// Result of rewinding a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewindResult {
    /// Offer that was rewound.
    pub offer_id: OfferId,
    /// Position after the rewind.
    pub current_step: u32,
    /// Journey length.
    pub total_steps: u32,
}

/// An offer with its configured steps, ordered by step number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferWithSteps {
    /// The offer.
    pub offer: CheckpointOffer,
    /// Steps sorted by `step_number`.
    pub steps: Vec<CheckpointStep>,
}

/// A customer's position in one offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointProgress {
    /// Offer.
    pub offer_id: OfferId,
    /// Offer name.
    pub offer_name: String,
    /// Position; 0 when the journey has not started.
    pub current_step: u32,
    /// Journey length.
    pub total_steps: u32,
}

impl CheckpointProgress {
    /// Combine an offer with an optional stored cursor.
    #[must_use]
    pub fn for_offer(offer: &CheckpointOffer, cursor: Option<&CustomerCheckpoint>) -> Self {
        Self {
            offer_id: offer.id,
            offer_name: offer.name.clone(),
            current_step: cursor
                .map_or(0, |row| row.current_step.min(offer.total_steps)),
            total_steps: offer.total_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cursor(current: u32, total: u32) -> StepCursor {
        StepCursor::new(current, total).expect("valid cursor")
    }

    #[rstest]
    #[case(0, 3, 1)]
    #[case(1, 3, 2)]
    #[case(2, 3, 3)]
    #[case(3, 3, 1)]
    #[case(1, 1, 1)]
    #[case(0, 1, 1)]
    fn advance_increments_and_wraps_to_one(
        #[case] current: u32,
        #[case] total: u32,
        #[case] expected: u32,
    ) {
        assert_eq!(cursor(current, total).advanced().current_step(), expected);
    }

    #[rstest]
    #[case(3, 3, 2)]
    #[case(2, 3, 1)]
    #[case(1, 3, 3)]
    #[case(0, 3, 3)]
    #[case(1, 1, 1)]
    fn rewind_decrements_and_wraps_to_total(
        #[case] current: u32,
        #[case] total: u32,
        #[case] expected: u32,
    ) {
        assert_eq!(cursor(current, total).rewound().current_step(), expected);
    }

    #[rstest]
    fn advance_never_lands_on_zero() {
        for total in 1..=12 {
            let mut position = StepCursor::start(total).expect("journey");
            for _ in 0..(total * 3) {
                position = position.advanced();
                assert!((1..=total).contains(&position.current_step()));
            }
        }
    }

    #[rstest]
    fn advance_and_rewind_are_inverse_on_interior_steps() {
        for total in 3..=10 {
            for k in 2..total {
                let start = cursor(k, total);
                assert_eq!(start.advanced().rewound(), start);
                assert_eq!(start.rewound().advanced(), start);
            }
        }
    }

    #[rstest]
    fn advance_and_rewind_are_inverse_on_boundaries_too() {
        let last = cursor(5, 5);
        assert_eq!(last.advanced().rewound(), last);
        let first = cursor(1, 5);
        assert_eq!(first.rewound().advanced(), first);
    }

    #[rstest]
    fn apply_dispatches_on_movement() {
        let start = cursor(2, 4);
        assert_eq!(start.apply(CursorMovement::Advance).current_step(), 3);
        assert_eq!(start.apply(CursorMovement::Rewind).current_step(), 1);
    }

    #[rstest]
    fn construction_enforces_bounds() {
        assert_eq!(StepCursor::new(0, 0), Err(StepCursorError::EmptyJourney));
        assert_eq!(
            StepCursor::new(4, 3),
            Err(StepCursorError::OutOfRange {
                current: 4,
                total: 3
            })
        );
        assert_eq!(StepCursor::clamped(7, 3).map(|c| c.current_step()), Ok(3));
    }

    #[rstest]
    fn progress_defaults_to_unstarted() {
        let offer = CheckpointOffer {
            id: OfferId::random(),
            merchant_id: MerchantId::random(),
            name: "Coffee run".into(),
            description: None,
            total_steps: 5,
            created_at: Utc::now(),
        };
        let progress = CheckpointProgress::for_offer(&offer, None);
        assert_eq!(progress.current_step, 0);
        assert_eq!(progress.total_steps, 5);
    }
}
