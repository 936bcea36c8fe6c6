//! Port for checkpoint cursors, their audit trail and milestone redemptions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    CheckpointAdvancement, CheckpointKey, CheckpointRedemption, CursorMovement, CursorTransition,
    CustomerCheckpoint, CustomerId, MerchantId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by checkpoint repository adapters.
    pub enum CheckpointRepositoryError {
        /// Store unreachable or pool exhausted.
        Connection { message: String } =>
            "checkpoint repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "checkpoint repository query failed: {message}",
        /// Rewind requested for a journey that never started.
        MissingCursor =>
            "no checkpoint progress recorded for this offer",
        /// The offer vanished while the cursor was being moved.
        OfferMissing =>
            "checkpoint offer no longer exists",
    }
}

/// Storage for per-customer checkpoint cursors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Move the cursor for `key` as one atomic read-modify-write.
    ///
    /// Within a single transaction the adapter locks the cursor row, reads the
    /// offer's current `total_steps`, applies `movement` via
    /// [`crate::domain::StepCursor`] and persists the result. An advance
    /// creates a missing cursor at step 0 first and appends a
    /// [`CheckpointAdvancement`] stamped with `at`. A rewind of a missing
    /// cursor fails with [`CheckpointRepositoryError::MissingCursor`] and
    /// writes no audit row.
    async fn move_cursor(
        &self,
        key: &CheckpointKey,
        movement: CursorMovement,
        at: DateTime<Utc>,
    ) -> Result<CursorTransition, CheckpointRepositoryError>;

    /// All cursors a customer holds at a merchant.
    async fn cursors_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CustomerCheckpoint>, CheckpointRepositoryError>;

    /// Advance audit rows, newest first.
    async fn advancements_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<CheckpointAdvancement>, CheckpointRepositoryError>;

    /// Record a milestone reward redemption.
    async fn insert_checkpoint_redemption(
        &self,
        redemption: &CheckpointRedemption,
    ) -> Result<(), CheckpointRepositoryError>;

    /// Milestone redemptions, newest first.
    async fn checkpoint_redemptions_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<CheckpointRedemption>, CheckpointRepositoryError>;
}
