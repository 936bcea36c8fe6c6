//! Driving port for moving checkpoint cursors.

use async_trait::async_trait;

use crate::domain::{AdvanceResult, CardId, CustomerId, Error, MerchantId, OfferId, RewindResult};

/// Who is progressing. Terminals usually only know the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerSubject {
    /// A known customer.
    Customer(CustomerId),
    /// The owner of a card.
    Card(CardId),
}

/// Move a customer's cursor in one of the merchant's offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointMoveRequest {
    /// Merchant owning the offer.
    pub merchant_id: MerchantId,
    /// Customer or card.
    pub subject: CustomerSubject,
    /// Offer; the merchant's oldest offer when omitted.
    pub offer_id: Option<OfferId>,
}

/// Checkpoint cursor use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckpointCommand: Send + Sync {
    /// Advance one step, wrapping from the last step to step 1, and report
    /// the reward attached to the step reached.
    async fn advance(&self, request: CheckpointMoveRequest) -> Result<AdvanceResult, Error>;

    /// Rewind one step, wrapping from step 1 to the last step.
    async fn rewind(&self, request: CheckpointMoveRequest) -> Result<RewindResult, Error>;
}
