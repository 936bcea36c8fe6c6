//! Driving port for read-only card checks.

use async_trait::async_trait;

use crate::domain::{CardStatus, CardUid, Error, MerchantId};

/// Check a card without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardStatusRequest {
    /// Merchant asking, when known.
    pub merchant_id: Option<MerchantId>,
    /// Card UID.
    pub uid: CardUid,
}

/// Read-only card use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardQuery: Send + Sync {
    /// Report whether the card exists and is associated with the merchant.
    /// Never creates anything.
    async fn card_status(&self, request: CardStatusRequest) -> Result<CardStatus, Error>;
}
