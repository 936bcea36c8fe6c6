//! Driving port for reading balances and history.

use async_trait::async_trait;

use crate::domain::{
    CardId, CheckpointAdvancement, CheckpointProgress, CheckpointRedemption, CustomerId, Error,
    Merchant, MerchantBalance, MerchantId, Redemption, Transaction,
};

/// Default number of rows per history section.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// Upper bound on rows per history section.
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// Identify a card at one merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerchantCardRequest {
    /// Merchant.
    pub merchant_id: MerchantId,
    /// Card.
    pub card_id: CardId,
}

/// Request a card's history at a merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerchantHistoryRequest {
    /// Merchant.
    pub merchant_id: MerchantId,
    /// Card.
    pub card_id: CardId,
    /// Rows per section; defaults to the configured limit and is capped at
    /// [`MAX_HISTORY_LIMIT`].
    pub limit: Option<u32>,
}

/// A card's standing at one merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantDetails {
    /// Merchant metadata.
    pub merchant: Merchant,
    /// Card.
    pub card_id: CardId,
    /// Card owner.
    pub customer_id: CustomerId,
    /// Balance; 0 when the card has never been used here.
    pub balance: i64,
    /// Whether the card has an association with the merchant.
    pub associated: bool,
    /// Progress per offer.
    pub progress: Vec<CheckpointProgress>,
}

/// A card's activity at one merchant, each section newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantHistory {
    /// Merchant.
    pub merchant_id: MerchantId,
    /// Card.
    pub card_id: CardId,
    /// Card owner.
    pub customer_id: CustomerId,
    /// Ledger entries.
    pub transactions: Vec<Transaction>,
    /// Checkpoint advances.
    pub advancements: Vec<CheckpointAdvancement>,
    /// Points redemptions.
    pub redemptions: Vec<Redemption>,
    /// Milestone redemptions.
    pub checkpoint_redemptions: Vec<CheckpointRedemption>,
}

/// Ledger reads. None of these write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Balance at every merchant the card has been used at.
    async fn balances(&self, card_id: CardId) -> Result<Vec<MerchantBalance>, Error>;

    /// Merchant, balance and checkpoint progress for a card.
    async fn merchant_details(&self, request: MerchantCardRequest)
    -> Result<MerchantDetails, Error>;

    /// Transactions, advances and redemptions for a card at a merchant.
    async fn merchant_history(
        &self,
        request: MerchantHistoryRequest,
    ) -> Result<MerchantHistory, Error>;
}
