//! Driving port for writing to the points ledger.

use async_trait::async_trait;

use crate::domain::{AppendedTransaction, CardId, Error, MerchantId};

/// Append signed points for a card at a merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendTransactionRequest {
    /// Merchant recording the points.
    pub merchant_id: MerchantId,
    /// Card receiving or spending points.
    pub card_id: CardId,
    /// Signed amount; zero is rejected.
    pub points: i64,
}

/// Ledger writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerCommand: Send + Sync {
    /// Append an immutable transaction, associating the card with the
    /// merchant on first use.
    async fn append_transaction(
        &self,
        request: AppendTransactionRequest,
    ) -> Result<AppendedTransaction, Error>;
}
