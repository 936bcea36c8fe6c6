//! Port for the points ledger.
//!
//! The ledger is append-only. Adapters never update or delete transactions;
//! balances are computed by summing the signed points of an association.

use async_trait::async_trait;

use crate::domain::{
    CardId, CardMerchant, CardMerchantId, CardMerchantLink, CustomerId, MerchantId, Redemption,
    RedemptionKey, Transaction,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger repository adapters.
    pub enum LedgerRepositoryError {
        /// Store unreachable or pool exhausted.
        Connection { message: String } =>
            "ledger repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "ledger repository query failed: {message}",
        /// Another redemption already holds this idempotency key.
        DuplicateRedemptionKey { key: String } =>
            "redemption key {key} already used",
    }
}

/// A redemption ready to be written together with its debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionDraft {
    /// Card whose association with the merchant is debited.
    pub card_id: CardId,
    /// The record to store. `transaction_id` names the debit entry and
    /// `points_spent` its (positive) size.
    pub redemption: Redemption,
}

/// An association with the signed sum of its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationBalance {
    /// The card-merchant pairing.
    pub association: CardMerchant,
    /// Sum of the association's transaction points.
    pub balance: i64,
}

/// Storage for card-merchant associations, transactions and redemptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Return the association for `(card, merchant)`, creating it if absent.
    ///
    /// Idempotent: concurrent callers observe one row and at most one of them
    /// sees `created == true`.
    async fn get_or_create_card_merchant(
        &self,
        card_id: &CardId,
        merchant_id: &MerchantId,
    ) -> Result<CardMerchantLink, LedgerRepositoryError>;

    /// Look up an association without creating it.
    async fn find_card_merchant(
        &self,
        card_id: &CardId,
        merchant_id: &MerchantId,
    ) -> Result<Option<CardMerchant>, LedgerRepositoryError>;

    /// Associations of a card holding at least one transaction, oldest
    /// first, each with its balance. Untouched associations are skipped.
    async fn balances_for_card(
        &self,
        card_id: &CardId,
    ) -> Result<Vec<AssociationBalance>, LedgerRepositoryError>;

    /// Append an entry and return the association's balance including it.
    async fn append_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<i64, LedgerRepositoryError>;

    /// Signed sum of an association's entries; 0 when there are none.
    async fn balance_for(
        &self,
        card_merchant_id: &CardMerchantId,
    ) -> Result<i64, LedgerRepositoryError>;

    /// Newest entries first.
    async fn transactions_for(
        &self,
        card_merchant_id: &CardMerchantId,
        limit: u32,
    ) -> Result<Vec<Transaction>, LedgerRepositoryError>;

    /// Atomically resolve or create the association, append the debit and
    /// store the redemption. The balance may go negative. Nothing is written
    /// on failure.
    async fn redeem(&self, draft: &RedemptionDraft) -> Result<Redemption, LedgerRepositoryError>;

    /// Redemption previously stored under `key` for the merchant.
    async fn find_redemption_by_key(
        &self,
        merchant_id: &MerchantId,
        key: &RedemptionKey,
    ) -> Result<Option<Redemption>, LedgerRepositoryError>;

    /// A customer's redemptions at a merchant, newest first.
    async fn redemptions_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<Redemption>, LedgerRepositoryError>;
}
