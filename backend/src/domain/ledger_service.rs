//! Points ledger services.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    AppendTransactionRequest, DEFAULT_HISTORY_LIMIT, LedgerCommand, LedgerQuery,
    MAX_HISTORY_LIMIT, MerchantCardRequest, MerchantDetails, MerchantHistory,
    MerchantHistoryRequest,
};
use crate::domain::service_support::{
    Repositories, map_checkpoint_error, map_ledger_error, map_merchant_error,
};
use crate::domain::{
    AppendedTransaction, CardId, Error, MerchantBalance, PointsDelta, Transaction, TransactionId,
};

/// Implements [`LedgerCommand`] and [`LedgerQuery`].
#[derive(Clone)]
pub struct LedgerService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    default_history_limit: u32,
}

impl LedgerService {
    /// Create the service with the default history page size.
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            clock,
            default_history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Override the history page size used when a request names none.
    #[must_use]
    pub fn with_default_history_limit(mut self, limit: u32) -> Self {
        self.default_history_limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        self
    }

    fn history_limit(&self, requested: Option<u32>) -> Result<u32, Error> {
        match requested {
            None => Ok(self.default_history_limit),
            Some(0) => Err(Error::invalid_request("limit must be at least 1")
                .with_details(serde_json::json!({ "field": "limit", "code": "out_of_range" }))),
            Some(limit) => Ok(limit.min(MAX_HISTORY_LIMIT)),
        }
    }
}

#[async_trait]
impl LedgerCommand for LedgerService {
    async fn append_transaction(
        &self,
        request: AppendTransactionRequest,
    ) -> Result<AppendedTransaction, Error> {
        let points = PointsDelta::new(request.points).map_err(|err| {
            warn!(merchant_id = %request.merchant_id, "rejected zero-point transaction");
            Error::invalid_request(err.to_string())
                .with_details(serde_json::json!({ "field": "points", "code": "zero" }))
        })?;
        self.repos.require_merchant(&request.merchant_id).await?;
        let card = self.repos.require_card(&request.card_id).await?;

        let link = self
            .repos
            .ledger
            .get_or_create_card_merchant(&card.id, &request.merchant_id)
            .await
            .map_err(map_ledger_error)?;
        let transaction = Transaction {
            id: TransactionId::random(),
            card_merchant_id: link.association.id,
            points,
            created_at: self.clock.utc(),
        };
        let balance = self
            .repos
            .ledger
            .append_transaction(&transaction)
            .await
            .map_err(map_ledger_error)?;

        info!(
            merchant_id = %request.merchant_id,
            card_id = %card.id,
            points = points.get(),
            balance,
            "transaction appended"
        );
        Ok(AppendedTransaction {
            transaction,
            balance,
            association_created: link.created,
        })
    }
}

#[async_trait]
impl LedgerQuery for LedgerService {
    async fn balances(&self, card_id: CardId) -> Result<Vec<MerchantBalance>, Error> {
        let card = self.repos.require_card(&card_id).await?;
        let funded = self
            .repos
            .ledger
            .balances_for_card(&card.id)
            .await
            .map_err(map_ledger_error)?;

        let mut balances = Vec::with_capacity(funded.len());
        for entry in funded {
            let Some(merchant) = self
                .repos
                .merchants
                .find_merchant(&entry.association.merchant_id)
                .await
                .map_err(map_merchant_error)?
            else {
                continue;
            };
            let progress = self
                .repos
                .progress_for(&card.customer_id, &merchant.id)
                .await?;
            balances.push(MerchantBalance {
                merchant,
                balance: entry.balance,
                progress,
            });
        }
        Ok(balances)
    }

    async fn merchant_details(
        &self,
        request: MerchantCardRequest,
    ) -> Result<MerchantDetails, Error> {
        let merchant = self.repos.require_merchant(&request.merchant_id).await?;
        let card = self.repos.require_card(&request.card_id).await?;
        let association = self
            .repos
            .ledger
            .find_card_merchant(&card.id, &merchant.id)
            .await
            .map_err(map_ledger_error)?;
        let balance = match &association {
            Some(row) => self
                .repos
                .ledger
                .balance_for(&row.id)
                .await
                .map_err(map_ledger_error)?,
            None => 0,
        };
        let progress = self
            .repos
            .progress_for(&card.customer_id, &merchant.id)
            .await?;
        Ok(MerchantDetails {
            merchant,
            card_id: card.id,
            customer_id: card.customer_id,
            balance,
            associated: association.is_some(),
            progress,
        })
    }

    async fn merchant_history(
        &self,
        request: MerchantHistoryRequest,
    ) -> Result<MerchantHistory, Error> {
        let limit = self.history_limit(request.limit)?;
        let merchant = self.repos.require_merchant(&request.merchant_id).await?;
        let card = self.repos.require_card(&request.card_id).await?;
        let association = self
            .repos
            .ledger
            .find_card_merchant(&card.id, &merchant.id)
            .await
            .map_err(map_ledger_error)?;
        let transactions = match association {
            Some(row) => self
                .repos
                .ledger
                .transactions_for(&row.id, limit)
                .await
                .map_err(map_ledger_error)?,
            None => Vec::new(),
        };
        let advancements = self
            .repos
            .checkpoints
            .advancements_for(&card.customer_id, &merchant.id, limit)
            .await
            .map_err(map_checkpoint_error)?;
        let redemptions = self
            .repos
            .ledger
            .redemptions_for(&card.customer_id, &merchant.id, limit)
            .await
            .map_err(map_ledger_error)?;
        let checkpoint_redemptions = self
            .repos
            .checkpoints
            .checkpoint_redemptions_for(&card.customer_id, &merchant.id, limit)
            .await
            .map_err(map_checkpoint_error)?;
        Ok(MerchantHistory {
            merchant_id: merchant.id,
            card_id: card.id,
            customer_id: card.customer_id,
            transactions,
            advancements,
            redemptions,
            checkpoint_redemptions,
        })
    }
}
