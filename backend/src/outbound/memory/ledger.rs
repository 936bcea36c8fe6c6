//! Ledger storage: associations, transactions and points redemptions.

use async_trait::async_trait;

use super::{Inner, InMemoryStore, newest_first};
use crate::domain::ports::{
    AssociationBalance, LedgerRepository, LedgerRepositoryError, RedemptionDraft,
};
use crate::domain::{
    CardId, CardMerchant, CardMerchantId, CardMerchantLink, CustomerId, MerchantId, PointsDelta,
    Redemption, RedemptionKey, Transaction, sum_points,
};

impl Inner {
    pub(super) fn link(
        &mut self,
        card_id: &CardId,
        merchant_id: &MerchantId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> CardMerchantLink {
        if let Some(existing) = self
            .card_merchants
            .iter()
            .find(|row| row.card_id == *card_id && row.merchant_id == *merchant_id)
        {
            return CardMerchantLink {
                association: existing.clone(),
                created: false,
            };
        }
        let association = CardMerchant {
            id: CardMerchantId::random(),
            card_id: *card_id,
            merchant_id: *merchant_id,
            created_at: now,
        };
        self.card_merchants.push(association.clone());
        CardMerchantLink {
            association,
            created: true,
        }
    }

    fn balance(&self, card_merchant_id: &CardMerchantId) -> i64 {
        sum_points(
            self.transactions
                .iter()
                .filter(|tx| tx.card_merchant_id == *card_merchant_id)
                .map(|tx| tx.points.get()),
        )
    }
}

#[async_trait]
impl LedgerRepository for InMemoryStore {
    async fn get_or_create_card_merchant(
        &self,
        card_id: &CardId,
        merchant_id: &MerchantId,
    ) -> Result<CardMerchantLink, LedgerRepositoryError> {
        let now = self.clock.utc();
        Ok(self.lock().await.link(card_id, merchant_id, now))
    }

    async fn find_card_merchant(
        &self,
        card_id: &CardId,
        merchant_id: &MerchantId,
    ) -> Result<Option<CardMerchant>, LedgerRepositoryError> {
        Ok(self
            .lock()
            .await
            .card_merchants
            .iter()
            .find(|row| row.card_id == *card_id && row.merchant_id == *merchant_id)
            .cloned())
    }

    async fn balances_for_card(
        &self,
        card_id: &CardId,
    ) -> Result<Vec<AssociationBalance>, LedgerRepositoryError> {
        let inner = self.lock().await;
        Ok(inner
            .card_merchants
            .iter()
            .filter(|row| row.card_id == *card_id)
            .filter(|row| {
                inner
                    .transactions
                    .iter()
                    .any(|tx| tx.card_merchant_id == row.id)
            })
            .map(|row| AssociationBalance {
                association: row.clone(),
                balance: inner.balance(&row.id),
            })
            .collect())
    }

    async fn append_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<i64, LedgerRepositoryError> {
        let mut inner = self.lock().await;
        if !inner
            .card_merchants
            .iter()
            .any(|row| row.id == transaction.card_merchant_id)
        {
            return Err(LedgerRepositoryError::query(format!(
                "card merchant {} does not exist",
                transaction.card_merchant_id
            )));
        }
        inner.transactions.push(transaction.clone());
        Ok(inner.balance(&transaction.card_merchant_id))
    }

    async fn balance_for(
        &self,
        card_merchant_id: &CardMerchantId,
    ) -> Result<i64, LedgerRepositoryError> {
        Ok(self.lock().await.balance(card_merchant_id))
    }

    async fn transactions_for(
        &self,
        card_merchant_id: &CardMerchantId,
        limit: u32,
    ) -> Result<Vec<Transaction>, LedgerRepositoryError> {
        let inner = self.lock().await;
        Ok(newest_first(
            inner
                .transactions
                .iter()
                .filter(|tx| tx.card_merchant_id == *card_merchant_id)
                .cloned(),
            limit,
        ))
    }

    async fn redeem(&self, draft: &RedemptionDraft) -> Result<Redemption, LedgerRepositoryError> {
        let redemption = &draft.redemption;
        let debit = PointsDelta::debit(redemption.points_spent)
            .map_err(|err| LedgerRepositoryError::query(err.to_string()))?;
        let mut inner = self.lock().await;

        if let Some(key) = &redemption.idempotency_key {
            let taken = inner.redemptions.iter().any(|row| {
                row.merchant_id == redemption.merchant_id
                    && row.idempotency_key.as_ref() == Some(key)
            });
            if taken {
                return Err(LedgerRepositoryError::duplicate_redemption_key(
                    key.as_ref(),
                ));
            }
        }

        let association = inner
            .link(&draft.card_id, &redemption.merchant_id, redemption.created_at)
            .association;

        inner.transactions.push(Transaction {
            id: redemption.transaction_id,
            card_merchant_id: association.id,
            points: debit,
            created_at: redemption.created_at,
        });
        inner.redemptions.push(redemption.clone());
        Ok(redemption.clone())
    }

    async fn find_redemption_by_key(
        &self,
        merchant_id: &MerchantId,
        key: &RedemptionKey,
    ) -> Result<Option<Redemption>, LedgerRepositoryError> {
        Ok(self
            .lock()
            .await
            .redemptions
            .iter()
            .find(|row| row.merchant_id == *merchant_id && row.idempotency_key.as_ref() == Some(key))
            .cloned())
    }

    async fn redemptions_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<Redemption>, LedgerRepositoryError> {
        let inner = self.lock().await;
        Ok(newest_first(
            inner
                .redemptions
                .iter()
                .filter(|row| row.customer_id == *customer_id && row.merchant_id == *merchant_id)
                .cloned(),
            limit,
        ))
    }
}
