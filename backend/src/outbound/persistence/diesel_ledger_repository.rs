//! PostgreSQL-backed `LedgerRepository`.
//!
//! Transactions are append-only. The redemption path runs the association
//! upsert, the debit and the redemption insert in one database transaction.
//! Balances may go negative.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    AssociationBalance, LedgerRepository, LedgerRepositoryError, RedemptionDraft,
};
use crate::domain::{
    CardId, CardMerchant, CardMerchantId, CardMerchantLink, CustomerId, MerchantId, Redemption,
    RedemptionKey, Transaction, sum_points,
};

use super::diesel_basic_error_mapping::{
    is_transient, is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{CardMerchantRow, NewCardMerchantRow, RedemptionRow, TransactionRow};
use super::pool::{DbPool, PoolError};
use super::retry::retry_transient;
use super::schema::{card_merchants, redeemed_rewards, transactions};

/// Unique constraint on `(merchant_id, idempotency_key)`.
const REDEMPTION_KEY_CONSTRAINT: &str = "redeemed_rewards_idempotency_key";

/// Diesel-backed ledger storage.
#[derive(Clone)]
pub struct DieselLedgerRepository {
    pool: DbPool,
}

impl DieselLedgerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> LedgerRepositoryError {
    map_basic_pool_error(error, LedgerRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> LedgerRepositoryError {
    map_basic_diesel_error(
        &error,
        LedgerRepositoryError::query,
        LedgerRepositoryError::connection,
    )
}

fn into_transactions(rows: Vec<TransactionRow>) -> Result<Vec<Transaction>, LedgerRepositoryError> {
    rows.into_iter()
        .map(|row| Transaction::try_from(row).map_err(LedgerRepositoryError::query))
        .collect()
}

fn into_redemptions(rows: Vec<RedemptionRow>) -> Result<Vec<Redemption>, LedgerRepositoryError> {
    rows.into_iter()
        .map(|row| Redemption::try_from(row).map_err(LedgerRepositoryError::query))
        .collect()
}

/// Failure inside the redemption transaction.
#[derive(Debug)]
enum RedeemError {
    Pool(PoolError),
    Diesel(DieselError),
}

impl From<DieselError> for RedeemError {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

impl RedeemError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Diesel(err) if is_transient(err))
    }
}

/// Insert the association if missing and return it with a created flag.
async fn link(
    conn: &mut AsyncPgConnection,
    card_id: Uuid,
    merchant_id: Uuid,
) -> QueryResult<(CardMerchantRow, bool)> {
    let inserted: Option<CardMerchantRow> = diesel::insert_into(card_merchants::table)
        .values(NewCardMerchantRow {
            id: Uuid::new_v4(),
            card_id,
            merchant_id,
        })
        .on_conflict((card_merchants::card_id, card_merchants::merchant_id))
        .do_nothing()
        .returning(CardMerchantRow::as_returning())
        .get_result(conn)
        .await
        .optional()?;
    if let Some(row) = inserted {
        return Ok((row, true));
    }
    let existing = card_merchants::table
        .filter(card_merchants::card_id.eq(card_id))
        .filter(card_merchants::merchant_id.eq(merchant_id))
        .select(CardMerchantRow::as_select())
        .first(conn)
        .await?;
    Ok((existing, false))
}

async fn balance_of(conn: &mut AsyncPgConnection, card_merchant_id: Uuid) -> QueryResult<i64> {
    let points: Vec<i64> = transactions::table
        .filter(transactions::card_merchant_id.eq(card_merchant_id))
        .select(transactions::points)
        .load(conn)
        .await?;
    Ok(sum_points(points))
}

impl DieselLedgerRepository {
    async fn redeem_once(
        &self,
        card_id: Uuid,
        debit: &TransactionRow,
        record: &RedemptionRow,
    ) -> Result<(), RedeemError> {
        let mut pooled = self.pool.get().await.map_err(RedeemError::Pool)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        conn.transaction::<_, RedeemError, _>(|conn| {
            async move {
                let (association, _) = link(conn, card_id, record.merchant_id).await?;
                diesel::insert_into(transactions::table)
                    .values(TransactionRow {
                        card_merchant_id: association.id,
                        ..debit.clone()
                    })
                    .execute(conn)
                    .await?;
                diesel::insert_into(redeemed_rewards::table)
                    .values(record)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}

#[async_trait]
impl LedgerRepository for DieselLedgerRepository {
    async fn get_or_create_card_merchant(
        &self,
        card_id: &CardId,
        merchant_id: &MerchantId,
    ) -> Result<CardMerchantLink, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let (row, created) = link(&mut conn, *card_id.as_uuid(), *merchant_id.as_uuid())
            .await
            .map_err(map_diesel_error)?;
        Ok(CardMerchantLink {
            association: CardMerchant::from(row),
            created,
        })
    }

    async fn find_card_merchant(
        &self,
        card_id: &CardId,
        merchant_id: &MerchantId,
    ) -> Result<Option<CardMerchant>, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CardMerchantRow> = card_merchants::table
            .filter(card_merchants::card_id.eq(card_id.as_uuid()))
            .filter(card_merchants::merchant_id.eq(merchant_id.as_uuid()))
            .select(CardMerchantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(CardMerchant::from))
    }

    async fn balances_for_card(
        &self,
        card_id: &CardId,
    ) -> Result<Vec<AssociationBalance>, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CardMerchantRow> = card_merchants::table
            .filter(card_merchants::card_id.eq(card_id.as_uuid()))
            .order_by((card_merchants::created_at, card_merchants::id))
            .select(CardMerchantRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let entries: Vec<(Uuid, i64)> = transactions::table
            .inner_join(card_merchants::table)
            .filter(card_merchants::card_id.eq(card_id.as_uuid()))
            .select((transactions::card_merchant_id, transactions::points))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut points_by_association: HashMap<Uuid, Vec<i64>> = HashMap::new();
        for (card_merchant_id, points) in entries {
            points_by_association
                .entry(card_merchant_id)
                .or_default()
                .push(points);
        }
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let points = points_by_association.remove(&row.id)?;
                Some(AssociationBalance {
                    association: CardMerchant::from(row),
                    balance: sum_points(points),
                })
            })
            .collect())
    }

    async fn append_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<i64, LedgerRepositoryError> {
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let row = TransactionRow::from(transaction);
        conn.transaction::<_, DieselError, _>(|conn| {
            async move {
                diesel::insert_into(transactions::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                balance_of(conn, row.card_merchant_id).await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn balance_for(
        &self,
        card_merchant_id: &CardMerchantId,
    ) -> Result<i64, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        balance_of(&mut conn, *card_merchant_id.as_uuid())
            .await
            .map_err(map_diesel_error)
    }

    async fn transactions_for(
        &self,
        card_merchant_id: &CardMerchantId,
        limit: u32,
    ) -> Result<Vec<Transaction>, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<TransactionRow> = transactions::table
            .filter(transactions::card_merchant_id.eq(card_merchant_id.as_uuid()))
            .order_by((transactions::created_at.desc(), transactions::id.desc()))
            .limit(i64::from(limit))
            .select(TransactionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_transactions(rows)
    }

    async fn redeem(&self, draft: &RedemptionDraft) -> Result<Redemption, LedgerRepositoryError> {
        let redemption = &draft.redemption;
        let record = RedemptionRow::try_from(redemption).map_err(LedgerRepositoryError::query)?;
        let debit = TransactionRow {
            id: *redemption.transaction_id.as_uuid(),
            card_merchant_id: Uuid::nil(),
            points: -i64::from(redemption.points_spent),
            created_at: redemption.created_at,
        };
        let card_id = *draft.card_id.as_uuid();
        let (debit, record) = (&debit, &record);

        let outcome = retry_transient("redeem", RedeemError::is_transient, move || {
            self.redeem_once(card_id, debit, record)
        })
        .await;

        match outcome {
            Ok(()) => Ok(redemption.clone()),
            Err(RedeemError::Diesel(err)) if is_unique_violation(&err, REDEMPTION_KEY_CONSTRAINT) => {
                let key = redemption
                    .idempotency_key
                    .as_ref()
                    .map(|key| key.as_ref().to_owned())
                    .unwrap_or_default();
                Err(LedgerRepositoryError::duplicate_redemption_key(key))
            }
            Err(RedeemError::Diesel(err)) => Err(map_diesel_error(err)),
            Err(RedeemError::Pool(err)) => Err(map_pool_error(err)),
        }
    }

    async fn find_redemption_by_key(
        &self,
        merchant_id: &MerchantId,
        key: &RedemptionKey,
    ) -> Result<Option<Redemption>, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<RedemptionRow> = redeemed_rewards::table
            .filter(redeemed_rewards::merchant_id.eq(merchant_id.as_uuid()))
            .filter(redeemed_rewards::idempotency_key.eq(key.as_ref()))
            .select(RedemptionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| Redemption::try_from(row).map_err(LedgerRepositoryError::query))
            .transpose()
    }

    async fn redemptions_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<Redemption>, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RedemptionRow> = redeemed_rewards::table
            .filter(redeemed_rewards::customer_id.eq(customer_id.as_uuid()))
            .filter(redeemed_rewards::merchant_id.eq(merchant_id.as_uuid()))
            .order_by((redeemed_rewards::created_at.desc(), redeemed_rewards::id.desc()))
            .limit(i64::from(limit))
            .select(RedemptionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_redemptions(rows)
    }
}
