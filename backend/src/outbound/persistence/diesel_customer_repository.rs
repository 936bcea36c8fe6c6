//! PostgreSQL-backed `CustomerRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{CustomerRepository, CustomerRepositoryError};
use crate::domain::{Card, CardId, CardUid, Customer, CustomerId};

use super::diesel_basic_error_mapping::{
    is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{CardRow, CustomerRow, NewCardMerchantRow};
use super::pool::{DbPool, PoolError};
use super::schema::{card_merchants, cards, customers};

/// Unique constraint on `cards.uid`.
const CARD_UID_CONSTRAINT: &str = "cards_uid_key";

/// Diesel-backed customer and card storage.
#[derive(Clone)]
pub struct DieselCustomerRepository {
    pool: DbPool,
}

impl DieselCustomerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CustomerRepositoryError {
    map_basic_pool_error(error, CustomerRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CustomerRepositoryError {
    map_basic_diesel_error(
        &error,
        CustomerRepositoryError::query,
        CustomerRepositoryError::connection,
    )
}

fn into_card(row: CardRow) -> Result<Card, CustomerRepositoryError> {
    Card::try_from(row).map_err(CustomerRepositoryError::query)
}

#[async_trait]
impl CustomerRepository for DieselCustomerRepository {
    async fn insert_customer(&self, customer: &Customer) -> Result<(), CustomerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(customers::table)
            .values(CustomerRow::from(customer))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Customer>, CustomerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CustomerRow> = customers::table
            .find(customer_id.as_uuid())
            .select(CustomerRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Customer::from))
    }

    async fn insert_card(&self, card: &Card) -> Result<(), CustomerRepositoryError> {
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let row = CardRow::from(card);
        let association = NewCardMerchantRow {
            id: Uuid::new_v4(),
            card_id: row.id,
            merchant_id: row.issuing_merchant_id,
        };
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                diesel::insert_into(cards::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(card_merchants::table)
                    .values(&association)
                    .on_conflict((card_merchants::card_id, card_merchants::merchant_id))
                    .do_nothing()
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| {
            if is_unique_violation(&err, CARD_UID_CONSTRAINT) {
                CustomerRepositoryError::uid_taken(card.uid.to_string())
            } else {
                map_diesel_error(err)
            }
        })
    }

    async fn find_card(&self, card_id: &CardId) -> Result<Option<Card>, CustomerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CardRow> = cards::table
            .find(card_id.as_uuid())
            .select(CardRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(into_card).transpose()
    }

    async fn find_card_by_uid(
        &self,
        uid: &CardUid,
    ) -> Result<Option<Card>, CustomerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CardRow> = cards::table
            .filter(cards::uid.eq(uid.as_ref()))
            .select(CardRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(into_card).transpose()
    }

    async fn primary_card_for(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Card>, CustomerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CardRow> = cards::table
            .filter(cards::customer_id.eq(customer_id.as_uuid()))
            .order_by((cards::created_at, cards::id))
            .select(CardRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(into_card).transpose()
    }
}
