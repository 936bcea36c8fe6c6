//! PostgreSQL-backed `MerchantRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{MerchantRepository, MerchantRepositoryError};
use crate::domain::{Merchant, MerchantId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::MerchantRow;
use super::pool::{DbPool, PoolError};
use super::schema::merchants;

/// Diesel-backed merchant lookups.
#[derive(Clone)]
pub struct DieselMerchantRepository {
    pool: DbPool,
}

impl DieselMerchantRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> MerchantRepositoryError {
    map_basic_pool_error(error, MerchantRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> MerchantRepositoryError {
    map_basic_diesel_error(
        &error,
        MerchantRepositoryError::query,
        MerchantRepositoryError::connection,
    )
}

#[async_trait]
impl MerchantRepository for DieselMerchantRepository {
    async fn find_merchant(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Option<Merchant>, MerchantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MerchantRow> = merchants::table
            .find(merchant_id.as_uuid())
            .select(MerchantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Merchant::from))
    }

    async fn list_merchants(&self) -> Result<Vec<Merchant>, MerchantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MerchantRow> = merchants::table
            .select(MerchantRow::as_select())
            .order_by((merchants::name, merchants::id))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(Merchant::from).collect())
    }
}
