//! PostgreSQL-backed `CatalogueRepository`.
//!
//! Offers, steps and both reward kinds. Deleting an offer relies on
//! `ON DELETE CASCADE` for its steps and cursors; deleting a milestone reward
//! relies on `ON DELETE SET NULL` for step references. Shrinking an offer is
//! an explicit transaction.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{CatalogueRepository, CatalogueRepositoryError};
use crate::domain::{
    CheckpointOffer, CheckpointReward, CheckpointRewardId, CheckpointStep, MerchantId, OfferId,
    Reward, RewardId, StepId,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{CheckpointRewardRow, OfferRow, RewardRow, StepRow, to_db_count};
use super::pool::{DbPool, PoolError};
use super::schema::{
    checkpoint_offers, checkpoint_rewards, checkpoint_steps, customer_checkpoints, rewards,
};

/// Diesel-backed catalogue storage.
#[derive(Clone)]
pub struct DieselCatalogueRepository {
    pool: DbPool,
}

impl DieselCatalogueRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CatalogueRepositoryError {
    map_basic_pool_error(error, CatalogueRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> CatalogueRepositoryError {
    map_basic_diesel_error(
        &error,
        CatalogueRepositoryError::query,
        CatalogueRepositoryError::connection,
    )
}

fn convert<R, T>(row: R) -> Result<T, CatalogueRepositoryError>
where
    T: TryFrom<R, Error = String>,
{
    T::try_from(row).map_err(CatalogueRepositoryError::query)
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, CatalogueRepositoryError>
where
    T: TryFrom<R, Error = String>,
{
    rows.into_iter().map(convert).collect()
}

fn step_number(value: u32) -> Result<i32, CatalogueRepositoryError> {
    to_db_count(value, "step_number").map_err(CatalogueRepositoryError::query)
}

/// Overwrite the offer, then drop steps and clamp cursors beyond its length.
async fn update_offer_in_transaction(
    conn: &mut AsyncPgConnection,
    row: &OfferRow,
) -> QueryResult<bool> {
    let updated = diesel::update(checkpoint_offers::table.find(row.id))
        .set(row)
        .execute(conn)
        .await?;
    if updated == 0 {
        return Ok(false);
    }
    diesel::delete(
        checkpoint_steps::table
            .filter(checkpoint_steps::offer_id.eq(row.id))
            .filter(checkpoint_steps::step_number.gt(row.total_steps)),
    )
    .execute(conn)
    .await?;
    diesel::update(
        customer_checkpoints::table
            .filter(customer_checkpoints::offer_id.eq(row.id))
            .filter(customer_checkpoints::current_step.gt(row.total_steps)),
    )
    .set(customer_checkpoints::current_step.eq(row.total_steps))
    .execute(conn)
    .await?;
    Ok(true)
}

#[async_trait]
impl CatalogueRepository for DieselCatalogueRepository {
    async fn offers_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CheckpointOffer>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<OfferRow> = checkpoint_offers::table
            .filter(checkpoint_offers::merchant_id.eq(merchant_id.as_uuid()))
            .order_by((checkpoint_offers::created_at, checkpoint_offers::id))
            .select(OfferRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        convert_all(rows)
    }

    async fn find_offer(
        &self,
        offer_id: &OfferId,
    ) -> Result<Option<CheckpointOffer>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<OfferRow> = checkpoint_offers::table
            .find(offer_id.as_uuid())
            .select(OfferRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(convert).transpose()
    }

    async fn insert_offer(&self, offer: &CheckpointOffer) -> Result<(), CatalogueRepositoryError> {
        let row = OfferRow::try_from(offer).map_err(CatalogueRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(checkpoint_offers::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_offer(
        &self,
        offer: &CheckpointOffer,
    ) -> Result<bool, CatalogueRepositoryError> {
        let row = OfferRow::try_from(offer).map_err(CatalogueRepositoryError::query)?;
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        conn.transaction::<_, DieselError, _>(|conn| {
            async move { update_offer_in_transaction(conn, &row).await }.scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn delete_offer(&self, offer_id: &OfferId) -> Result<bool, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(checkpoint_offers::table.find(offer_id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn steps_for(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<CheckpointStep>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<StepRow> = checkpoint_steps::table
            .filter(checkpoint_steps::offer_id.eq(offer_id.as_uuid()))
            .order_by(checkpoint_steps::step_number)
            .select(StepRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        convert_all(rows)
    }

    async fn find_step(
        &self,
        step_id: &StepId,
    ) -> Result<Option<CheckpointStep>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<StepRow> = checkpoint_steps::table
            .find(step_id.as_uuid())
            .select(StepRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(convert).transpose()
    }

    async fn step_at(
        &self,
        offer_id: &OfferId,
        step_number_value: u32,
    ) -> Result<Option<CheckpointStep>, CatalogueRepositoryError> {
        let number = step_number(step_number_value)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<StepRow> = checkpoint_steps::table
            .filter(checkpoint_steps::offer_id.eq(offer_id.as_uuid()))
            .filter(checkpoint_steps::step_number.eq(number))
            .select(StepRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(convert).transpose()
    }

    async fn upsert_step(
        &self,
        step: &CheckpointStep,
    ) -> Result<CheckpointStep, CatalogueRepositoryError> {
        let row = StepRow::try_from(step).map_err(CatalogueRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored: StepRow = diesel::insert_into(checkpoint_steps::table)
            .values(&row)
            .on_conflict((checkpoint_steps::offer_id, checkpoint_steps::step_number))
            .do_update()
            .set(checkpoint_steps::reward_id.eq(excluded(checkpoint_steps::reward_id)))
            .returning(StepRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        convert(stored)
    }

    async fn delete_step(
        &self,
        offer_id: &OfferId,
        step_number_value: u32,
    ) -> Result<bool, CatalogueRepositoryError> {
        let number = step_number(step_number_value)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            checkpoint_steps::table
                .filter(checkpoint_steps::offer_id.eq(offer_id.as_uuid()))
                .filter(checkpoint_steps::step_number.eq(number)),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn checkpoint_rewards_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CheckpointReward>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CheckpointRewardRow> = checkpoint_rewards::table
            .filter(checkpoint_rewards::merchant_id.eq(merchant_id.as_uuid()))
            .order_by((checkpoint_rewards::name, checkpoint_rewards::id))
            .select(CheckpointRewardRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(CheckpointReward::from).collect())
    }

    async fn find_checkpoint_reward(
        &self,
        reward_id: &CheckpointRewardId,
    ) -> Result<Option<CheckpointReward>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CheckpointRewardRow> = checkpoint_rewards::table
            .find(reward_id.as_uuid())
            .select(CheckpointRewardRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(CheckpointReward::from))
    }

    async fn insert_checkpoint_reward(
        &self,
        reward: &CheckpointReward,
    ) -> Result<(), CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(checkpoint_rewards::table)
            .values(CheckpointRewardRow::from(reward))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_checkpoint_reward(
        &self,
        reward: &CheckpointReward,
    ) -> Result<bool, CatalogueRepositoryError> {
        let row = CheckpointRewardRow::from(reward);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(checkpoint_rewards::table.find(row.id))
            .set(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete_checkpoint_reward(
        &self,
        reward_id: &CheckpointRewardId,
    ) -> Result<bool, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(checkpoint_rewards::table.find(reward_id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn rewards_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<Reward>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RewardRow> = rewards::table
            .filter(rewards::merchant_id.eq(merchant_id.as_uuid()))
            .order_by((rewards::price_coins, rewards::name))
            .select(RewardRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        convert_all(rows)
    }

    async fn find_reward(
        &self,
        reward_id: &RewardId,
    ) -> Result<Option<Reward>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<RewardRow> = rewards::table
            .find(reward_id.as_uuid())
            .select(RewardRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(convert).transpose()
    }

    async fn insert_reward(&self, reward: &Reward) -> Result<(), CatalogueRepositoryError> {
        let row = RewardRow::try_from(reward).map_err(CatalogueRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(rewards::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_reward(&self, reward: &Reward) -> Result<bool, CatalogueRepositoryError> {
        let row = RewardRow::try_from(reward).map_err(CatalogueRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(rewards::table.find(row.id))
            .set(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete_reward(&self, reward_id: &RewardId) -> Result<bool, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(rewards::table.find(reward_id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
