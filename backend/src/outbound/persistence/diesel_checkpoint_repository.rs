//! PostgreSQL-backed `CheckpointRepository`.
//!
//! Cursor moves are a single transaction: the cursor row is created if an
//! advance needs it, locked with `SELECT ... FOR UPDATE`, moved with
//! [`StepCursor`] against the offer's current length and, for advances,
//! audited.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{CheckpointRepository, CheckpointRepositoryError};
use crate::domain::{
    CheckpointAdvancement, CheckpointKey, CheckpointRedemption, CursorMovement, CursorTransition,
    CustomerCheckpoint, CustomerId, MerchantId, StepCursor,
};

use super::diesel_basic_error_mapping::{
    is_transient, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{AdvancementRow, CheckpointRedemptionRow, CursorRow, to_count, to_db_count};
use super::pool::{DbPool, PoolError};
use super::retry::retry_transient;
use super::schema::{
    checkpoint_advancements, checkpoint_offers, customer_checkpoints, redeemed_checkpoint_rewards,
};

/// Diesel-backed cursor storage.
#[derive(Clone)]
pub struct DieselCheckpointRepository {
    pool: DbPool,
}

impl DieselCheckpointRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CheckpointRepositoryError {
    map_basic_pool_error(error, CheckpointRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> CheckpointRepositoryError {
    map_basic_diesel_error(
        &error,
        CheckpointRepositoryError::query,
        CheckpointRepositoryError::connection,
    )
}

#[derive(Debug)]
enum MoveError {
    Pool(PoolError),
    Diesel(DieselError),
    OfferMissing,
    MissingCursor,
    Corrupt(String),
}

impl From<DieselError> for MoveError {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

impl MoveError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Diesel(err) if is_transient(err))
    }
}

impl From<MoveError> for CheckpointRepositoryError {
    fn from(error: MoveError) -> Self {
        match error {
            MoveError::Pool(err) => map_pool_error(err),
            MoveError::Diesel(err) => map_diesel_error(err),
            MoveError::OfferMissing => Self::offer_missing(),
            MoveError::MissingCursor => Self::missing_cursor(),
            MoveError::Corrupt(message) => Self::query(message),
        }
    }
}

#[derive(Clone, Copy)]
struct MoveRequest {
    customer_id: Uuid,
    merchant_id: Uuid,
    offer_id: Uuid,
    movement: CursorMovement,
    at: DateTime<Utc>,
}

async fn move_in_transaction(
    conn: &mut AsyncPgConnection,
    request: MoveRequest,
) -> Result<CursorTransition, MoveError> {
    let total: Option<i32> = checkpoint_offers::table
        .filter(checkpoint_offers::id.eq(request.offer_id))
        .filter(checkpoint_offers::merchant_id.eq(request.merchant_id))
        .select(checkpoint_offers::total_steps)
        .first(conn)
        .await
        .optional()?;
    let total = to_count(total.ok_or(MoveError::OfferMissing)?, "total_steps")
        .map_err(MoveError::Corrupt)?;

    let created = if request.movement == CursorMovement::Advance {
        let inserted = diesel::insert_into(customer_checkpoints::table)
            .values(CursorRow {
                customer_id: request.customer_id,
                merchant_id: request.merchant_id,
                offer_id: request.offer_id,
                current_step: 0,
                updated_at: request.at,
            })
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        inserted == 1
    } else {
        false
    };

    let key = (request.customer_id, request.merchant_id, request.offer_id);
    let stored: Option<i32> = customer_checkpoints::table
        .find(key)
        .select(customer_checkpoints::current_step)
        .for_update()
        .first(conn)
        .await
        .optional()?;
    let stored = to_count(stored.ok_or(MoveError::MissingCursor)?, "current_step")
        .map_err(MoveError::Corrupt)?;

    let previous =
        StepCursor::clamped(stored, total).map_err(|err| MoveError::Corrupt(err.to_string()))?;
    let current = previous.apply(request.movement);
    let step = to_db_count(current.current_step(), "current_step").map_err(MoveError::Corrupt)?;

    diesel::update(customer_checkpoints::table.find(key))
        .set((
            customer_checkpoints::current_step.eq(step),
            customer_checkpoints::updated_at.eq(request.at),
        ))
        .execute(conn)
        .await?;

    if request.movement == CursorMovement::Advance {
        diesel::insert_into(checkpoint_advancements::table)
            .values(AdvancementRow {
                id: Uuid::new_v4(),
                customer_id: request.customer_id,
                merchant_id: request.merchant_id,
                offer_id: request.offer_id,
                step_reached: step,
                total_steps: to_db_count(total, "total_steps").map_err(MoveError::Corrupt)?,
                created_at: request.at,
            })
            .execute(conn)
            .await?;
    }

    Ok(CursorTransition {
        previous,
        current,
        created,
    })
}

impl DieselCheckpointRepository {
    async fn move_once(&self, request: MoveRequest) -> Result<CursorTransition, MoveError> {
        let mut pooled = self.pool.get().await.map_err(MoveError::Pool)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        conn.transaction::<_, MoveError, _>(|conn| {
            async move { move_in_transaction(conn, request).await }.scope_boxed()
        })
        .await
    }
}

fn into_domain<R, T>(rows: Vec<R>) -> Result<Vec<T>, CheckpointRepositoryError>
where
    T: TryFrom<R, Error = String>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(CheckpointRepositoryError::query))
        .collect()
}

#[async_trait]
impl CheckpointRepository for DieselCheckpointRepository {
    async fn move_cursor(
        &self,
        key: &CheckpointKey,
        movement: CursorMovement,
        at: DateTime<Utc>,
    ) -> Result<CursorTransition, CheckpointRepositoryError> {
        let request = MoveRequest {
            customer_id: *key.customer_id.as_uuid(),
            merchant_id: *key.merchant_id.as_uuid(),
            offer_id: *key.offer_id.as_uuid(),
            movement,
            at,
        };
        retry_transient("move_cursor", MoveError::is_transient, move || {
            self.move_once(request)
        })
        .await
        .map_err(CheckpointRepositoryError::from)
    }

    async fn cursors_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CustomerCheckpoint>, CheckpointRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CursorRow> = customer_checkpoints::table
            .filter(customer_checkpoints::customer_id.eq(customer_id.as_uuid()))
            .filter(customer_checkpoints::merchant_id.eq(merchant_id.as_uuid()))
            .select(CursorRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_domain(rows)
    }

    async fn advancements_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<CheckpointAdvancement>, CheckpointRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<AdvancementRow> = checkpoint_advancements::table
            .filter(checkpoint_advancements::customer_id.eq(customer_id.as_uuid()))
            .filter(checkpoint_advancements::merchant_id.eq(merchant_id.as_uuid()))
            .order_by((
                checkpoint_advancements::created_at.desc(),
                checkpoint_advancements::id.desc(),
            ))
            .limit(i64::from(limit))
            .select(AdvancementRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_domain(rows)
    }

    async fn insert_checkpoint_redemption(
        &self,
        redemption: &CheckpointRedemption,
    ) -> Result<(), CheckpointRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(redeemed_checkpoint_rewards::table)
            .values(CheckpointRedemptionRow::from(redemption))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn checkpoint_redemptions_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<CheckpointRedemption>, CheckpointRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CheckpointRedemptionRow> = redeemed_checkpoint_rewards::table
            .filter(redeemed_checkpoint_rewards::customer_id.eq(customer_id.as_uuid()))
            .filter(redeemed_checkpoint_rewards::merchant_id.eq(merchant_id.as_uuid()))
            .order_by((
                redeemed_checkpoint_rewards::created_at.desc(),
                redeemed_checkpoint_rewards::id.desc(),
            ))
            .limit(i64::from(limit))
            .select(CheckpointRedemptionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_domain(rows)
    }
}
