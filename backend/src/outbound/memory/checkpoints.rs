//! Checkpoint cursor storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{InMemoryStore, newest_first};
use crate::domain::ports::{CheckpointRepository, CheckpointRepositoryError};
use crate::domain::{
    AdvancementId, CheckpointAdvancement, CheckpointKey, CheckpointRedemption, CursorMovement,
    CursorTransition, CustomerCheckpoint, CustomerId, MerchantId, StepCursor,
};

fn cursor(current: u32, total: u32) -> Result<StepCursor, CheckpointRepositoryError> {
    StepCursor::clamped(current, total)
        .map_err(|err| CheckpointRepositoryError::query(err.to_string()))
}

#[async_trait]
impl CheckpointRepository for InMemoryStore {
    async fn move_cursor(
        &self,
        key: &CheckpointKey,
        movement: CursorMovement,
        at: DateTime<Utc>,
    ) -> Result<CursorTransition, CheckpointRepositoryError> {
        let mut inner = self.lock().await;
        let total_steps = inner
            .offers
            .iter()
            .find(|offer| offer.id == key.offer_id && offer.merchant_id == key.merchant_id)
            .map(|offer| offer.total_steps)
            .ok_or_else(CheckpointRepositoryError::offer_missing)?;

        let position = inner.cursors.iter().position(|row| {
            row.customer_id == key.customer_id
                && row.merchant_id == key.merchant_id
                && row.offer_id == key.offer_id
        });
        let (index, created) = match (position, movement) {
            (Some(index), _) => (index, false),
            (None, CursorMovement::Rewind) => {
                return Err(CheckpointRepositoryError::missing_cursor());
            }
            (None, CursorMovement::Advance) => {
                inner.cursors.push(CustomerCheckpoint {
                    customer_id: key.customer_id,
                    merchant_id: key.merchant_id,
                    offer_id: key.offer_id,
                    current_step: 0,
                    updated_at: at,
                });
                (inner.cursors.len() - 1, true)
            }
        };

        let row = inner
            .cursors
            .get_mut(index)
            .ok_or_else(|| CheckpointRepositoryError::query("cursor row vanished"))?;
        let previous = cursor(row.current_step, total_steps)?;
        let current = previous.apply(movement);
        row.current_step = current.current_step();
        row.updated_at = at;

        if movement == CursorMovement::Advance {
            inner.advancements.push(CheckpointAdvancement {
                id: AdvancementId::random(),
                customer_id: key.customer_id,
                merchant_id: key.merchant_id,
                offer_id: key.offer_id,
                step_reached: current.current_step(),
                total_steps,
                created_at: at,
            });
        }
        Ok(CursorTransition {
            previous,
            current,
            created,
        })
    }

    async fn cursors_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CustomerCheckpoint>, CheckpointRepositoryError> {
        Ok(self
            .lock()
            .await
            .cursors
            .iter()
            .filter(|row| row.customer_id == *customer_id && row.merchant_id == *merchant_id)
            .cloned()
            .collect())
    }

    async fn advancements_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<CheckpointAdvancement>, CheckpointRepositoryError> {
        let inner = self.lock().await;
        Ok(newest_first(
            inner
                .advancements
                .iter()
                .filter(|row| row.customer_id == *customer_id && row.merchant_id == *merchant_id)
                .cloned(),
            limit,
        ))
    }

    async fn insert_checkpoint_redemption(
        &self,
        redemption: &CheckpointRedemption,
    ) -> Result<(), CheckpointRepositoryError> {
        self.lock()
            .await
            .checkpoint_redemptions
            .push(redemption.clone());
        Ok(())
    }

    async fn checkpoint_redemptions_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
        limit: u32,
    ) -> Result<Vec<CheckpointRedemption>, CheckpointRepositoryError> {
        let inner = self.lock().await;
        Ok(newest_first(
            inner
                .checkpoint_redemptions
                .iter()
                .filter(|row| row.customer_id == *customer_id && row.merchant_id == *merchant_id)
                .cloned(),
            limit,
        ))
    }
}
