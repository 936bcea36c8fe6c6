//! Catalogue storage: offers, steps and both reward kinds.

use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::ports::{CatalogueRepository, CatalogueRepositoryError};
use crate::domain::{
    CheckpointOffer, CheckpointReward, CheckpointRewardId, CheckpointStep, MerchantId, OfferId,
    Reward, RewardId, StepId,
};

/// Replace the row matching `is_target`, reporting whether one existed.
fn replace<T: Clone>(rows: &mut [T], is_target: impl Fn(&T) -> bool, value: &T) -> bool {
    match rows.iter_mut().find(|row| is_target(row)) {
        Some(row) => {
            *row = value.clone();
            true
        }
        None => false,
    }
}

/// Remove every row matching `is_target`, reporting whether any existed.
fn remove<T>(rows: &mut Vec<T>, is_target: impl Fn(&T) -> bool) -> bool {
    let before = rows.len();
    rows.retain(|row| !is_target(row));
    rows.len() != before
}

#[async_trait]
impl CatalogueRepository for InMemoryStore {
    async fn offers_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CheckpointOffer>, CatalogueRepositoryError> {
        let mut offers: Vec<_> = self
            .lock()
            .await
            .offers
            .iter()
            .filter(|offer| offer.merchant_id == *merchant_id)
            .cloned()
            .collect();
        offers.sort_by_key(|offer| offer.created_at);
        Ok(offers)
    }

    async fn find_offer(
        &self,
        offer_id: &OfferId,
    ) -> Result<Option<CheckpointOffer>, CatalogueRepositoryError> {
        Ok(self
            .lock()
            .await
            .offers
            .iter()
            .find(|offer| offer.id == *offer_id)
            .cloned())
    }

    async fn insert_offer(&self, offer: &CheckpointOffer) -> Result<(), CatalogueRepositoryError> {
        self.lock().await.offers.push(offer.clone());
        Ok(())
    }

    async fn update_offer(
        &self,
        offer: &CheckpointOffer,
    ) -> Result<bool, CatalogueRepositoryError> {
        let mut inner = self.lock().await;
        if !replace(&mut inner.offers, |row| row.id == offer.id, offer) {
            return Ok(false);
        }
        inner
            .steps
            .retain(|step| step.offer_id != offer.id || step.step_number <= offer.total_steps);
        for cursor in inner
            .cursors
            .iter_mut()
            .filter(|cursor| cursor.offer_id == offer.id)
        {
            cursor.current_step = cursor.current_step.min(offer.total_steps);
        }
        Ok(true)
    }

    async fn delete_offer(&self, offer_id: &OfferId) -> Result<bool, CatalogueRepositoryError> {
        let mut inner = self.lock().await;
        if !remove(&mut inner.offers, |offer| offer.id == *offer_id) {
            return Ok(false);
        }
        inner.steps.retain(|step| step.offer_id != *offer_id);
        inner.cursors.retain(|cursor| cursor.offer_id != *offer_id);
        Ok(true)
    }

    async fn steps_for(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<CheckpointStep>, CatalogueRepositoryError> {
        let mut steps: Vec<_> = self
            .lock()
            .await
            .steps
            .iter()
            .filter(|step| step.offer_id == *offer_id)
            .cloned()
            .collect();
        steps.sort_by_key(|step| step.step_number);
        Ok(steps)
    }

    async fn find_step(
        &self,
        step_id: &StepId,
    ) -> Result<Option<CheckpointStep>, CatalogueRepositoryError> {
        Ok(self
            .lock()
            .await
            .steps
            .iter()
            .find(|step| step.id == *step_id)
            .cloned())
    }

    async fn step_at(
        &self,
        offer_id: &OfferId,
        step_number: u32,
    ) -> Result<Option<CheckpointStep>, CatalogueRepositoryError> {
        Ok(self
            .lock()
            .await
            .steps
            .iter()
            .find(|step| step.offer_id == *offer_id && step.step_number == step_number)
            .cloned())
    }

    async fn upsert_step(
        &self,
        step: &CheckpointStep,
    ) -> Result<CheckpointStep, CatalogueRepositoryError> {
        let mut inner = self.lock().await;
        if let Some(existing) = inner
            .steps
            .iter_mut()
            .find(|row| row.offer_id == step.offer_id && row.step_number == step.step_number)
        {
            existing.reward_id = step.reward_id;
            return Ok(existing.clone());
        }
        inner.steps.push(step.clone());
        Ok(step.clone())
    }

    async fn delete_step(
        &self,
        offer_id: &OfferId,
        step_number: u32,
    ) -> Result<bool, CatalogueRepositoryError> {
        Ok(remove(&mut self.lock().await.steps, |step| {
            step.offer_id == *offer_id && step.step_number == step_number
        }))
    }

    async fn checkpoint_rewards_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CheckpointReward>, CatalogueRepositoryError> {
        let mut rewards: Vec<_> = self
            .lock()
            .await
            .checkpoint_rewards
            .iter()
            .filter(|reward| reward.merchant_id == *merchant_id)
            .cloned()
            .collect();
        rewards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rewards)
    }

    async fn find_checkpoint_reward(
        &self,
        reward_id: &CheckpointRewardId,
    ) -> Result<Option<CheckpointReward>, CatalogueRepositoryError> {
        Ok(self
            .lock()
            .await
            .checkpoint_rewards
            .iter()
            .find(|reward| reward.id == *reward_id)
            .cloned())
    }

    async fn insert_checkpoint_reward(
        &self,
        reward: &CheckpointReward,
    ) -> Result<(), CatalogueRepositoryError> {
        self.lock().await.checkpoint_rewards.push(reward.clone());
        Ok(())
    }

    async fn update_checkpoint_reward(
        &self,
        reward: &CheckpointReward,
    ) -> Result<bool, CatalogueRepositoryError> {
        Ok(replace(
            &mut self.lock().await.checkpoint_rewards,
            |row| row.id == reward.id,
            reward,
        ))
    }

    async fn delete_checkpoint_reward(
        &self,
        reward_id: &CheckpointRewardId,
    ) -> Result<bool, CatalogueRepositoryError> {
        let mut inner = self.lock().await;
        if !remove(&mut inner.checkpoint_rewards, |reward| {
            reward.id == *reward_id
        }) {
            return Ok(false);
        }
        for step in inner
            .steps
            .iter_mut()
            .filter(|step| step.reward_id == Some(*reward_id))
        {
            step.reward_id = None;
        }
        Ok(true)
    }

    async fn rewards_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<Reward>, CatalogueRepositoryError> {
        let mut rewards: Vec<_> = self
            .lock()
            .await
            .rewards
            .iter()
            .filter(|reward| reward.merchant_id == *merchant_id)
            .cloned()
            .collect();
        rewards.sort_by(|a, b| {
            a.price_coins
                .cmp(&b.price_coins)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rewards)
    }

    async fn find_reward(
        &self,
        reward_id: &RewardId,
    ) -> Result<Option<Reward>, CatalogueRepositoryError> {
        Ok(self
            .lock()
            .await
            .rewards
            .iter()
            .find(|reward| reward.id == *reward_id)
            .cloned())
    }

    async fn insert_reward(&self, reward: &Reward) -> Result<(), CatalogueRepositoryError> {
        self.lock().await.rewards.push(reward.clone());
        Ok(())
    }

    async fn update_reward(&self, reward: &Reward) -> Result<bool, CatalogueRepositoryError> {
        Ok(replace(
            &mut self.lock().await.rewards,
            |row| row.id == reward.id,
            reward,
        ))
    }

    async fn delete_reward(&self, reward_id: &RewardId) -> Result<bool, CatalogueRepositoryError> {
        Ok(remove(&mut self.lock().await.rewards, |reward| {
            reward.id == *reward_id
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    use crate::domain::ports::CheckpointRepository;
    use crate::domain::{CheckpointKey, CursorMovement, CustomerId};

    fn offer(merchant_id: MerchantId, total_steps: u32, minute: u32) -> CheckpointOffer {
        CheckpointOffer {
            id: OfferId::random(),
            merchant_id,
            name: format!("offer {minute}"),
            description: None,
            total_steps,
            created_at: Utc
                .with_ymd_and_hms(2026, 1, 1, 9, minute, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn step(offer_id: OfferId, step_number: u32, reward_id: Option<CheckpointRewardId>) -> CheckpointStep {
        CheckpointStep {
            id: StepId::random(),
            offer_id,
            step_number,
            reward_id,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn offers_are_listed_oldest_first() {
        let store = InMemoryStore::new();
        let merchant = MerchantId::random();
        let late = offer(merchant, 3, 30);
        let early = offer(merchant, 5, 10);
        store.insert_offer(&late).await.expect("insert");
        store.insert_offer(&early).await.expect("insert");
        store
            .insert_offer(&offer(MerchantId::random(), 2, 0))
            .await
            .expect("insert");

        let offers = store.offers_for(&merchant).await.expect("offers");
        let ids: Vec<_> = offers.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[rstest]
    #[tokio::test]
    async fn shrinking_an_offer_drops_steps_and_clamps_cursors() {
        let store = InMemoryStore::new();
        let merchant = MerchantId::random();
        let mut journey = offer(merchant, 5, 0);
        store.insert_offer(&journey).await.expect("insert");
        for number in [2, 4, 5] {
            store
                .upsert_step(&step(journey.id, number, None))
                .await
                .expect("step");
        }
        let key = CheckpointKey {
            customer_id: CustomerId::random(),
            merchant_id: merchant,
            offer_id: journey.id,
        };
        for _ in 0..4 {
            store
                .move_cursor(&key, CursorMovement::Advance, journey.created_at)
                .await
                .expect("advance");
        }

        journey.total_steps = 3;
        assert!(store.update_offer(&journey).await.expect("update"));

        let numbers: Vec<_> = store
            .steps_for(&journey.id)
            .await
            .expect("steps")
            .iter()
            .map(|s| s.step_number)
            .collect();
        assert_eq!(numbers, vec![2]);
        let cursors = store
            .cursors_for(&key.customer_id, &merchant)
            .await
            .expect("cursors");
        assert_eq!(cursors.first().map(|c| c.current_step), Some(3));
    }

    #[rstest]
    #[tokio::test]
    async fn upsert_replaces_reward_on_existing_step() {
        let store = InMemoryStore::new();
        let journey = offer(MerchantId::random(), 4, 0);
        let first = step(journey.id, 2, None);
        store.upsert_step(&first).await.expect("insert");
        let reward = CheckpointRewardId::random();

        let stored = store
            .upsert_step(&step(journey.id, 2, Some(reward)))
            .await
            .expect("upsert");

        assert_eq!(stored.id, first.id);
        assert_eq!(stored.reward_id, Some(reward));
        assert_eq!(store.steps_for(&journey.id).await.expect("steps").len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_a_checkpoint_reward_clears_step_references() {
        let store = InMemoryStore::new();
        let merchant = MerchantId::random();
        let reward = CheckpointReward {
            id: CheckpointRewardId::random(),
            merchant_id: merchant,
            name: "Free muffin".into(),
            description: None,
            icon: None,
        };
        store.insert_checkpoint_reward(&reward).await.expect("reward");
        let journey = offer(merchant, 3, 0);
        let rewarded = step(journey.id, 3, Some(reward.id));
        store.upsert_step(&rewarded).await.expect("step");

        assert!(store.delete_checkpoint_reward(&reward.id).await.expect("delete"));
        assert!(!store.delete_checkpoint_reward(&reward.id).await.expect("delete"));

        let kept = store.find_step(&rewarded.id).await.expect("find");
        assert_eq!(kept.and_then(|s| s.reward_id), None);
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_an_offer_removes_its_steps() {
        let store = InMemoryStore::new();
        let journey = offer(MerchantId::random(), 3, 0);
        store.insert_offer(&journey).await.expect("insert");
        store
            .upsert_step(&step(journey.id, 1, None))
            .await
            .expect("step");

        assert!(store.delete_offer(&journey.id).await.expect("delete"));
        assert!(store.steps_for(&journey.id).await.expect("steps").is_empty());
        assert!(store.find_offer(&journey.id).await.expect("find").is_none());
    }
}
