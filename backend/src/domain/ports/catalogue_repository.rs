//! Port for the merchant catalogue: offers, steps and both reward kinds.

use async_trait::async_trait;

use crate::domain::{
    CheckpointOffer, CheckpointReward, CheckpointRewardId, CheckpointStep, MerchantId, OfferId,
    Reward, RewardId, StepId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalogue repository adapters.
    pub enum CatalogueRepositoryError {
        /// Store unreachable or pool exhausted.
        Connection { message: String } =>
            "catalogue repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "catalogue repository query failed: {message}",
    }
}

/// Storage for catalogue entities.
///
/// Update and delete methods return `false` when the target row does not
/// exist. Ownership checks happen in the service before calling them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueRepository: Send + Sync {
    /// A merchant's offers, oldest first.
    async fn offers_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CheckpointOffer>, CatalogueRepositoryError>;

    /// Fetch an offer by id.
    async fn find_offer(
        &self,
        offer_id: &OfferId,
    ) -> Result<Option<CheckpointOffer>, CatalogueRepositoryError>;

    /// Persist a new offer.
    async fn insert_offer(&self, offer: &CheckpointOffer) -> Result<(), CatalogueRepositoryError>;

    /// Overwrite an offer. When `total_steps` shrinks, steps numbered above
    /// the new total are deleted and cursors beyond it are clamped, in the
    /// same transaction.
    async fn update_offer(&self, offer: &CheckpointOffer)
    -> Result<bool, CatalogueRepositoryError>;

    /// Delete an offer with its steps and cursors. History rows are kept.
    async fn delete_offer(&self, offer_id: &OfferId) -> Result<bool, CatalogueRepositoryError>;

    /// Steps of an offer ordered by step number.
    async fn steps_for(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<CheckpointStep>, CatalogueRepositoryError>;

    /// Fetch a step by id.
    async fn find_step(
        &self,
        step_id: &StepId,
    ) -> Result<Option<CheckpointStep>, CatalogueRepositoryError>;

    /// Fetch the step at `step_number` of an offer.
    async fn step_at(
        &self,
        offer_id: &OfferId,
        step_number: u32,
    ) -> Result<Option<CheckpointStep>, CatalogueRepositoryError>;

    /// Insert the step or replace the reward of the existing step with the
    /// same number. Returns the stored row.
    async fn upsert_step(
        &self,
        step: &CheckpointStep,
    ) -> Result<CheckpointStep, CatalogueRepositoryError>;

    /// Remove the step at `step_number`.
    async fn delete_step(
        &self,
        offer_id: &OfferId,
        step_number: u32,
    ) -> Result<bool, CatalogueRepositoryError>;

    /// A merchant's milestone rewards ordered by name.
    async fn checkpoint_rewards_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CheckpointReward>, CatalogueRepositoryError>;

    /// Fetch a milestone reward by id.
    async fn find_checkpoint_reward(
        &self,
        reward_id: &CheckpointRewardId,
    ) -> Result<Option<CheckpointReward>, CatalogueRepositoryError>;

    /// Persist a new milestone reward.
    async fn insert_checkpoint_reward(
        &self,
        reward: &CheckpointReward,
    ) -> Result<(), CatalogueRepositoryError>;

    /// Overwrite a milestone reward.
    async fn update_checkpoint_reward(
        &self,
        reward: &CheckpointReward,
    ) -> Result<bool, CatalogueRepositoryError>;

    /// Delete a milestone reward and clear every step reference to it in the
    /// same transaction.
    async fn delete_checkpoint_reward(
        &self,
        reward_id: &CheckpointRewardId,
    ) -> Result<bool, CatalogueRepositoryError>;

    /// A merchant's points-priced rewards ordered by price then name.
    async fn rewards_for(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<Reward>, CatalogueRepositoryError>;

    /// Fetch a points-priced reward by id.
    async fn find_reward(
        &self,
        reward_id: &RewardId,
    ) -> Result<Option<Reward>, CatalogueRepositoryError>;

    /// Persist a new points-priced reward.
    async fn insert_reward(&self, reward: &Reward) -> Result<(), CatalogueRepositoryError>;

    /// Overwrite a points-priced reward.
    async fn update_reward(&self, reward: &Reward) -> Result<bool, CatalogueRepositoryError>;

    /// Delete a points-priced reward. Redemption history is kept.
    async fn delete_reward(&self, reward_id: &RewardId) -> Result<bool, CatalogueRepositoryError>;
}
