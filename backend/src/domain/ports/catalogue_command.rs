//! Driving port for merchant catalogue management.
//!
//! Every method takes the acting merchant explicitly. Targets owned by a
//! different merchant are reported as not found.

use async_trait::async_trait;

use crate::domain::{
    CheckpointOffer, CheckpointReward, CheckpointRewardId, CheckpointStep, Error, MerchantId,
    OfferId, Reward, RewardId,
};

/// Fields of a checkpoint offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferDraft {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Journey length; must be between 1 and the configured maximum.
    pub total_steps: i64,
}

/// Fields of a milestone reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRewardDraft {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional icon.
    pub icon: Option<String>,
}

/// Fields of a points-priced reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardDraft {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Price in points; must be positive.
    pub price_coins: i64,
    /// Whether the reward can be redeemed.
    pub is_active: bool,
}

/// Attach (or detach) a milestone reward to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetStepRequest {
    /// Acting merchant.
    pub merchant_id: MerchantId,
    /// Offer.
    pub offer_id: OfferId,
    /// Step number in `[1, total_steps]`.
    pub step_number: i64,
    /// Reward granted at the step.
    pub reward_id: Option<CheckpointRewardId>,
}

/// Catalogue mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueCommand: Send + Sync {
    /// Create an offer.
    async fn create_offer(
        &self,
        merchant_id: MerchantId,
        draft: OfferDraft,
    ) -> Result<CheckpointOffer, Error>;

    /// Replace an offer's fields. Shrinking `total_steps` drops the steps
    /// beyond the new length and clamps customer cursors.
    async fn update_offer(
        &self,
        merchant_id: MerchantId,
        offer_id: OfferId,
        draft: OfferDraft,
    ) -> Result<CheckpointOffer, Error>;

    /// Delete an offer with its steps and cursors.
    async fn delete_offer(&self, merchant_id: MerchantId, offer_id: OfferId) -> Result<(), Error>;

    /// Create or replace a step.
    async fn set_step(&self, request: SetStepRequest) -> Result<CheckpointStep, Error>;

    /// Remove a step.
    async fn clear_step(
        &self,
        merchant_id: MerchantId,
        offer_id: OfferId,
        step_number: i64,
    ) -> Result<(), Error>;

    /// Create a milestone reward.
    async fn create_checkpoint_reward(
        &self,
        merchant_id: MerchantId,
        draft: CheckpointRewardDraft,
    ) -> Result<CheckpointReward, Error>;

    /// Replace a milestone reward's fields.
    async fn update_checkpoint_reward(
        &self,
        merchant_id: MerchantId,
        reward_id: CheckpointRewardId,
        draft: CheckpointRewardDraft,
    ) -> Result<CheckpointReward, Error>;

    /// Delete a milestone reward, detaching it from every step.
    async fn delete_checkpoint_reward(
        &self,
        merchant_id: MerchantId,
        reward_id: CheckpointRewardId,
    ) -> Result<(), Error>;

    /// Create a points-priced reward.
    async fn create_reward(
        &self,
        merchant_id: MerchantId,
        draft: RewardDraft,
    ) -> Result<Reward, Error>;

    /// Replace a points-priced reward's fields.
    async fn update_reward(
        &self,
        merchant_id: MerchantId,
        reward_id: RewardId,
        draft: RewardDraft,
    ) -> Result<Reward, Error>;

    /// Delete a points-priced reward.
    async fn delete_reward(&self, merchant_id: MerchantId, reward_id: RewardId)
    -> Result<(), Error>;
}
