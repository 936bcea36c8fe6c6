//! Driving port for redeeming rewards.

use async_trait::async_trait;

use crate::domain::{
    CheckpointRedemption, CheckpointRewardId, CustomerId, Error, MerchantId, Redemption,
    RedemptionKey, RedemptionStatus, RewardId, StepId,
};

/// Redeem a points-priced reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemRewardRequest {
    /// Merchant the reward must belong to.
    pub merchant_id: MerchantId,
    /// Redeeming customer.
    pub customer_id: CustomerId,
    /// Reward.
    pub reward_id: RewardId,
    /// Amount the client believes it is spending; must match the price.
    pub points_spent: Option<i64>,
    /// Initial status; `pending` when omitted.
    pub status: Option<RedemptionStatus>,
    /// Makes retries safe.
    pub idempotency_key: Option<RedemptionKey>,
}

/// Outcome of a points redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemRewardResponse {
    /// Stored redemption.
    pub redemption: Redemption,
    /// `true` when an earlier redemption with the same key was returned and
    /// nothing new was written.
    pub replayed: bool,
}

/// Redeem a milestone reward reached through a checkpoint step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemCheckpointRewardRequest {
    /// Merchant.
    pub merchant_id: MerchantId,
    /// Customer.
    pub customer_id: CustomerId,
    /// Milestone reward.
    pub reward_id: CheckpointRewardId,
    /// Step carrying the reward.
    pub step_id: StepId,
}

/// Redemption use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedemptionCommand: Send + Sync {
    /// Debit the reward's price and record the redemption atomically.
    async fn redeem_reward(&self, request: RedeemRewardRequest)
    -> Result<RedeemRewardResponse, Error>;

    /// Record a milestone redemption. No points move.
    async fn redeem_checkpoint_reward(
        &self,
        request: RedeemCheckpointRewardRequest,
    ) -> Result<CheckpointRedemption, Error>;
}
