//! Driving port for reading merchant catalogues.

use async_trait::async_trait;

use crate::domain::{
    CardId, CheckpointReward, CustomerCatalogue, Error, MerchantCatalogue, MerchantId,
    OfferWithSteps, Reward,
};

/// A merchant's checkpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantCheckpoints {
    /// Offers with steps, oldest first.
    pub offers: Vec<OfferWithSteps>,
    /// Milestone rewards.
    pub rewards: Vec<CheckpointReward>,
}

/// Catalogue reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueQuery: Send + Sync {
    /// Public catalogue of every merchant: metadata, active rewards and
    /// offers with steps.
    async fn list_merchants(&self) -> Result<Vec<MerchantCatalogue>, Error>;

    /// All points-priced rewards of a merchant, including inactive ones.
    async fn merchant_rewards(&self, merchant_id: MerchantId) -> Result<Vec<Reward>, Error>;

    /// Offers, steps and milestone rewards of a merchant.
    async fn merchant_checkpoints(
        &self,
        merchant_id: MerchantId,
    ) -> Result<MerchantCheckpoints, Error>;

    /// The merchant's catalogue with the card's balance and progress.
    async fn rewards_and_checkpoints(
        &self,
        merchant_id: MerchantId,
        card_id: CardId,
    ) -> Result<CustomerCatalogue, Error>;
}
