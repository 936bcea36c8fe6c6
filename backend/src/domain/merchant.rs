//! Merchants (tenants) and their public catalogue.

use serde::{Deserialize, Serialize};

use super::checkpoint::{CheckpointProgress, CheckpointReward, OfferWithSteps};
use super::ids::MerchantId;
use super::rewards::Reward;

/// Merchant metadata. Managed by the dashboard; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    /// Merchant identifier.
    pub id: MerchantId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional logo URL.
    pub logo_url: Option<String>,
}

/// Everything a merchant offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantCatalogue {
    /// Merchant metadata.
    pub merchant: Merchant,
    /// Points-priced rewards.
    pub rewards: Vec<Reward>,
    /// Milestone rewards.
    pub checkpoint_rewards: Vec<CheckpointReward>,
    /// Offers with their steps, oldest first.
    pub offers: Vec<OfferWithSteps>,
}

/// A merchant's catalogue as seen by one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerCatalogue {
    /// Catalogue.
    pub catalogue: MerchantCatalogue,
    /// Card balance at the merchant.
    pub balance: i64,
    /// Progress per offer.
    pub progress: Vec<CheckpointProgress>,
}
