//! Response payloads shared by several handler modules.
//!
//! Domain entities do not derive `Serialize` in an API-stable shape, so every
//! endpoint maps them into these camelCase DTOs. Identifiers are rendered as
//! UUID strings and timestamps as RFC 3339.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    Card, CheckpointAdvancement, CheckpointOffer, CheckpointProgress, CheckpointRedemption,
    CheckpointReward, CheckpointStep, Customer, Merchant, OfferWithSteps, Redemption, Reward,
    RewardSummary, Transaction,
};

/// Merchant metadata.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerchantResponse {
    #[schema(example = "6f1c2a4e-8f0d-4b7a-9c51-2d3e4f5a6b7c")]
    pub id: String,
    #[schema(example = "Corner Cafe")]
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

impl From<Merchant> for MerchantResponse {
    fn from(value: Merchant) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            description: value.description,
            logo_url: value.logo_url,
        }
    }
}

/// Customer record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_by_merchant_id: String,
    pub created_at: String,
}

impl From<Customer> for CustomerResponse {
    fn from(value: Customer) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.profile.name,
            email: value.profile.email,
            phone: value.profile.phone,
            created_by_merchant_id: value.created_by_merchant_id.to_string(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Card record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub id: String,
    #[schema(example = "04:A2:3F:1B")]
    pub uid: String,
    pub customer_id: String,
    pub issuing_merchant_id: String,
    pub created_at: String,
}

impl From<Card> for CardResponse {
    fn from(value: Card) -> Self {
        Self {
            id: value.id.to_string(),
            uid: value.uid.into(),
            customer_id: value.customer_id.to_string(),
            issuing_merchant_id: value.issuing_merchant_id.to_string(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// One ledger entry.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    pub card_merchant_id: String,
    /// Signed amount; negative entries are debits.
    #[schema(example = 25)]
    pub points: i64,
    pub created_at: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(value: Transaction) -> Self {
        Self {
            id: value.id.to_string(),
            card_merchant_id: value.card_merchant_id.to_string(),
            points: value.points.get(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// A customer's position in one offer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub offer_id: String,
    pub offer_name: String,
    /// 0 until the first advance.
    pub current_step: u32,
    pub total_steps: u32,
}

impl From<CheckpointProgress> for ProgressResponse {
    fn from(value: CheckpointProgress) -> Self {
        Self {
            offer_id: value.offer_id.to_string(),
            offer_name: value.offer_name,
            current_step: value.current_step,
            total_steps: value.total_steps,
        }
    }
}

/// Milestone reward attached to a reached step.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummaryResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<RewardSummary> for RewardSummaryResponse {
    fn from(value: RewardSummary) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            description: value.description,
        }
    }
}

/// Checkpoint offer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferResponse {
    pub id: String,
    pub merchant_id: String,
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 5)]
    pub total_steps: u32,
    pub created_at: String,
}

impl From<CheckpointOffer> for OfferResponse {
    fn from(value: CheckpointOffer) -> Self {
        Self {
            id: value.id.to_string(),
            merchant_id: value.merchant_id.to_string(),
            name: value.name,
            description: value.description,
            total_steps: value.total_steps,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Configured step of an offer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub id: String,
    pub offer_id: String,
    pub step_number: u32,
    pub reward_id: Option<String>,
}

impl From<CheckpointStep> for StepResponse {
    fn from(value: CheckpointStep) -> Self {
        Self {
            id: value.id.to_string(),
            offer_id: value.offer_id.to_string(),
            step_number: value.step_number,
            reward_id: value.reward_id.map(|id| id.to_string()),
        }
    }
}

/// Offer together with its configured steps.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferWithStepsResponse {
    #[serde(flatten)]
    pub offer: OfferResponse,
    pub steps: Vec<StepResponse>,
}

impl From<OfferWithSteps> for OfferWithStepsResponse {
    fn from(value: OfferWithSteps) -> Self {
        Self {
            offer: value.offer.into(),
            steps: value.steps.into_iter().map(StepResponse::from).collect(),
        }
    }
}

/// Milestone reward.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRewardResponse {
    pub id: String,
    pub merchant_id: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl From<CheckpointReward> for CheckpointRewardResponse {
    fn from(value: CheckpointReward) -> Self {
        Self {
            id: value.id.to_string(),
            merchant_id: value.merchant_id.to_string(),
            name: value.name,
            description: value.description,
            icon: value.icon,
        }
    }
}

/// Points-priced reward.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardResponse {
    pub id: String,
    pub merchant_id: String,
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 150)]
    pub price_coins: u32,
    pub is_active: bool,
}

impl From<Reward> for RewardResponse {
    fn from(value: Reward) -> Self {
        Self {
            id: value.id.to_string(),
            merchant_id: value.merchant_id.to_string(),
            name: value.name,
            description: value.description,
            price_coins: value.price_coins,
            is_active: value.is_active,
        }
    }
}

/// Points redemption record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionResponse {
    pub id: String,
    pub customer_id: String,
    pub merchant_id: String,
    pub reward_id: String,
    pub points_spent: u32,
    #[schema(example = "pending")]
    pub status: String,
    /// The debit written to the ledger.
    pub transaction_id: String,
    pub idempotency_key: Option<String>,
    pub created_at: String,
}

impl From<Redemption> for RedemptionResponse {
    fn from(value: Redemption) -> Self {
        Self {
            id: value.id.to_string(),
            customer_id: value.customer_id.to_string(),
            merchant_id: value.merchant_id.to_string(),
            reward_id: value.reward_id.to_string(),
            points_spent: value.points_spent,
            status: value.status.to_string(),
            transaction_id: value.transaction_id.to_string(),
            idempotency_key: value.idempotency_key.map(|key| key.as_ref().to_owned()),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Milestone redemption record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRedemptionResponse {
    pub id: String,
    pub customer_id: String,
    pub merchant_id: String,
    pub reward_id: String,
    pub step_id: String,
    pub status: String,
    pub created_at: String,
}

impl From<CheckpointRedemption> for CheckpointRedemptionResponse {
    fn from(value: CheckpointRedemption) -> Self {
        Self {
            id: value.id.to_string(),
            customer_id: value.customer_id.to_string(),
            merchant_id: value.merchant_id.to_string(),
            reward_id: value.reward_id.to_string(),
            step_id: value.step_id.to_string(),
            status: value.status.to_string(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Audit row written by an advance.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvancementResponse {
    pub id: String,
    pub offer_id: String,
    pub step_reached: u32,
    pub total_steps: u32,
    pub created_at: String,
}

impl From<CheckpointAdvancement> for AdvancementResponse {
    fn from(value: CheckpointAdvancement) -> Self {
        Self {
            id: value.id.to_string(),
            offer_id: value.offer_id.to_string(),
            step_reached: value.step_reached,
            total_steps: value.total_steps,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Map a vector of domain values into DTOs.
pub(crate) fn map_all<T, R: From<T>>(values: Vec<T>) -> Vec<R> {
    values.into_iter().map(R::from).collect()
}
