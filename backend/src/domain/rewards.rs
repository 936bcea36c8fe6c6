//! Points-priced rewards and redemption records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{
    CheckpointRedemptionId, CheckpointRewardId, CustomerId, MerchantId, RedemptionId, RewardId,
    StepId, TransactionId,
};

/// Catalogue reward bought with points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    /// Reward identifier.
    pub id: RewardId,
    /// Owning merchant.
    pub merchant_id: MerchantId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Price in points, always positive.
    pub price_coins: u32,
    /// Inactive rewards stay visible to the merchant but cannot be redeemed.
    pub is_active: bool,
}

/// Lifecycle of a redemption record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    /// Recorded, awaiting hand-over.
    #[default]
    Pending,
    /// Reward handed over.
    Completed,
    /// Cancelled by the merchant.
    Cancelled,
}

impl RedemptionStatus {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Unknown status text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown redemption status: {0}")]
pub struct UnknownRedemptionStatus(pub String);

impl FromStr for RedemptionStatus {
    type Err = UnknownRedemptionStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownRedemptionStatus(other.to_owned())),
        }
    }
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-supplied key making a redemption request safe to retry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedemptionKey(String);

/// Maximum length of a [`RedemptionKey`].
pub const REDEMPTION_KEY_MAX: usize = 128;

/// Invalid idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RedemptionKeyError {
    /// Blank key.
    #[error("idempotency key must not be empty")]
    Empty,
    /// Key longer than [`REDEMPTION_KEY_MAX`].
    #[error("idempotency key must be at most {REDEMPTION_KEY_MAX} characters")]
    TooLong,
}

impl RedemptionKey {
    /// Validate a raw header value.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, RedemptionKeyError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(RedemptionKeyError::Empty);
        }
        if trimmed.chars().count() > REDEMPTION_KEY_MAX {
            return Err(RedemptionKeyError::TooLong);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for RedemptionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stored points redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    /// Redemption identifier.
    pub id: RedemptionId,
    /// Redeeming customer.
    pub customer_id: CustomerId,
    /// Merchant the reward belongs to.
    pub merchant_id: MerchantId,
    /// Redeemed reward.
    pub reward_id: RewardId,
    /// Points debited.
    pub points_spent: u32,
    /// Lifecycle status.
    pub status: RedemptionStatus,
    /// The debit transaction written with this record.
    pub transaction_id: TransactionId,
    /// Idempotency key supplied by the client, if any.
    pub idempotency_key: Option<RedemptionKey>,
    /// Recording time.
    pub created_at: DateTime<Utc>,
}

/// Stored checkpoint reward redemption. No points are debited for these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRedemption {
    /// Redemption identifier.
    pub id: CheckpointRedemptionId,
    /// Redeeming customer.
    pub customer_id: CustomerId,
    /// Merchant.
    pub merchant_id: MerchantId,
    /// Milestone reward.
    pub reward_id: CheckpointRewardId,
    /// Step carrying the reward.
    pub step_id: StepId,
    /// Lifecycle status.
    pub status: RedemptionStatus,
    /// Recording time.
    pub created_at: DateTime<Utc>,
}
