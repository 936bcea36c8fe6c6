//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types are fallible
//! because the database stores counts as signed integers and identifiers as
//! unvalidated text.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    AdvancementId, Card, CardId, CardMerchant, CardMerchantId, CardUid, CheckpointAdvancement,
    CheckpointOffer, CheckpointRedemption, CheckpointRedemptionId, CheckpointReward,
    CheckpointRewardId, CheckpointStep, Customer, CustomerCheckpoint, CustomerId,
    CustomerProfile, Merchant, MerchantId, OfferId, PointsDelta, Redemption, RedemptionId,
    RedemptionKey, RedemptionStatus, Reward, RewardId, StepId, Transaction, TransactionId,
};

use super::schema::{
    card_merchants, cards, checkpoint_advancements, checkpoint_offers, checkpoint_rewards,
    checkpoint_steps, customer_checkpoints, customers, merchants, redeemed_checkpoint_rewards,
    redeemed_rewards, rewards, transactions,
};

/// Narrow a stored `INTEGER` count to the domain's unsigned type.
pub(crate) fn to_count(value: i32, column: &'static str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("negative value {value} in {column}"))
}

/// Widen a domain count for storage.
pub(crate) fn to_db_count(value: u32, column: &'static str) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("value {value} overflows {column}"))
}

// ---------------------------------------------------------------------------
// Merchants, customers and cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = merchants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MerchantRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

impl From<MerchantRow> for Merchant {
    fn from(row: MerchantRow) -> Self {
        Self {
            id: MerchantId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            logo_url: row.logo_url,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CustomerRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_by_merchant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerRow {
    fn from(customer: &Customer) -> Self {
        Self {
            id: *customer.id.as_uuid(),
            name: customer.profile.name.clone(),
            email: customer.profile.email.clone(),
            phone: customer.profile.phone.clone(),
            created_by_merchant_id: *customer.created_by_merchant_id.as_uuid(),
            created_at: customer.created_at,
        }
    }
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: CustomerId::from_uuid(row.id),
            profile: CustomerProfile {
                name: row.name,
                email: row.email,
                phone: row.phone,
            },
            created_by_merchant_id: MerchantId::from_uuid(row.created_by_merchant_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = cards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CardRow {
    pub id: Uuid,
    pub uid: String,
    pub customer_id: Uuid,
    pub issuing_merchant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&Card> for CardRow {
    fn from(card: &Card) -> Self {
        Self {
            id: *card.id.as_uuid(),
            uid: card.uid.to_string(),
            customer_id: *card.customer_id.as_uuid(),
            issuing_merchant_id: *card.issuing_merchant_id.as_uuid(),
            created_at: card.created_at,
        }
    }
}

impl TryFrom<CardRow> for Card {
    type Error = String;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        let uid = CardUid::new(&row.uid).map_err(|err| format!("stored card uid: {err}"))?;
        Ok(Self {
            id: CardId::from_uuid(row.id),
            uid,
            customer_id: CustomerId::from_uuid(row.customer_id),
            issuing_merchant_id: MerchantId::from_uuid(row.issuing_merchant_id),
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Insertable association; `created_at` comes from the column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = card_merchants)]
pub(crate) struct NewCardMerchantRow {
    pub id: Uuid,
    pub card_id: Uuid,
    pub merchant_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = card_merchants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CardMerchantRow {
    pub id: Uuid,
    pub card_id: Uuid,
    pub merchant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<CardMerchantRow> for CardMerchant {
    fn from(row: CardMerchantRow) -> Self {
        Self {
            id: CardMerchantId::from_uuid(row.id),
            card_id: CardId::from_uuid(row.card_id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TransactionRow {
    pub id: Uuid,
    pub card_merchant_id: Uuid,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: *tx.id.as_uuid(),
            card_merchant_id: *tx.card_merchant_id.as_uuid(),
            points: tx.points.get(),
            created_at: tx.created_at,
        }
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = String;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let points = PointsDelta::new(row.points).map_err(|err| err.to_string())?;
        Ok(Self {
            id: TransactionId::from_uuid(row.id),
            card_merchant_id: CardMerchantId::from_uuid(row.card_merchant_id),
            points,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = redeemed_rewards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RedemptionRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub reward_id: Uuid,
    pub points_spent: i32,
    pub status: String,
    pub transaction_id: Uuid,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Redemption> for RedemptionRow {
    type Error = String;

    fn try_from(redemption: &Redemption) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *redemption.id.as_uuid(),
            customer_id: *redemption.customer_id.as_uuid(),
            merchant_id: *redemption.merchant_id.as_uuid(),
            reward_id: *redemption.reward_id.as_uuid(),
            points_spent: to_db_count(redemption.points_spent, "points_spent")?,
            status: redemption.status.as_str().to_owned(),
            transaction_id: *redemption.transaction_id.as_uuid(),
            idempotency_key: redemption
                .idempotency_key
                .as_ref()
                .map(|key| key.as_ref().to_owned()),
            created_at: redemption.created_at,
        })
    }
}

impl TryFrom<RedemptionRow> for Redemption {
    type Error = String;

    fn try_from(row: RedemptionRow) -> Result<Self, Self::Error> {
        let status: RedemptionStatus = row.status.parse().map_err(|err| format!("{err}"))?;
        let idempotency_key = row
            .idempotency_key
            .map(RedemptionKey::new)
            .transpose()
            .map_err(|err| format!("stored idempotency key: {err}"))?;
        Ok(Self {
            id: RedemptionId::from_uuid(row.id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            reward_id: RewardId::from_uuid(row.reward_id),
            points_spent: to_count(row.points_spent, "points_spent")?,
            status,
            transaction_id: TransactionId::from_uuid(row.transaction_id),
            idempotency_key,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Checkpoint journeys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = checkpoint_offers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct OfferRow {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub total_steps: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&CheckpointOffer> for OfferRow {
    type Error = String;

    fn try_from(offer: &CheckpointOffer) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *offer.id.as_uuid(),
            merchant_id: *offer.merchant_id.as_uuid(),
            name: offer.name.clone(),
            description: offer.description.clone(),
            total_steps: to_db_count(offer.total_steps, "total_steps")?,
            created_at: offer.created_at,
        })
    }
}

impl TryFrom<OfferRow> for CheckpointOffer {
    type Error = String;

    fn try_from(row: OfferRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OfferId::from_uuid(row.id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            name: row.name,
            description: row.description,
            total_steps: to_count(row.total_steps, "total_steps")?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = checkpoint_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StepRow {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub step_number: i32,
    pub reward_id: Option<Uuid>,
}

impl TryFrom<&CheckpointStep> for StepRow {
    type Error = String;

    fn try_from(step: &CheckpointStep) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *step.id.as_uuid(),
            offer_id: *step.offer_id.as_uuid(),
            step_number: to_db_count(step.step_number, "step_number")?,
            reward_id: step.reward_id.map(|id| *id.as_uuid()),
        })
    }
}

impl TryFrom<StepRow> for CheckpointStep {
    type Error = String;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StepId::from_uuid(row.id),
            offer_id: OfferId::from_uuid(row.offer_id),
            step_number: to_count(row.step_number, "step_number")?,
            reward_id: row.reward_id.map(CheckpointRewardId::from_uuid),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = checkpoint_rewards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct CheckpointRewardRow {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl From<&CheckpointReward> for CheckpointRewardRow {
    fn from(reward: &CheckpointReward) -> Self {
        Self {
            id: *reward.id.as_uuid(),
            merchant_id: *reward.merchant_id.as_uuid(),
            name: reward.name.clone(),
            description: reward.description.clone(),
            icon: reward.icon.clone(),
        }
    }
}

impl From<CheckpointRewardRow> for CheckpointReward {
    fn from(row: CheckpointRewardRow) -> Self {
        Self {
            id: CheckpointRewardId::from_uuid(row.id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            name: row.name,
            description: row.description,
            icon: row.icon,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = customer_checkpoints)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CursorRow {
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub offer_id: Uuid,
    pub current_step: i32,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CursorRow> for CustomerCheckpoint {
    type Error = String;

    fn try_from(row: CursorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            customer_id: CustomerId::from_uuid(row.customer_id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            offer_id: OfferId::from_uuid(row.offer_id),
            current_step: to_count(row.current_step, "current_step")?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = checkpoint_advancements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AdvancementRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub offer_id: Uuid,
    pub step_reached: i32,
    pub total_steps: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AdvancementRow> for CheckpointAdvancement {
    type Error = String;

    fn try_from(row: AdvancementRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AdvancementId::from_uuid(row.id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            offer_id: OfferId::from_uuid(row.offer_id),
            step_reached: to_count(row.step_reached, "step_reached")?,
            total_steps: to_count(row.total_steps, "total_steps")?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = redeemed_checkpoint_rewards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CheckpointRedemptionRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub reward_id: Uuid,
    pub step_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CheckpointRedemption> for CheckpointRedemptionRow {
    fn from(redemption: &CheckpointRedemption) -> Self {
        Self {
            id: *redemption.id.as_uuid(),
            customer_id: *redemption.customer_id.as_uuid(),
            merchant_id: *redemption.merchant_id.as_uuid(),
            reward_id: *redemption.reward_id.as_uuid(),
            step_id: *redemption.step_id.as_uuid(),
            status: redemption.status.as_str().to_owned(),
            created_at: redemption.created_at,
        }
    }
}

impl TryFrom<CheckpointRedemptionRow> for CheckpointRedemption {
    type Error = String;

    fn try_from(row: CheckpointRedemptionRow) -> Result<Self, Self::Error> {
        let status: RedemptionStatus = row.status.parse().map_err(|err| format!("{err}"))?;
        Ok(Self {
            id: CheckpointRedemptionId::from_uuid(row.id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            reward_id: CheckpointRewardId::from_uuid(row.reward_id),
            step_id: StepId::from_uuid(row.step_id),
            status,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Points-priced rewards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = rewards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct RewardRow {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_coins: i32,
    pub is_active: bool,
}

impl TryFrom<&Reward> for RewardRow {
    type Error = String;

    fn try_from(reward: &Reward) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *reward.id.as_uuid(),
            merchant_id: *reward.merchant_id.as_uuid(),
            name: reward.name.clone(),
            description: reward.description.clone(),
            price_coins: to_db_count(reward.price_coins, "price_coins")?,
            is_active: reward.is_active,
        })
    }
}

impl TryFrom<RewardRow> for Reward {
    type Error = String;

    fn try_from(row: RewardRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RewardId::from_uuid(row.id),
            merchant_id: MerchantId::from_uuid(row.merchant_id),
            name: row.name,
            description: row.description,
            price_coins: to_count(row.price_coins, "price_coins")?,
            is_active: row.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Ok(0))]
    #[case(7, Ok(7))]
    fn counts_narrow_when_non_negative(#[case] raw: i32, #[case] expected: Result<u32, String>) {
        assert_eq!(to_count(raw, "total_steps"), expected);
    }

    #[rstest]
    fn negative_counts_are_rejected() {
        let err = to_count(-1, "current_step").expect_err("negative");
        assert!(err.contains("current_step"));
    }

    #[rstest]
    fn oversized_counts_are_rejected() {
        assert!(to_db_count(u32::MAX, "price_coins").is_err());
    }

    #[rstest]
    fn unknown_status_fails_conversion() {
        let row = CheckpointRedemptionRow {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            merchant_id: Uuid::new_v4(),
            reward_id: Uuid::new_v4(),
            step_id: Uuid::new_v4(),
            status: "refunded".to_owned(),
            created_at: Utc::now(),
        };
        assert!(CheckpointRedemption::try_from(row).is_err());
    }
}
