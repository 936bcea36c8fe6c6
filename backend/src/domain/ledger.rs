//! Points ledger entities.
//!
//! Balances are never stored. A card's balance at a merchant is the sum of
//! the signed points of every transaction recorded against its card-merchant
//! association.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::checkpoint::CheckpointProgress;
use super::ids::{CardId, CardMerchantId, MerchantId, TransactionId};
use super::merchant::Merchant;

/// Rejected points amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("points must be a non-zero integer")]
pub struct ZeroPointsError;

/// Signed, non-zero points movement. Positive values accrue, negative debit.
///
/// # Examples
/// ```
/// use loyalty_backend::domain::PointsDelta;
///
/// assert_eq!(PointsDelta::new(-20).map(PointsDelta::get), Ok(-20));
/// assert!(PointsDelta::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PointsDelta(i64);

impl PointsDelta {
    /// Validate a raw amount.
    pub fn new(points: i64) -> Result<Self, ZeroPointsError> {
        if points == 0 {
            Err(ZeroPointsError)
        } else {
            Ok(Self(points))
        }
    }

    /// Debit for a reward price.
    pub fn debit(price: u32) -> Result<Self, ZeroPointsError> {
        Self::new(-i64::from(price))
    }

    /// Raw signed value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for PointsDelta {
    type Error = ZeroPointsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PointsDelta> for i64 {
    fn from(value: PointsDelta) -> Self {
        value.0
    }
}

/// Association between a card and a merchant it has been used at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMerchant {
    /// Association identifier.
    pub id: CardMerchantId,
    /// Card.
    pub card_id: CardId,
    /// Merchant.
    pub merchant_id: MerchantId,
    /// First interaction time.
    pub created_at: DateTime<Utc>,
}

/// Association plus whether the lookup created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMerchantLink {
    /// The association row.
    pub association: CardMerchant,
    /// `true` when the row did not exist before this call.
    pub created: bool,
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Entry identifier.
    pub id: TransactionId,
    /// Association the entry belongs to.
    pub card_merchant_id: CardMerchantId,
    /// Signed points.
    pub points: PointsDelta,
    /// Recording time.
    pub created_at: DateTime<Utc>,
}

/// Entry appended by [`crate::domain::ports::LedgerCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedTransaction {
    /// The stored entry.
    pub transaction: Transaction,
    /// Balance at the merchant after the entry.
    pub balance: i64,
    /// Whether the card-merchant association was created for this entry.
    pub association_created: bool,
}

/// Balance of a card at one merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantBalance {
    /// Merchant metadata.
    pub merchant: Merchant,
    /// Signed sum of the merchant's transactions for the card.
    pub balance: i64,
    /// Progress in each of the merchant's offers.
    pub progress: Vec<CheckpointProgress>,
}

/// Sum signed points without overflow surprises.
///
/// Saturates instead of wrapping; a ledger reaching `i64::MAX` points is not
/// a realistic state but must not flip sign.
#[must_use]
pub fn sum_points<I>(points: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    points
        .into_iter()
        .fold(0_i64, |acc, value| acc.saturating_add(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(-1)]
    #[case(i64::MAX)]
    fn accepts_non_zero_points(#[case] raw: i64) {
        assert_eq!(PointsDelta::new(raw).map(PointsDelta::get), Ok(raw));
    }

    #[rstest]
    fn rejects_zero_points() {
        assert_eq!(PointsDelta::new(0), Err(ZeroPointsError));
        assert!(serde_json::from_str::<PointsDelta>("0").is_err());
    }

    #[rstest]
    fn debit_is_negative_price() {
        assert_eq!(PointsDelta::debit(150).map(PointsDelta::get), Ok(-150));
        assert_eq!(PointsDelta::debit(0), Err(ZeroPointsError));
    }

    #[rstest]
    fn sum_is_order_independent() {
        let values = [10, -3, 25, -7, 1];
        let mut reversed = values;
        reversed.reverse();
        assert_eq!(sum_points(values), 26);
        assert_eq!(sum_points(reversed), 26);
        assert_eq!(sum_points(Vec::new()), 0);
    }
}
