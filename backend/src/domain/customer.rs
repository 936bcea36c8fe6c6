//! Customers and their physical cards.
//!
//! Customers and cards are shared across merchants: a card issued by one
//! merchant collects points anywhere it is tapped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CardId, CardMerchantId, CardUid, CustomerId, MerchantId};

/// Optional contact details captured when a merchant registers a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
}

/// Registered customer. Balances are derived from the ledger, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Customer identifier.
    pub id: CustomerId,
    /// Contact details.
    pub profile: CustomerProfile,
    /// Merchant that registered the customer.
    pub created_by_merchant_id: MerchantId,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// Physical loyalty card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Card identifier.
    pub id: CardId,
    /// NFC UID, unique across the system.
    pub uid: CardUid,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Merchant that issued the card.
    pub issuing_merchant_id: MerchantId,
    /// Issue time.
    pub created_at: DateTime<Utc>,
}

/// Result of a terminal reading a card at a merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLookup {
    /// The card.
    pub card: Card,
    /// Association between the card and the reading merchant.
    pub card_merchant_id: CardMerchantId,
    /// Whether this read created the association.
    pub association_created: bool,
}

/// Read-only card status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardStatus {
    /// Normalised UID that was checked.
    pub uid: CardUid,
    /// The card, when registered.
    pub card: Option<Card>,
    /// Whether the card has an association with the requesting merchant.
    /// Always `false` when no merchant was supplied.
    pub associated: bool,
}

/// Outcome of a card registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRegistration {
    /// Registered card.
    pub card: Card,
    /// `false` when the UID was already registered to the same customer.
    pub created: bool,
}
