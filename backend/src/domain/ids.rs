//! Strongly typed identifiers for loyalty entities.
//!
//! Every entity except the physical card UID is keyed by a UUID. Wrapping each
//! one in its own newtype keeps a `RewardId` from being passed where an
//! `OfferId` is expected, which matters because most operations take several
//! identifiers side by side.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Merchant (tenant) identifier. Supplied by callers via `x-merchant-id`.
    MerchantId
);
uuid_id!(
    /// Customer identifier. Customers are shared across merchants.
    CustomerId
);
uuid_id!(
    /// Card identifier (distinct from the physical [`CardUid`]).
    CardId
);
uuid_id!(
    /// Card-merchant association identifier.
    CardMerchantId
);
uuid_id!(
    /// Ledger transaction identifier.
    TransactionId
);
uuid_id!(
    /// Points-priced reward identifier.
    RewardId
);
uuid_id!(
    /// Checkpoint offer (milestone journey) identifier.
    OfferId
);
uuid_id!(
    /// Checkpoint step identifier.
    StepId
);
uuid_id!(
    /// Milestone reward identifier.
    CheckpointRewardId
);
uuid_id!(
    /// Points redemption identifier.
    RedemptionId
);
uuid_id!(
    /// Checkpoint reward redemption identifier.
    CheckpointRedemptionId
);
uuid_id!(
    /// Checkpoint advancement audit identifier.
    AdvancementId
);

/// Maximum accepted length of a physical card UID.
pub const CARD_UID_MAX: usize = 64;

/// Validation failures for [`CardUid`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardUidValidationError {
    /// UID is empty once surrounding whitespace is removed.
    #[error("card uid must not be empty")]
    Empty,
    /// UID exceeds [`CARD_UID_MAX`] characters.
    #[error("card uid must be at most {max} characters")]
    TooLong {
        /// Maximum permitted length.
        max: usize,
    },
    /// UID contains characters other than ASCII letters, digits, `:` or `-`.
    #[error("card uid may only contain letters, digits, ':' or '-'")]
    InvalidCharacters,
}

/// Physical NFC card UID as read by the terminal.
///
/// Readers disagree on case, so UIDs are trimmed and upper-cased on
/// construction; `04:a2:3f` and `04:A2:3F ` name the same card.
///
/// # Examples
/// ```
/// use loyalty_backend::domain::CardUid;
///
/// let uid = CardUid::new(" 04:a2:3f ").expect("valid uid");
/// assert_eq!(uid.as_ref(), "04:A2:3F");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardUid(String);

impl CardUid {
    /// Validate and normalise a raw UID.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CardUidValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CardUidValidationError::Empty);
        }
        if trimmed.chars().count() > CARD_UID_MAX {
            return Err(CardUidValidationError::TooLong { max: CARD_UID_MAX });
        }
        if !trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == ':' || ch == '-')
        {
            return Err(CardUidValidationError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl AsRef<str> for CardUid {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CardUid {
    type Error = CardUidValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CardUid> for String {
    fn from(value: CardUid) -> Self {
        value.0
    }
}
