//! Loyalty domain: entities, the checkpoint state machine, ports and the
//! services implementing the driving ports.
//!
//! Nothing in this module knows about HTTP or SQL. Inbound adapters call the
//! driving ports in [`ports`]; outbound adapters implement its repository
//! traits.

pub mod card_service;
pub mod catalogue_service;
pub mod checkpoint;
pub mod checkpoint_service;
pub mod customer;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod ledger_service;
pub mod merchant;
pub mod ports;
pub mod redemption_service;
pub mod rewards;
mod service_support;
pub mod trace_id;

pub use self::card_service::CardService;
pub use self::catalogue_service::{CatalogueService, MAX_TOTAL_STEPS};
pub use self::checkpoint::{
    AdvanceResult, CheckpointAdvancement, CheckpointKey, CheckpointOffer, CheckpointProgress,
    CheckpointReward, CheckpointStep, CursorMovement, CursorTransition, CustomerCheckpoint,
    OfferWithSteps, RewardSummary, RewindResult, StepCursor, StepCursorError,
};
pub use self::checkpoint_service::CheckpointService;
pub use self::customer::{
    Card, CardLookup, CardRegistration, CardStatus, Customer, CustomerProfile,
};
pub use self::error::{DomainError, Error, ErrorCode};
pub use self::ids::{
    AdvancementId, CARD_UID_MAX, CardId, CardMerchantId, CardUid, CardUidValidationError,
    CheckpointRedemptionId, CheckpointRewardId, CustomerId, MerchantId, OfferId, RedemptionId,
    RewardId, StepId, TransactionId,
};
pub use self::ledger::{
    AppendedTransaction, CardMerchant, CardMerchantLink, MerchantBalance, PointsDelta,
    Transaction, ZeroPointsError, sum_points,
};
pub use self::ledger_service::LedgerService;
pub use self::merchant::{CustomerCatalogue, Merchant, MerchantCatalogue};
pub use self::redemption_service::RedemptionService;
pub use self::rewards::{
    CheckpointRedemption, REDEMPTION_KEY_MAX, Redemption, RedemptionKey, RedemptionKeyError,
    RedemptionStatus, Reward, UnknownRedemptionStatus,
};
pub use self::service_support::Repositories;
pub use self::trace_id::TraceId;

/// HTTP header carrying the request trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";
