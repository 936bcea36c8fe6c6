//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`) are the use-cases inbound adapters
//! call. Driven ports (`*Repository`) are implemented by the outbound
//! adapters; each exposes a typed error enum built with `define_port_error!`.

mod macros;
pub(crate) use macros::define_port_error;

mod card_command;
mod card_query;
mod catalogue_command;
mod catalogue_query;
mod catalogue_repository;
mod checkpoint_command;
mod checkpoint_repository;
mod customer_repository;
mod ledger_command;
mod ledger_query;
mod ledger_repository;
mod merchant_repository;
mod redemption_command;

#[cfg(test)]
pub use card_command::MockCardCommand;
pub use card_command::{CardCommand, CreateCardRequest, CreateCustomerRequest, LookupCardRequest};
#[cfg(test)]
pub use card_query::MockCardQuery;
pub use card_query::{CardQuery, CardStatusRequest};
#[cfg(test)]
pub use catalogue_command::MockCatalogueCommand;
pub use catalogue_command::{
    CatalogueCommand, CheckpointRewardDraft, OfferDraft, RewardDraft, SetStepRequest,
};
#[cfg(test)]
pub use catalogue_query::MockCatalogueQuery;
pub use catalogue_query::{CatalogueQuery, MerchantCheckpoints};
#[cfg(test)]
pub use catalogue_repository::MockCatalogueRepository;
pub use catalogue_repository::{CatalogueRepository, CatalogueRepositoryError};
#[cfg(test)]
pub use checkpoint_command::MockCheckpointCommand;
pub use checkpoint_command::{CheckpointCommand, CheckpointMoveRequest, CustomerSubject};
#[cfg(test)]
pub use checkpoint_repository::MockCheckpointRepository;
pub use checkpoint_repository::{CheckpointRepository, CheckpointRepositoryError};
#[cfg(test)]
pub use customer_repository::MockCustomerRepository;
pub use customer_repository::{CustomerRepository, CustomerRepositoryError};
#[cfg(test)]
pub use ledger_command::MockLedgerCommand;
pub use ledger_command::{AppendTransactionRequest, LedgerCommand};
#[cfg(test)]
pub use ledger_query::MockLedgerQuery;
pub use ledger_query::{
    DEFAULT_HISTORY_LIMIT, LedgerQuery, MAX_HISTORY_LIMIT, MerchantCardRequest, MerchantDetails,
    MerchantHistory, MerchantHistoryRequest,
};
#[cfg(test)]
pub use ledger_repository::MockLedgerRepository;
pub use ledger_repository::{
    AssociationBalance, LedgerRepository, LedgerRepositoryError, RedemptionDraft,
};
#[cfg(test)]
pub use merchant_repository::MockMerchantRepository;
pub use merchant_repository::{MerchantRepository, MerchantRepositoryError};
#[cfg(test)]
pub use redemption_command::MockRedemptionCommand;
pub use redemption_command::{
    RedeemCheckpointRewardRequest, RedeemRewardRequest, RedeemRewardResponse, RedemptionCommand,
};
