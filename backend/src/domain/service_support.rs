//! Repository bundle and helpers shared by the domain services.

use std::sync::Arc;

use crate::domain::ports::{
    CatalogueRepository, CatalogueRepositoryError, CheckpointRepository,
    CheckpointRepositoryError, CustomerRepository, CustomerRepositoryError, LedgerRepository,
    LedgerRepositoryError, MerchantRepository, MerchantRepositoryError,
};
use crate::domain::{
    Card, CardId, CheckpointOffer, CheckpointProgress, Customer, CustomerId, Error, Merchant,
    MerchantId,
};

/// Driven ports used by the loyalty services.
///
/// The in-memory store implements every trait so one instance can back all
/// five fields; the Diesel adapters provide one struct per port.
#[derive(Clone)]
pub struct Repositories {
    /// Merchant metadata.
    pub merchants: Arc<dyn MerchantRepository>,
    /// Customers and cards.
    pub customers: Arc<dyn CustomerRepository>,
    /// Associations, transactions and redemptions.
    pub ledger: Arc<dyn LedgerRepository>,
    /// Checkpoint cursors and their history.
    pub checkpoints: Arc<dyn CheckpointRepository>,
    /// Offers, steps and rewards.
    pub catalogue: Arc<dyn CatalogueRepository>,
}

impl Repositories {
    /// Use one store for every port.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: MerchantRepository
            + CustomerRepository
            + LedgerRepository
            + CheckpointRepository
            + CatalogueRepository
            + 'static,
    {
        Self {
            merchants: store.clone(),
            customers: store.clone(),
            ledger: store.clone(),
            checkpoints: store.clone(),
            catalogue: store,
        }
    }

    pub(crate) async fn require_merchant(&self, merchant_id: &MerchantId) -> Result<Merchant, Error> {
        self.merchants
            .find_merchant(merchant_id)
            .await
            .map_err(map_merchant_error)?
            .ok_or_else(|| Error::not_found(format!("merchant {merchant_id} not found")))
    }

    pub(crate) async fn require_customer(&self, customer_id: &CustomerId) -> Result<Customer, Error> {
        self.customers
            .find_customer(customer_id)
            .await
            .map_err(map_customer_error)?
            .ok_or_else(|| Error::not_found(format!("customer {customer_id} not found")))
    }

    pub(crate) async fn require_card(&self, card_id: &CardId) -> Result<Card, Error> {
        self.customers
            .find_card(card_id)
            .await
            .map_err(map_customer_error)?
            .ok_or_else(|| Error::not_found(format!("card {card_id} not found")))
    }

    /// The merchant's offer, or not found when it is missing or foreign.
    pub(crate) async fn require_offer(
        &self,
        merchant_id: &MerchantId,
        offer_id: &crate::domain::OfferId,
    ) -> Result<CheckpointOffer, Error> {
        self.catalogue
            .find_offer(offer_id)
            .await
            .map_err(map_catalogue_error)?
            .filter(|offer| offer.merchant_id == *merchant_id)
            .ok_or_else(|| Error::not_found(format!("checkpoint offer {offer_id} not found")))
    }

    /// Progress in every offer of the merchant, unstarted offers at step 0.
    pub(crate) async fn progress_for(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<Vec<CheckpointProgress>, Error> {
        let offers = self
            .catalogue
            .offers_for(merchant_id)
            .await
            .map_err(map_catalogue_error)?;
        if offers.is_empty() {
            return Ok(Vec::new());
        }
        let cursors = self
            .checkpoints
            .cursors_for(customer_id, merchant_id)
            .await
            .map_err(map_checkpoint_error)?;
        Ok(offers
            .iter()
            .map(|offer| {
                let cursor = cursors.iter().find(|row| row.offer_id == offer.id);
                CheckpointProgress::for_offer(offer, cursor)
            })
            .collect())
    }
}

pub(crate) fn map_merchant_error(error: MerchantRepositoryError) -> Error {
    match error {
        MerchantRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("merchant repository unavailable: {message}"))
        }
        MerchantRepositoryError::Query { message } => {
            Error::internal(format!("merchant repository error: {message}"))
        }
    }
}

pub(crate) fn map_customer_error(error: CustomerRepositoryError) -> Error {
    match error {
        CustomerRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("customer repository unavailable: {message}"))
        }
        CustomerRepositoryError::Query { message } => {
            Error::internal(format!("customer repository error: {message}"))
        }
        CustomerRepositoryError::UidTaken { uid } => {
            Error::conflict(format!("card uid {uid} is already registered to another customer"))
        }
    }
}

pub(crate) fn map_ledger_error(error: LedgerRepositoryError) -> Error {
    match error {
        LedgerRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("ledger repository unavailable: {message}"))
        }
        LedgerRepositoryError::Query { message } => {
            Error::internal(format!("ledger repository error: {message}"))
        }
        LedgerRepositoryError::DuplicateRedemptionKey { key } => {
            Error::conflict(format!("redemption key {key} is already in use"))
        }
    }
}

pub(crate) fn map_checkpoint_error(error: CheckpointRepositoryError) -> Error {
    match error {
        CheckpointRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("checkpoint repository unavailable: {message}"))
        }
        CheckpointRepositoryError::Query { message } => {
            Error::internal(format!("checkpoint repository error: {message}"))
        }
        CheckpointRepositoryError::MissingCursor => {
            Error::not_found("no checkpoint progress to rewind for this offer")
        }
        CheckpointRepositoryError::OfferMissing => Error::not_found("checkpoint offer not found"),
    }
}

pub(crate) fn map_catalogue_error(error: CatalogueRepositoryError) -> Error {
    match error {
        CatalogueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("catalogue repository unavailable: {message}"))
        }
        CatalogueRepositoryError::Query { message } => {
            Error::internal(format!("catalogue repository error: {message}"))
        }
    }
}

/// Trimmed, non-empty text no longer than `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> Result<String, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_request(format!("{field} must not be empty"))
            .with_details(serde_json::json!({ "field": field, "code": "empty" })));
    }
    if trimmed.chars().count() > max {
        return Err(Error::invalid_request(format!(
            "{field} must be at most {max} characters"
        ))
        .with_details(serde_json::json!({ "field": field, "code": "too_long", "max": max })));
    }
    Ok(trimmed.to_owned())
}

/// Trimmed optional text; blank values become `None`.
pub(crate) fn optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, Error> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => required_text(field, text, max).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    fn connection_failures_are_unavailable() {
        let err = map_ledger_error(LedgerRepositoryError::connection("pool exhausted"));
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        let err = map_catalogue_error(CatalogueRepositoryError::connection("down"));
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    fn query_failures_are_internal() {
        let err = map_checkpoint_error(CheckpointRepositoryError::query("syntax"));
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[rstest]
    fn duplicate_redemption_key_is_conflict() {
        let err = map_ledger_error(LedgerRepositoryError::duplicate_redemption_key("retry-1"));
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    fn uid_taken_is_conflict() {
        let err = map_customer_error(CustomerRepositoryError::uid_taken("04A2"));
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[case("  Latte  ", Ok("Latte".to_owned()))]
    #[case("   ", Err(ErrorCode::InvalidRequest))]
    #[case("abcdefghijk", Err(ErrorCode::InvalidRequest))]
    fn required_text_validation(#[case] raw: &str, #[case] expected: Result<String, ErrorCode>) {
        assert_eq!(
            required_text("name", raw, 10).map_err(|err| err.code()),
            expected
        );
    }

    #[rstest]
    fn optional_text_treats_blank_as_absent() {
        assert_eq!(optional_text("description", Some("  "), 10), Ok(None));
        assert_eq!(optional_text("description", None, 10), Ok(None));
        assert_eq!(
            optional_text("description", Some(" hi "), 10),
            Ok(Some("hi".to_owned()))
        );
    }
}
