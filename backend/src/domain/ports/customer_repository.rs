//! Port for customer and card persistence.

use async_trait::async_trait;

use crate::domain::{Card, CardId, CardUid, Customer, CustomerId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by customer repository adapters.
    pub enum CustomerRepositoryError {
        /// Store unreachable or pool exhausted.
        Connection { message: String } =>
            "customer repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "customer repository query failed: {message}",
        /// A card with this UID is already registered.
        UidTaken { uid: String } =>
            "card uid {uid} is already registered",
    }
}

/// Storage for customers and their cards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Persist a new customer.
    async fn insert_customer(&self, customer: &Customer) -> Result<(), CustomerRepositoryError>;

    /// Fetch a customer by id.
    async fn find_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Customer>, CustomerRepositoryError>;

    /// Persist a new card together with its association to the issuing
    /// merchant. Both rows are written or neither is.
    ///
    /// Returns [`CustomerRepositoryError::UidTaken`] when the UID is already
    /// registered, including when a concurrent request won the race.
    async fn insert_card(&self, card: &Card) -> Result<(), CustomerRepositoryError>;

    /// Fetch a card by id.
    async fn find_card(&self, card_id: &CardId) -> Result<Option<Card>, CustomerRepositoryError>;

    /// Fetch a card by its normalised UID.
    async fn find_card_by_uid(&self, uid: &CardUid)
    -> Result<Option<Card>, CustomerRepositoryError>;

    /// The customer's first issued card, if they have one.
    async fn primary_card_for(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Card>, CustomerRepositoryError>;
}
