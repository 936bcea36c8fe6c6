//! Driving port for registering customers and cards.

use async_trait::async_trait;

use crate::domain::{
    CardLookup, CardRegistration, CardUid, Customer, CustomerId, CustomerProfile, Error,
    MerchantId,
};

/// Register a customer on behalf of a merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCustomerRequest {
    /// Registering merchant.
    pub merchant_id: MerchantId,
    /// Contact details.
    pub profile: CustomerProfile,
}

/// Bind a physical card to a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCardRequest {
    /// Issuing merchant.
    pub merchant_id: MerchantId,
    /// Card UID.
    pub uid: CardUid,
    /// Card owner.
    pub customer_id: CustomerId,
}

/// A terminal read of a card at a merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupCardRequest {
    /// Merchant operating the terminal.
    pub merchant_id: MerchantId,
    /// Card UID.
    pub uid: CardUid,
}

/// Mutating card and customer use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardCommand: Send + Sync {
    /// Register a new customer.
    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<Customer, Error>;

    /// Register a card. Registering a UID the same customer already owns
    /// returns the existing card; a UID owned by someone else is a conflict.
    async fn create_card(&self, request: CreateCardRequest) -> Result<CardRegistration, Error>;

    /// Resolve a card by UID and associate it with the merchant on first use.
    async fn lookup_card(&self, request: LookupCardRequest) -> Result<CardLookup, Error>;
}
