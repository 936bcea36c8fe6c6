//! Port for reading merchant metadata.

use async_trait::async_trait;

use crate::domain::{Merchant, MerchantId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by merchant repository adapters.
    pub enum MerchantRepositoryError {
        /// Store unreachable or pool exhausted.
        Connection { message: String } =>
            "merchant repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "merchant repository query failed: {message}",
    }
}

/// Read-only access to merchants. Merchants are created by the dashboard.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MerchantRepository: Send + Sync {
    /// Fetch a merchant by id.
    async fn find_merchant(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Option<Merchant>, MerchantRepositoryError>;

    /// All merchants ordered by name.
    async fn list_merchants(&self) -> Result<Vec<Merchant>, MerchantRepositoryError>;
}
