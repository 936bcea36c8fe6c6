//! In-memory implementation of every repository port.
//!
//! Used when no database URL is configured and by the integration tests. All
//! state sits behind one async mutex, so each repository call observes and
//! mutates a consistent snapshot; multi-step operations such as
//! [`crate::domain::ports::LedgerRepository::redeem`] are atomic for free.

mod catalogue;
mod checkpoints;
mod customers;
mod ledger;

use std::sync::Arc;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::{Mutex, MutexGuard};

use crate::domain::ports::{MerchantRepository, MerchantRepositoryError};
use crate::domain::{
    Card, CardMerchant, CheckpointAdvancement, CheckpointOffer, CheckpointRedemption,
    CheckpointReward, CheckpointStep, Customer, CustomerCheckpoint, Merchant, MerchantId,
    Redemption, Reward, Transaction,
};

/// Thread-safe in-memory store.
///
/// # Examples
/// ```
/// use loyalty_backend::domain::{Merchant, MerchantId};
/// use loyalty_backend::outbound::memory::InMemoryStore;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = InMemoryStore::new();
/// store
///     .insert_merchant(Merchant {
///         id: MerchantId::random(),
///         name: "Corner Cafe".into(),
///         description: None,
///         logo_url: None,
///     })
///     .await;
/// # });
/// ```
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Default)]
struct Inner {
    merchants: Vec<Merchant>,
    customers: Vec<Customer>,
    cards: Vec<Card>,
    card_merchants: Vec<CardMerchant>,
    transactions: Vec<Transaction>,
    redemptions: Vec<Redemption>,
    offers: Vec<CheckpointOffer>,
    steps: Vec<CheckpointStep>,
    checkpoint_rewards: Vec<CheckpointReward>,
    rewards: Vec<Reward>,
    cursors: Vec<CustomerCheckpoint>,
    advancements: Vec<CheckpointAdvancement>,
    checkpoint_redemptions: Vec<CheckpointRedemption>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl InMemoryStore {
    /// Create an empty store stamping rows with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store stamping rows with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    async fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().await
    }

    /// Register a merchant. Merchants are provisioned outside this service,
    /// so this is how development setups and tests create them.
    pub async fn insert_merchant(&self, merchant: Merchant) {
        let mut inner = self.lock().await;
        inner.merchants.retain(|existing| existing.id != merchant.id);
        inner.merchants.push(merchant);
    }

    /// Number of stored ledger entries.
    pub async fn transaction_count(&self) -> usize {
        self.lock().await.transactions.len()
    }

    /// Number of stored points redemptions.
    pub async fn redemption_count(&self) -> usize {
        self.lock().await.redemptions.len()
    }

    /// Number of stored card-merchant associations.
    pub async fn card_merchant_count(&self) -> usize {
        self.lock().await.card_merchants.len()
    }
}

/// Newest `limit` rows of a chronologically ordered vector.
fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, limit: u32) -> Vec<T> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    rows.rev().take(limit).collect()
}

#[async_trait]
impl MerchantRepository for InMemoryStore {
    async fn find_merchant(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Option<Merchant>, MerchantRepositoryError> {
        Ok(self
            .lock()
            .await
            .merchants
            .iter()
            .find(|merchant| merchant.id == *merchant_id)
            .cloned())
    }

    async fn list_merchants(&self) -> Result<Vec<Merchant>, MerchantRepositoryError> {
        let mut merchants = self.lock().await.merchants.clone();
        merchants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(merchants)
    }
}
