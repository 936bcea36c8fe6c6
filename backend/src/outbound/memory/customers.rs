//! Customer and card storage.

use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::ports::{CustomerRepository, CustomerRepositoryError};
use crate::domain::{Card, CardId, CardUid, Customer, CustomerId};

#[async_trait]
impl CustomerRepository for InMemoryStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<(), CustomerRepositoryError> {
        self.lock().await.customers.push(customer.clone());
        Ok(())
    }

    async fn find_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Customer>, CustomerRepositoryError> {
        Ok(self
            .lock()
            .await
            .customers
            .iter()
            .find(|customer| customer.id == *customer_id)
            .cloned())
    }

    async fn insert_card(&self, card: &Card) -> Result<(), CustomerRepositoryError> {
        let mut inner = self.lock().await;
        if inner.cards.iter().any(|existing| existing.uid == card.uid) {
            return Err(CustomerRepositoryError::uid_taken(card.uid.to_string()));
        }
        inner.cards.push(card.clone());
        inner.link(&card.id, &card.issuing_merchant_id, card.created_at);
        Ok(())
    }

    async fn find_card(&self, card_id: &CardId) -> Result<Option<Card>, CustomerRepositoryError> {
        Ok(self
            .lock()
            .await
            .cards
            .iter()
            .find(|card| card.id == *card_id)
            .cloned())
    }

    async fn find_card_by_uid(
        &self,
        uid: &CardUid,
    ) -> Result<Option<Card>, CustomerRepositoryError> {
        Ok(self
            .lock()
            .await
            .cards
            .iter()
            .find(|card| card.uid == *uid)
            .cloned())
    }

    async fn primary_card_for(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Card>, CustomerRepositoryError> {
        Ok(self
            .lock()
            .await
            .cards
            .iter()
            .find(|card| card.customer_id == *customer_id)
            .cloned())
    }
}
