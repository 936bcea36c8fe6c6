//! Customer and card registry services.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use crate::domain::ports::{
    CardCommand, CardQuery, CardStatusRequest, CreateCardRequest, CreateCustomerRequest,
    CustomerRepositoryError, LookupCardRequest,
};
use crate::domain::service_support::{
    Repositories, map_customer_error, map_ledger_error, optional_text,
};
use crate::domain::{
    Card, CardId, CardLookup, CardRegistration, CardStatus, Customer, CustomerId,
    CustomerProfile, Error,
};

const PROFILE_FIELD_MAX: usize = 200;

/// Implements [`CardCommand`] and [`CardQuery`].
#[derive(Clone)]
pub struct CardService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl CardService {
    /// Create the service.
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    fn normalise_profile(profile: &CustomerProfile) -> Result<CustomerProfile, Error> {
        Ok(CustomerProfile {
            name: optional_text("name", profile.name.as_deref(), PROFILE_FIELD_MAX)?,
            email: optional_text("email", profile.email.as_deref(), PROFILE_FIELD_MAX)?,
            phone: optional_text("phone", profile.phone.as_deref(), PROFILE_FIELD_MAX)?,
        })
    }

    fn uid_conflict(uid: &crate::domain::CardUid) -> Error {
        Error::conflict(format!(
            "card uid {uid} is already registered to another customer"
        ))
    }
}

#[async_trait]
impl CardCommand for CardService {
    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<Customer, Error> {
        self.repos.require_merchant(&request.merchant_id).await?;
        let customer = Customer {
            id: CustomerId::random(),
            profile: Self::normalise_profile(&request.profile)?,
            created_by_merchant_id: request.merchant_id,
            created_at: self.clock.utc(),
        };
        self.repos
            .customers
            .insert_customer(&customer)
            .await
            .map_err(map_customer_error)?;
        info!(
            merchant_id = %request.merchant_id,
            customer_id = %customer.id,
            "customer created"
        );
        Ok(customer)
    }

    async fn create_card(&self, request: CreateCardRequest) -> Result<CardRegistration, Error> {
        self.repos.require_merchant(&request.merchant_id).await?;
        self.repos.require_customer(&request.customer_id).await?;

        let existing = self
            .repos
            .customers
            .find_card_by_uid(&request.uid)
            .await
            .map_err(map_customer_error)?;
        if let Some(card) = existing {
            if card.customer_id == request.customer_id {
                return Ok(CardRegistration {
                    card,
                    created: false,
                });
            }
            return Err(Self::uid_conflict(&request.uid));
        }

        let card = Card {
            id: CardId::random(),
            uid: request.uid.clone(),
            customer_id: request.customer_id,
            issuing_merchant_id: request.merchant_id,
            created_at: self.clock.utc(),
        };
        match self.repos.customers.insert_card(&card).await {
            Ok(()) => {}
            Err(CustomerRepositoryError::UidTaken { .. }) => {
                // Lost a race with a concurrent registration of the same UID.
                let winner = self
                    .repos
                    .customers
                    .find_card_by_uid(&request.uid)
                    .await
                    .map_err(map_customer_error)?;
                return match winner {
                    Some(card) if card.customer_id == request.customer_id => {
                        Ok(CardRegistration {
                            card,
                            created: false,
                        })
                    }
                    _ => Err(Self::uid_conflict(&request.uid)),
                };
            }
            Err(other) => return Err(map_customer_error(other)),
        }

        info!(
            merchant_id = %request.merchant_id,
            customer_id = %card.customer_id,
            card_id = %card.id,
            "card registered"
        );
        Ok(CardRegistration {
            card,
            created: true,
        })
    }

    async fn lookup_card(&self, request: LookupCardRequest) -> Result<CardLookup, Error> {
        self.repos.require_merchant(&request.merchant_id).await?;
        let card = self
            .repos
            .customers
            .find_card_by_uid(&request.uid)
            .await
            .map_err(map_customer_error)?
            .ok_or_else(|| Error::not_found(format!("card {} not found", request.uid)))?;
        let link = self
            .repos
            .ledger
            .get_or_create_card_merchant(&card.id, &request.merchant_id)
            .await
            .map_err(map_ledger_error)?;
        if link.created {
            info!(
                merchant_id = %request.merchant_id,
                card_id = %card.id,
                "card associated with merchant"
            );
        }
        Ok(CardLookup {
            card,
            card_merchant_id: link.association.id,
            association_created: link.created,
        })
    }
}

#[async_trait]
impl CardQuery for CardService {
    async fn card_status(&self, request: CardStatusRequest) -> Result<CardStatus, Error> {
        let card = self
            .repos
            .customers
            .find_card_by_uid(&request.uid)
            .await
            .map_err(map_customer_error)?;
        let associated = match (&card, request.merchant_id) {
            (Some(card), Some(merchant_id)) => self
                .repos
                .ledger
                .find_card_merchant(&card.id, &merchant_id)
                .await
                .map_err(map_ledger_error)?
                .is_some(),
            _ => false,
        };
        Ok(CardStatus {
            uid: request.uid,
            card,
            associated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockCatalogueRepository, MockCheckpointRepository, MockCustomerRepository,
        MockLedgerRepository, MockMerchantRepository,
    };
    use crate::domain::{CardUid, ErrorCode, Merchant, MerchantId};
    use chrono::Utc;
    use mockable::DefaultClock;
    use rstest::rstest;

    fn merchant(id: MerchantId) -> Merchant {
        Merchant {
            id,
            name: "Corner Cafe".into(),
            description: None,
            logo_url: None,
        }
    }

    fn card_for(customer_id: CustomerId, uid: &str) -> Card {
        Card {
            id: CardId::random(),
            uid: CardUid::new(uid).expect("uid"),
            customer_id,
            issuing_merchant_id: MerchantId::random(),
            created_at: Utc::now(),
        }
    }

    fn service(
        merchants: MockMerchantRepository,
        customers: MockCustomerRepository,
        ledger: MockLedgerRepository,
    ) -> CardService {
        let repos = Repositories {
            merchants: Arc::new(merchants),
            customers: Arc::new(customers),
            ledger: Arc::new(ledger),
            checkpoints: Arc::new(MockCheckpointRepository::new()),
            catalogue: Arc::new(MockCatalogueRepository::new()),
        };
        CardService::new(repos, Arc::new(DefaultClock))
    }

    fn known_merchant() -> MockMerchantRepository {
        let mut merchants = MockMerchantRepository::new();
        merchants
            .expect_find_merchant()
            .returning(|id| Ok(Some(merchant(*id))));
        merchants
    }

    #[rstest]
    #[tokio::test]
    async fn create_card_rejects_uid_owned_by_another_customer() {
        let owner = CustomerId::random();
        let requester = CustomerId::random();
        let mut customers = MockCustomerRepository::new();
        customers.expect_find_customer().returning(|id| {
            Ok(Some(Customer {
                id: *id,
                profile: CustomerProfile::default(),
                created_by_merchant_id: MerchantId::random(),
                created_at: Utc::now(),
            }))
        });
        customers
            .expect_find_card_by_uid()
            .returning(move |_| Ok(Some(card_for(owner, "04A2"))));
        customers.expect_insert_card().never();

        let svc = service(known_merchant(), customers, MockLedgerRepository::new());
        let err = svc
            .create_card(CreateCardRequest {
                merchant_id: MerchantId::random(),
                uid: CardUid::new("04a2").expect("uid"),
                customer_id: requester,
            })
            .await
            .expect_err("conflict");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[tokio::test]
    async fn create_card_stores_card_and_issuer_link_in_one_write() {
        let issuer = MerchantId::random();
        let mut customers = MockCustomerRepository::new();
        customers.expect_find_customer().returning(|id| {
            Ok(Some(Customer {
                id: *id,
                profile: CustomerProfile::default(),
                created_by_merchant_id: MerchantId::random(),
                created_at: Utc::now(),
            }))
        });
        customers.expect_find_card_by_uid().returning(|_| Ok(None));
        customers
            .expect_insert_card()
            .withf(move |card| card.issuing_merchant_id == issuer)
            .times(1)
            .returning(|_| Ok(()));
        let mut ledger = MockLedgerRepository::new();
        ledger.expect_get_or_create_card_merchant().never();

        let registration = service(known_merchant(), customers, ledger)
            .create_card(CreateCardRequest {
                merchant_id: issuer,
                uid: CardUid::new("04b7").expect("uid"),
                customer_id: CustomerId::random(),
            })
            .await
            .expect("card created");
        assert!(registration.created);
        assert_eq!(registration.card.uid.as_ref(), "04B7");
    }

    #[rstest]
    #[tokio::test]
    async fn create_card_for_unknown_customer_is_not_found() {
        let mut customers = MockCustomerRepository::new();
        customers.expect_find_customer().returning(|_| Ok(None));
        let svc = service(known_merchant(), customers, MockLedgerRepository::new());
        let err = svc
            .create_card(CreateCardRequest {
                merchant_id: MerchantId::random(),
                uid: CardUid::new("04A2").expect("uid"),
                customer_id: CustomerId::random(),
            })
            .await
            .expect_err("missing customer");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn card_status_never_creates_associations() {
        let customer = CustomerId::random();
        let mut customers = MockCustomerRepository::new();
        customers
            .expect_find_card_by_uid()
            .returning(move |_| Ok(Some(card_for(customer, "04A2"))));
        let mut ledger = MockLedgerRepository::new();
        ledger.expect_find_card_merchant().returning(|_, _| Ok(None));
        ledger.expect_get_or_create_card_merchant().never();

        let svc = service(MockMerchantRepository::new(), customers, ledger);
        let status = svc
            .card_status(CardStatusRequest {
                merchant_id: Some(MerchantId::random()),
                uid: CardUid::new("04A2").expect("uid"),
            })
            .await
            .expect("status");
        assert!(status.card.is_some());
        assert!(!status.associated);
    }

    #[rstest]
    #[tokio::test]
    async fn repository_outage_maps_to_service_unavailable() {
        let mut customers = MockCustomerRepository::new();
        customers
            .expect_find_card_by_uid()
            .returning(|_| Err(CustomerRepositoryError::connection("refused")));
        let svc = service(known_merchant(), customers, MockLedgerRepository::new());
        let err = svc
            .lookup_card(LookupCardRequest {
                merchant_id: MerchantId::random(),
                uid: CardUid::new("04A2").expect("uid"),
            })
            .await
            .expect_err("outage");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
