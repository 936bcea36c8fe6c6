//! Shared harness wiring every loyalty service over one in-memory store.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use loyalty_backend::domain::ports::{
    CardCommand, CatalogueCommand, CheckpointRewardDraft, CreateCardRequest,
    CreateCustomerRequest, OfferDraft, RewardDraft, SetStepRequest,
};
use loyalty_backend::domain::{
    CardId, CardService, CardUid, CatalogueService, CheckpointRewardId, CheckpointService,
    CustomerId, CustomerProfile, LedgerService, Merchant, MerchantId, OfferId, RedemptionService,
    Repositories, RewardId,
};
use loyalty_backend::inbound::http::state::HttpState;
use loyalty_backend::outbound::memory::InMemoryStore;

/// A registered customer and their card.
#[derive(Debug, Clone, Copy)]
pub struct Holder {
    pub customer_id: CustomerId,
    pub card_id: CardId,
}

/// Services and the store behind them.
pub struct Loyalty {
    pub store: Arc<InMemoryStore>,
    pub repos: Repositories,
    pub clock: Arc<dyn Clock>,
    pub cards: CardService,
    pub ledger: LedgerService,
    pub checkpoints: CheckpointService,
    pub redemptions: RedemptionService,
    pub catalogue: CatalogueService,
}

impl Loyalty {
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let repos = Repositories::from_store(store.clone());
        Self {
            cards: CardService::new(repos.clone(), clock.clone()),
            ledger: LedgerService::new(repos.clone(), clock.clone()),
            checkpoints: CheckpointService::new(repos.clone(), clock.clone()),
            redemptions: RedemptionService::new(repos.clone(), clock.clone()),
            catalogue: CatalogueService::new(repos.clone(), clock.clone()),
            store,
            repos,
            clock,
        }
    }

    /// Handler state over the same store.
    pub fn http_state(&self) -> HttpState {
        HttpState::from_repositories(&self.repos, &self.clock, 50)
    }

    pub async fn merchant(&self, name: &str) -> MerchantId {
        let id = MerchantId::random();
        self.store
            .insert_merchant(Merchant {
                id,
                name: name.to_owned(),
                description: None,
                logo_url: None,
            })
            .await;
        id
    }

    /// Register a customer at `merchant_id` and issue them the card `uid`.
    pub async fn holder(&self, merchant_id: MerchantId, uid: &str) -> Holder {
        let customer = self
            .cards
            .create_customer(CreateCustomerRequest {
                merchant_id,
                profile: CustomerProfile::default(),
            })
            .await
            .expect("customer created");
        let registration = self
            .cards
            .create_card(CreateCardRequest {
                merchant_id,
                uid: CardUid::new(uid).expect("valid uid"),
                customer_id: customer.id,
            })
            .await
            .expect("card created");
        Holder {
            customer_id: customer.id,
            card_id: registration.card.id,
        }
    }

    pub async fn reward(&self, merchant_id: MerchantId, name: &str, price: i64) -> RewardId {
        self.catalogue
            .create_reward(
                merchant_id,
                RewardDraft {
                    name: name.to_owned(),
                    description: None,
                    price_coins: price,
                    is_active: true,
                },
            )
            .await
            .expect("reward created")
            .id
    }

    pub async fn milestone(&self, merchant_id: MerchantId, name: &str) -> CheckpointRewardId {
        self.catalogue
            .create_checkpoint_reward(
                merchant_id,
                CheckpointRewardDraft {
                    name: name.to_owned(),
                    description: None,
                    icon: None,
                },
            )
            .await
            .expect("milestone reward created")
            .id
    }

    /// Create an offer with `total_steps` steps; `rewards` pairs a step
    /// number with the milestone reward it grants.
    pub async fn offer(
        &self,
        merchant_id: MerchantId,
        total_steps: i64,
        rewards: &[(i64, CheckpointRewardId)],
    ) -> OfferId {
        let offer = self
            .catalogue
            .create_offer(
                merchant_id,
                OfferDraft {
                    name: "Coffee journey".to_owned(),
                    description: None,
                    total_steps,
                },
            )
            .await
            .expect("offer created");
        for step_number in 1..=total_steps {
            let reward_id = rewards
                .iter()
                .find(|(number, _)| *number == step_number)
                .map(|(_, reward)| *reward);
            self.catalogue
                .set_step(SetStepRequest {
                    merchant_id,
                    offer_id: offer.id,
                    step_number,
                    reward_id,
                })
                .await
                .expect("step set");
        }
        offer.id
    }
}
