//! Checkpoint advancement engine.
//!
//! Resolves the customer and offer, then delegates the read-modify-write of
//! the cursor to [`crate::domain::ports::CheckpointRepository::move_cursor`],
//! which runs it atomically. The step arithmetic itself is
//! [`crate::domain::StepCursor`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use crate::domain::ports::{CheckpointCommand, CheckpointMoveRequest, CustomerSubject};
use crate::domain::service_support::{Repositories, map_catalogue_error, map_checkpoint_error};
use crate::domain::{
    AdvanceResult, CheckpointKey, CheckpointOffer, CursorMovement, CustomerId, Error,
    RewardSummary, RewindResult,
};

/// Implements [`CheckpointCommand`].
#[derive(Clone)]
pub struct CheckpointService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl CheckpointService {
    /// Create the service.
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    async fn resolve_customer(&self, subject: CustomerSubject) -> Result<CustomerId, Error> {
        match subject {
            CustomerSubject::Customer(customer_id) => {
                self.repos.require_customer(&customer_id).await.map(|c| c.id)
            }
            CustomerSubject::Card(card_id) => {
                self.repos.require_card(&card_id).await.map(|c| c.customer_id)
            }
        }
    }

    async fn resolve_offer(&self, request: &CheckpointMoveRequest) -> Result<CheckpointOffer, Error> {
        if let Some(offer_id) = request.offer_id {
            return self.repos.require_offer(&request.merchant_id, &offer_id).await;
        }
        self.repos
            .catalogue
            .offers_for(&request.merchant_id)
            .await
            .map_err(map_catalogue_error)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("merchant has no checkpoint offers"))
    }

    async fn resolve_key(
        &self,
        request: &CheckpointMoveRequest,
    ) -> Result<(CheckpointKey, CheckpointOffer), Error> {
        self.repos.require_merchant(&request.merchant_id).await?;
        let customer_id = self.resolve_customer(request.subject).await?;
        let offer = self.resolve_offer(request).await?;
        let key = CheckpointKey {
            customer_id,
            merchant_id: request.merchant_id,
            offer_id: offer.id,
        };
        Ok((key, offer))
    }

    async fn reward_at(
        &self,
        offer: &CheckpointOffer,
        step_number: u32,
    ) -> Result<Option<RewardSummary>, Error> {
        let Some(step) = self
            .repos
            .catalogue
            .step_at(&offer.id, step_number)
            .await
            .map_err(map_catalogue_error)?
        else {
            return Ok(None);
        };
        let Some(reward_id) = step.reward_id else {
            return Ok(None);
        };
        let reward = self
            .repos
            .catalogue
            .find_checkpoint_reward(&reward_id)
            .await
            .map_err(map_catalogue_error)?;
        Ok(reward
            .filter(|reward| reward.merchant_id == offer.merchant_id)
            .map(RewardSummary::from))
    }
}

#[async_trait]
impl CheckpointCommand for CheckpointService {
    async fn advance(&self, request: CheckpointMoveRequest) -> Result<AdvanceResult, Error> {
        let (key, offer) = self.resolve_key(&request).await?;
        let transition = self
            .repos
            .checkpoints
            .move_cursor(&key, CursorMovement::Advance, self.clock.utc())
            .await
            .map_err(map_checkpoint_error)?;
        let current = transition.current;
        let reward = self.reward_at(&offer, current.current_step()).await?;

        info!(
            merchant_id = %key.merchant_id,
            customer_id = %key.customer_id,
            offer_id = %key.offer_id,
            from = transition.previous.current_step(),
            to = current.current_step(),
            total = current.total_steps(),
            rewarded = reward.is_some(),
            "checkpoint advanced"
        );
        Ok(AdvanceResult {
            offer_id: key.offer_id,
            current_step: current.current_step(),
            total_steps: current.total_steps(),
            reward,
        })
    }

    async fn rewind(&self, request: CheckpointMoveRequest) -> Result<RewindResult, Error> {
        let (key, _) = self.resolve_key(&request).await?;
        let transition = self
            .repos
            .checkpoints
            .move_cursor(&key, CursorMovement::Rewind, self.clock.utc())
            .await
            .map_err(map_checkpoint_error)?;
        let current = transition.current;

        info!(
            merchant_id = %key.merchant_id,
            customer_id = %key.customer_id,
            offer_id = %key.offer_id,
            from = transition.previous.current_step(),
            to = current.current_step(),
            "checkpoint rewound"
        );
        Ok(RewindResult {
            offer_id: key.offer_id,
            current_step: current.current_step(),
            total_steps: current.total_steps(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        CheckpointRepositoryError, MockCatalogueRepository, MockCheckpointRepository,
        MockCustomerRepository, MockLedgerRepository, MockMerchantRepository,
    };
    use crate::domain::{
        CheckpointReward, CheckpointRewardId, CheckpointStep, Customer, CustomerProfile,
        CursorTransition, ErrorCode, Merchant, MerchantId, OfferId, StepCursor, StepId,
    };
    use chrono::Utc;
    use mockable::DefaultClock;
    use rstest::rstest;

    fn offer(merchant_id: MerchantId, total_steps: u32) -> CheckpointOffer {
        CheckpointOffer {
            id: OfferId::random(),
            merchant_id,
            name: "Ten coffees".into(),
            description: None,
            total_steps,
            created_at: Utc::now(),
        }
    }

    fn known_merchant() -> MockMerchantRepository {
        let mut merchants = MockMerchantRepository::new();
        merchants.expect_find_merchant().returning(|id| {
            Ok(Some(Merchant {
                id: *id,
                name: "Cafe".into(),
                description: None,
                logo_url: None,
            }))
        });
        merchants
    }

    fn known_customer() -> MockCustomerRepository {
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
    }

    fn service(
        customers: MockCustomerRepository,
        checkpoints: MockCheckpointRepository,
        catalogue: MockCatalogueRepository,
    ) -> CheckpointService {
        CheckpointService::new(
            Repositories {
                merchants: Arc::new(known_merchant()),
                customers: Arc::new(customers),
                ledger: Arc::new(MockLedgerRepository::new()),
                checkpoints: Arc::new(checkpoints),
                catalogue: Arc::new(catalogue),
            },
            Arc::new(DefaultClock),
        )
    }

    fn transition(from: u32, to: u32, total: u32) -> CursorTransition {
        CursorTransition {
            previous: StepCursor::new(from, total).expect("cursor"),
            current: StepCursor::new(to, total).expect("cursor"),
            created: from == 0,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn advance_reports_reward_on_rewarded_step() {
        let merchant_id = MerchantId::random();
        let journey = offer(merchant_id, 3);
        let offer_id = journey.id;
        let reward_id = CheckpointRewardId::random();

        let mut catalogue = MockCatalogueRepository::new();
        let listed = journey.clone();
        catalogue
            .expect_offers_for()
            .returning(move |_| Ok(vec![listed.clone()]));
        catalogue.expect_step_at().returning(move |offer_id, number| {
            Ok(Some(CheckpointStep {
                id: StepId::random(),
                offer_id: *offer_id,
                step_number: number,
                reward_id: Some(reward_id),
            }))
        });
        catalogue
            .expect_find_checkpoint_reward()
            .returning(move |id| {
                Ok(Some(CheckpointReward {
                    id: *id,
                    merchant_id,
                    name: "Free croissant".into(),
                    description: Some("Any flavour".into()),
                    icon: None,
                }))
            });
        let mut checkpoints = MockCheckpointRepository::new();
        checkpoints
            .expect_move_cursor()
            .withf(move |key, movement, _| {
                key.offer_id == offer_id && *movement == CursorMovement::Advance
            })
            .times(1)
            .returning(|_, _, _| Ok(transition(2, 3, 3)));

        let result = service(known_customer(), checkpoints, catalogue)
            .advance(CheckpointMoveRequest {
                merchant_id,
                subject: CustomerSubject::Customer(CustomerId::random()),
                offer_id: None,
            })
            .await
            .expect("advance");
        assert_eq!(result.current_step, 3);
        assert_eq!(result.total_steps, 3);
        assert_eq!(
            result.reward.map(|reward| reward.name),
            Some("Free croissant".to_owned())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn foreign_offer_is_not_found() {
        let foreign = offer(MerchantId::random(), 4);
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_offer()
            .returning(move |_| Ok(Some(foreign.clone())));
        let mut checkpoints = MockCheckpointRepository::new();
        checkpoints.expect_move_cursor().never();

        let err = service(known_customer(), checkpoints, catalogue)
            .advance(CheckpointMoveRequest {
                merchant_id: MerchantId::random(),
                subject: CustomerSubject::Customer(CustomerId::random()),
                offer_id: Some(OfferId::random()),
            })
            .await
            .expect_err("foreign offer");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn rewind_without_progress_is_not_found() {
        let merchant_id = MerchantId::random();
        let journey = offer(merchant_id, 4);
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_offer()
            .returning(move |_| Ok(Some(journey.clone())));
        let mut checkpoints = MockCheckpointRepository::new();
        checkpoints
            .expect_move_cursor()
            .returning(|_, _, _| Err(CheckpointRepositoryError::missing_cursor()));

        let err = service(known_customer(), checkpoints, catalogue)
            .rewind(CheckpointMoveRequest {
                merchant_id,
                subject: CustomerSubject::Customer(CustomerId::random()),
                offer_id: Some(OfferId::random()),
            })
            .await
            .expect_err("nothing to rewind");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn merchant_without_offers_is_not_found() {
        let mut catalogue = MockCatalogueRepository::new();
        catalogue.expect_offers_for().returning(|_| Ok(Vec::new()));
        let err = service(known_customer(), MockCheckpointRepository::new(), catalogue)
            .advance(CheckpointMoveRequest {
                merchant_id: MerchantId::random(),
                subject: CustomerSubject::Customer(CustomerId::random()),
                offer_id: None,
            })
            .await
            .expect_err("no offers");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_card_is_not_found() {
        let mut customers = MockCustomerRepository::new();
        customers.expect_find_card().returning(|_| Ok(None));
        let err = service(
            customers,
            MockCheckpointRepository::new(),
            MockCatalogueRepository::new(),
        )
        .advance(CheckpointMoveRequest {
            merchant_id: MerchantId::random(),
            subject: CustomerSubject::Card(crate::domain::CardId::random()),
            offer_id: None,
        })
        .await
        .expect_err("unknown card");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
