//! Reward redemption service.
//!
//! A points redemption writes a debit and the redemption record in one
//! repository call so a failure can never leave an unexplained debit behind.
//! Clients may send an idempotency key; retrying with the same key returns the
//! stored redemption instead of debiting twice.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    LedgerRepositoryError, RedeemCheckpointRewardRequest, RedeemRewardRequest,
    RedeemRewardResponse, RedemptionCommand, RedemptionDraft,
};
use crate::domain::service_support::{
    Repositories, map_catalogue_error, map_checkpoint_error, map_customer_error, map_ledger_error,
};
use crate::domain::{
    CheckpointRedemption, CheckpointRedemptionId, Error, MerchantId, Redemption, RedemptionId,
    RedemptionKey, RedemptionStatus, Reward, TransactionId,
};

/// Implements [`RedemptionCommand`].
#[derive(Clone)]
pub struct RedemptionService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl RedemptionService {
    /// Create the service.
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    async fn merchant_reward(
        &self,
        merchant_id: &MerchantId,
        request: &RedeemRewardRequest,
    ) -> Result<Reward, Error> {
        // Foreign rewards are reported exactly like missing ones.
        self.repos
            .catalogue
            .find_reward(&request.reward_id)
            .await
            .map_err(map_catalogue_error)?
            .filter(|reward| reward.merchant_id == *merchant_id)
            .ok_or_else(|| Error::not_found(format!("reward {} not found", request.reward_id)))
    }

    async fn replay(
        &self,
        request: &RedeemRewardRequest,
        key: &RedemptionKey,
    ) -> Result<Option<RedeemRewardResponse>, Error> {
        let stored = self
            .repos
            .ledger
            .find_redemption_by_key(&request.merchant_id, key)
            .await
            .map_err(map_ledger_error)?;
        let Some(redemption) = stored else {
            return Ok(None);
        };
        if redemption.customer_id != request.customer_id
            || redemption.reward_id != request.reward_id
        {
            warn!(
                merchant_id = %request.merchant_id,
                "idempotency key reused for a different redemption"
            );
            return Err(Error::conflict(
                "idempotency key was already used for a different redemption",
            ));
        }
        Ok(Some(RedeemRewardResponse {
            redemption,
            replayed: true,
        }))
    }

    fn check_price(reward: &Reward, points_spent: Option<i64>) -> Result<(), Error> {
        match points_spent {
            Some(points) if points != i64::from(reward.price_coins) => {
                Err(Error::invalid_request(format!(
                    "pointsSpent must equal the reward price of {}",
                    reward.price_coins
                ))
                .with_details(serde_json::json!({
                    "field": "pointsSpent",
                    "expected": reward.price_coins,
                    "actual": points,
                })))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RedemptionCommand for RedemptionService {
    async fn redeem_reward(
        &self,
        request: RedeemRewardRequest,
    ) -> Result<RedeemRewardResponse, Error> {
        self.repos.require_merchant(&request.merchant_id).await?;
        if let Some(key) = &request.idempotency_key {
            if let Some(replayed) = self.replay(&request, key).await? {
                return Ok(replayed);
            }
        }

        let reward = self.merchant_reward(&request.merchant_id, &request).await?;
        if !reward.is_active {
            return Err(Error::invalid_request(format!(
                "reward {} is not active",
                reward.id
            )));
        }
        Self::check_price(&reward, request.points_spent)?;

        let customer = self.repos.require_customer(&request.customer_id).await?;
        let card = self
            .repos
            .customers
            .primary_card_for(&customer.id)
            .await
            .map_err(map_customer_error)?
            .ok_or_else(|| Error::not_found(format!("customer {} has no card", customer.id)))?;

        let draft = RedemptionDraft {
            card_id: card.id,
            redemption: Redemption {
                id: RedemptionId::random(),
                customer_id: customer.id,
                merchant_id: request.merchant_id,
                reward_id: reward.id,
                points_spent: reward.price_coins,
                status: request.status.unwrap_or_default(),
                transaction_id: TransactionId::random(),
                idempotency_key: request.idempotency_key.clone(),
                created_at: self.clock.utc(),
            },
        };

        let redemption = match self.repos.ledger.redeem(&draft).await {
            Ok(redemption) => redemption,
            Err(LedgerRepositoryError::DuplicateRedemptionKey { .. }) => {
                // A concurrent request with the same key committed first.
                if let Some(key) = &request.idempotency_key {
                    if let Some(replayed) = self.replay(&request, key).await? {
                        return Ok(replayed);
                    }
                }
                return Err(Error::conflict("idempotency key is already in use"));
            }
            Err(other) => return Err(map_ledger_error(other)),
        };

        info!(
            merchant_id = %redemption.merchant_id,
            customer_id = %redemption.customer_id,
            reward_id = %redemption.reward_id,
            points = redemption.points_spent,
            "reward redeemed"
        );
        Ok(RedeemRewardResponse {
            redemption,
            replayed: false,
        })
    }

    async fn redeem_checkpoint_reward(
        &self,
        request: RedeemCheckpointRewardRequest,
    ) -> Result<CheckpointRedemption, Error> {
        self.repos.require_merchant(&request.merchant_id).await?;
        let reward = self
            .repos
            .catalogue
            .find_checkpoint_reward(&request.reward_id)
            .await
            .map_err(map_catalogue_error)?
            .filter(|reward| reward.merchant_id == request.merchant_id)
            .ok_or_else(|| {
                Error::not_found(format!("checkpoint reward {} not found", request.reward_id))
            })?;

        let step = self
            .repos
            .catalogue
            .find_step(&request.step_id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("checkpoint step {} not found", request.step_id)))?;
        self.repos
            .require_offer(&request.merchant_id, &step.offer_id)
            .await
            .map_err(|_| Error::not_found(format!("checkpoint step {} not found", step.id)))?;
        if step.reward_id != Some(reward.id) {
            return Err(Error::invalid_request(format!(
                "checkpoint step {} does not grant reward {}",
                step.id, reward.id
            )));
        }

        let customer = self.repos.require_customer(&request.customer_id).await?;
        let redemption = CheckpointRedemption {
            id: CheckpointRedemptionId::random(),
            customer_id: customer.id,
            merchant_id: request.merchant_id,
            reward_id: reward.id,
            step_id: step.id,
            status: RedemptionStatus::Pending,
            created_at: self.clock.utc(),
        };
        self.repos
            .checkpoints
            .insert_checkpoint_redemption(&redemption)
            .await
            .map_err(map_checkpoint_error)?;

        info!(
            merchant_id = %redemption.merchant_id,
            customer_id = %redemption.customer_id,
            reward_id = %redemption.reward_id,
            step_id = %redemption.step_id,
            "checkpoint reward redeemed"
        );
        Ok(redemption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockCatalogueRepository, MockCheckpointRepository, MockCustomerRepository,
        MockLedgerRepository, MockMerchantRepository,
    };
    use crate::domain::{
        Card, CardId, CardUid, Customer, CustomerId, CustomerProfile, ErrorCode, Merchant,
        RewardId,
    };
    use chrono::Utc;
    use mockable::DefaultClock;
    use rstest::rstest;

    fn reward(merchant_id: MerchantId, price: u32, active: bool) -> Reward {
        Reward {
            id: RewardId::random(),
            merchant_id,
            name: "Tote bag".into(),
            description: None,
            price_coins: price,
            is_active: active,
        }
    }

    fn merchants() -> MockMerchantRepository {
        let mut merchants = MockMerchantRepository::new();
        merchants.expect_find_merchant().returning(|id| {
            Ok(Some(Merchant {
                id: *id,
                name: "Books".into(),
                description: None,
                logo_url: None,
            }))
        });
        merchants
    }

    fn customers_with_card() -> MockCustomerRepository {
        let mut customers = MockCustomerRepository::new();
        customers.expect_find_customer().returning(|id| {
            Ok(Some(Customer {
                id: *id,
                profile: CustomerProfile::default(),
                created_by_merchant_id: MerchantId::random(),
                created_at: Utc::now(),
            }))
        });
        customers.expect_primary_card_for().returning(|customer_id| {
            Ok(Some(Card {
                id: CardId::random(),
                uid: CardUid::new("C0FFEE").expect("uid"),
                customer_id: *customer_id,
                issuing_merchant_id: MerchantId::random(),
                created_at: Utc::now(),
            }))
        });
        customers
    }

    fn service(
        customers: MockCustomerRepository,
        ledger: MockLedgerRepository,
        catalogue: MockCatalogueRepository,
    ) -> RedemptionService {
        RedemptionService::new(
            Repositories {
                merchants: Arc::new(merchants()),
                customers: Arc::new(customers),
                ledger: Arc::new(ledger),
                checkpoints: Arc::new(MockCheckpointRepository::new()),
                catalogue: Arc::new(catalogue),
            },
            Arc::new(DefaultClock),
        )
    }

    fn request(merchant_id: MerchantId, reward_id: RewardId) -> RedeemRewardRequest {
        RedeemRewardRequest {
            merchant_id,
            customer_id: CustomerId::random(),
            reward_id,
            points_spent: None,
            status: None,
            idempotency_key: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn foreign_reward_is_not_found_and_nothing_is_written() {
        let foreign = reward(MerchantId::random(), 100, true);
        let reward_id = foreign.id;
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_reward()
            .returning(move |_| Ok(Some(foreign.clone())));
        let mut ledger = MockLedgerRepository::new();
        ledger.expect_redeem().never();

        let err = service(customers_with_card(), ledger, catalogue)
            .redeem_reward(request(MerchantId::random(), reward_id))
            .await
            .expect_err("foreign reward");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn inactive_reward_is_rejected() {
        let merchant_id = MerchantId::random();
        let inactive = reward(merchant_id, 100, false);
        let reward_id = inactive.id;
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_reward()
            .returning(move |_| Ok(Some(inactive.clone())));
        let mut ledger = MockLedgerRepository::new();
        ledger.expect_redeem().never();

        let err = service(customers_with_card(), ledger, catalogue)
            .redeem_reward(request(merchant_id, reward_id))
            .await
            .expect_err("inactive");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn mismatched_points_are_rejected() {
        let merchant_id = MerchantId::random();
        let priced = reward(merchant_id, 100, true);
        let reward_id = priced.id;
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_reward()
            .returning(move |_| Ok(Some(priced.clone())));

        let mut req = request(merchant_id, reward_id);
        req.points_spent = Some(90);
        let err = service(customers_with_card(), MockLedgerRepository::new(), catalogue)
            .redeem_reward(req)
            .await
            .expect_err("price mismatch");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn debit_is_exactly_the_price_with_pending_default() {
        let merchant_id = MerchantId::random();
        let priced = reward(merchant_id, 120, true);
        let reward_id = priced.id;
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_reward()
            .returning(move |_| Ok(Some(priced.clone())));
        let mut ledger = MockLedgerRepository::new();
        ledger
            .expect_redeem()
            .withf(|draft| {
                draft.redemption.points_spent == 120
                    && draft.redemption.status == RedemptionStatus::Pending
            })
            .times(1)
            .returning(|draft| Ok(draft.redemption.clone()));

        let response = service(customers_with_card(), ledger, catalogue)
            .redeem_reward(request(merchant_id, reward_id))
            .await
            .expect("redeemed");
        assert!(!response.replayed);
        assert_eq!(response.redemption.points_spent, 120);
    }

    #[rstest]
    #[tokio::test]
    async fn redemption_never_reads_the_balance_first() {
        let merchant_id = MerchantId::random();
        let priced = reward(merchant_id, 500, true);
        let reward_id = priced.id;
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_reward()
            .returning(move |_| Ok(Some(priced.clone())));
        let mut ledger = MockLedgerRepository::new();
        ledger.expect_balance_for().never();
        ledger.expect_find_card_merchant().never();
        ledger
            .expect_redeem()
            .withf(|draft| draft.redemption.points_spent == 500)
            .times(1)
            .returning(|draft| Ok(draft.redemption.clone()));

        let response = service(customers_with_card(), ledger, catalogue)
            .redeem_reward(request(merchant_id, reward_id))
            .await
            .expect("redeemed");
        assert_eq!(response.redemption.points_spent, 500);
    }

    #[rstest]
    #[tokio::test]
    async fn stored_key_replays_without_writing() {
        let merchant_id = MerchantId::random();
        let reward_id = RewardId::random();
        let mut req = request(merchant_id, reward_id);
        let key = RedemptionKey::new("retry-1").expect("key");
        req.idempotency_key = Some(key.clone());
        let stored = Redemption {
            id: RedemptionId::random(),
            customer_id: req.customer_id,
            merchant_id,
            reward_id,
            points_spent: 50,
            status: RedemptionStatus::Pending,
            transaction_id: TransactionId::random(),
            idempotency_key: Some(key),
            created_at: Utc::now(),
        };
        let mut ledger = MockLedgerRepository::new();
        let replay = stored.clone();
        ledger
            .expect_find_redemption_by_key()
            .returning(move |_, _| Ok(Some(replay.clone())));
        ledger.expect_redeem().never();

        let response = service(
            MockCustomerRepository::new(),
            ledger,
            MockCatalogueRepository::new(),
        )
        .redeem_reward(req)
        .await
        .expect("replayed");
        assert!(response.replayed);
        assert_eq!(response.redemption, stored);
    }
}
