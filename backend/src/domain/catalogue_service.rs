//! Merchant catalogue management and reads.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    CatalogueCommand, CatalogueQuery, CheckpointRewardDraft, MerchantCheckpoints, OfferDraft,
    RewardDraft, SetStepRequest,
};
use crate::domain::service_support::{
    Repositories, map_catalogue_error, map_ledger_error, map_merchant_error, optional_text,
    required_text,
};
use crate::domain::{
    CardId, CheckpointOffer, CheckpointReward, CheckpointRewardId, CheckpointStep,
    CustomerCatalogue, Error, MerchantCatalogue, MerchantId, OfferId, OfferWithSteps, Reward,
    RewardId, StepId,
};

const NAME_MAX: usize = 120;
const DESCRIPTION_MAX: usize = 1000;
const ICON_MAX: usize = 255;
/// Longest journey a merchant may configure.
pub const MAX_TOTAL_STEPS: u32 = 100;

fn out_of_range(field: &str, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({ "field": field, "code": "out_of_range" }))
}

fn validate_total_steps(raw: i64) -> Result<u32, Error> {
    u32::try_from(raw)
        .ok()
        .filter(|steps| (1..=MAX_TOTAL_STEPS).contains(steps))
        .ok_or_else(|| {
            out_of_range(
                "totalSteps",
                format!("totalSteps must be between 1 and {MAX_TOTAL_STEPS}"),
            )
        })
}

fn validate_price(raw: i64) -> Result<u32, Error> {
    u32::try_from(raw)
        .ok()
        .filter(|price| *price > 0)
        .ok_or_else(|| out_of_range("priceCoins", "priceCoins must be a positive integer".into()))
}

fn validate_step_number(raw: i64, total_steps: u32) -> Result<u32, Error> {
    u32::try_from(raw)
        .ok()
        .filter(|number| (1..=total_steps).contains(number))
        .ok_or_else(|| {
            out_of_range(
                "stepNumber",
                format!("stepNumber must be between 1 and {total_steps}"),
            )
        })
}

/// Implements [`CatalogueCommand`] and [`CatalogueQuery`].
#[derive(Clone)]
pub struct CatalogueService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl CatalogueService {
    /// Create the service.
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    async fn owned_checkpoint_reward(
        &self,
        merchant_id: &MerchantId,
        reward_id: &CheckpointRewardId,
    ) -> Result<CheckpointReward, Error> {
        self.repos
            .catalogue
            .find_checkpoint_reward(reward_id)
            .await
            .map_err(map_catalogue_error)?
            .filter(|reward| reward.merchant_id == *merchant_id)
            .ok_or_else(|| Error::not_found(format!("checkpoint reward {reward_id} not found")))
    }

    async fn owned_reward(
        &self,
        merchant_id: &MerchantId,
        reward_id: &RewardId,
    ) -> Result<Reward, Error> {
        self.repos
            .catalogue
            .find_reward(reward_id)
            .await
            .map_err(map_catalogue_error)?
            .filter(|reward| reward.merchant_id == *merchant_id)
            .ok_or_else(|| Error::not_found(format!("reward {reward_id} not found")))
    }

    async fn offers_with_steps(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<OfferWithSteps>, Error> {
        let offers = self
            .repos
            .catalogue
            .offers_for(merchant_id)
            .await
            .map_err(map_catalogue_error)?;
        let mut out = Vec::with_capacity(offers.len());
        for offer in offers {
            let steps = self
                .repos
                .catalogue
                .steps_for(&offer.id)
                .await
                .map_err(map_catalogue_error)?;
            out.push(OfferWithSteps { offer, steps });
        }
        Ok(out)
    }

    async fn catalogue_for(
        &self,
        merchant: crate::domain::Merchant,
        active_only: bool,
    ) -> Result<MerchantCatalogue, Error> {
        let mut rewards = self
            .repos
            .catalogue
            .rewards_for(&merchant.id)
            .await
            .map_err(map_catalogue_error)?;
        if active_only {
            rewards.retain(|reward| reward.is_active);
        }
        let checkpoint_rewards = self
            .repos
            .catalogue
            .checkpoint_rewards_for(&merchant.id)
            .await
            .map_err(map_catalogue_error)?;
        let offers = self.offers_with_steps(&merchant.id).await?;
        Ok(MerchantCatalogue {
            merchant,
            rewards,
            checkpoint_rewards,
            offers,
        })
    }

    fn checkpoint_reward_fields(
        draft: &CheckpointRewardDraft,
    ) -> Result<(String, Option<String>, Option<String>), Error> {
        Ok((
            required_text("name", &draft.name, NAME_MAX)?,
            optional_text("description", draft.description.as_deref(), DESCRIPTION_MAX)?,
            optional_text("icon", draft.icon.as_deref(), ICON_MAX)?,
        ))
    }
}

#[async_trait]
impl CatalogueCommand for CatalogueService {
    async fn create_offer(
        &self,
        merchant_id: MerchantId,
        draft: OfferDraft,
    ) -> Result<CheckpointOffer, Error> {
        let offer = CheckpointOffer {
            id: OfferId::random(),
            merchant_id,
            name: required_text("name", &draft.name, NAME_MAX)?,
            description: optional_text("description", draft.description.as_deref(), DESCRIPTION_MAX)?,
            total_steps: validate_total_steps(draft.total_steps)?,
            created_at: self.clock.utc(),
        };
        self.repos.require_merchant(&merchant_id).await?;
        self.repos
            .catalogue
            .insert_offer(&offer)
            .await
            .map_err(map_catalogue_error)?;
        info!(%merchant_id, offer_id = %offer.id, total_steps = offer.total_steps, "checkpoint offer created");
        Ok(offer)
    }

    async fn update_offer(
        &self,
        merchant_id: MerchantId,
        offer_id: OfferId,
        draft: OfferDraft,
    ) -> Result<CheckpointOffer, Error> {
        let name = required_text("name", &draft.name, NAME_MAX)?;
        let description =
            optional_text("description", draft.description.as_deref(), DESCRIPTION_MAX)?;
        let total_steps = validate_total_steps(draft.total_steps)?;
        let existing = self.repos.require_offer(&merchant_id, &offer_id).await?;
        let updated = CheckpointOffer {
            name,
            description,
            total_steps,
            ..existing.clone()
        };
        let found = self
            .repos
            .catalogue
            .update_offer(&updated)
            .await
            .map_err(map_catalogue_error)?;
        if !found {
            return Err(Error::not_found(format!("checkpoint offer {offer_id} not found")));
        }
        info!(
            %merchant_id,
            %offer_id,
            from_steps = existing.total_steps,
            to_steps = total_steps,
            "checkpoint offer updated"
        );
        Ok(updated)
    }

    async fn delete_offer(&self, merchant_id: MerchantId, offer_id: OfferId) -> Result<(), Error> {
        self.repos.require_offer(&merchant_id, &offer_id).await?;
        let found = self
            .repos
            .catalogue
            .delete_offer(&offer_id)
            .await
            .map_err(map_catalogue_error)?;
        if !found {
            return Err(Error::not_found(format!("checkpoint offer {offer_id} not found")));
        }
        info!(%merchant_id, %offer_id, "checkpoint offer deleted");
        Ok(())
    }

    async fn set_step(&self, request: SetStepRequest) -> Result<CheckpointStep, Error> {
        let offer = self
            .repos
            .require_offer(&request.merchant_id, &request.offer_id)
            .await?;
        let step_number = validate_step_number(request.step_number, offer.total_steps)?;
        if let Some(reward_id) = &request.reward_id {
            self.owned_checkpoint_reward(&request.merchant_id, reward_id)
                .await?;
        }
        let step = self
            .repos
            .catalogue
            .upsert_step(&CheckpointStep {
                id: StepId::random(),
                offer_id: offer.id,
                step_number,
                reward_id: request.reward_id,
            })
            .await
            .map_err(map_catalogue_error)?;
        info!(
            merchant_id = %request.merchant_id,
            offer_id = %offer.id,
            step_number,
            "checkpoint step set"
        );
        Ok(step)
    }

    async fn clear_step(
        &self,
        merchant_id: MerchantId,
        offer_id: OfferId,
        step_number: i64,
    ) -> Result<(), Error> {
        let offer = self.repos.require_offer(&merchant_id, &offer_id).await?;
        let step_number = validate_step_number(step_number, offer.total_steps)?;
        let found = self
            .repos
            .catalogue
            .delete_step(&offer.id, step_number)
            .await
            .map_err(map_catalogue_error)?;
        if !found {
            return Err(Error::not_found(format!(
                "step {step_number} of offer {offer_id} not found"
            )));
        }
        info!(%merchant_id, %offer_id, step_number, "checkpoint step cleared");
        Ok(())
    }

    async fn create_checkpoint_reward(
        &self,
        merchant_id: MerchantId,
        draft: CheckpointRewardDraft,
    ) -> Result<CheckpointReward, Error> {
        let (name, description, icon) = Self::checkpoint_reward_fields(&draft)?;
        self.repos.require_merchant(&merchant_id).await?;
        let reward = CheckpointReward {
            id: CheckpointRewardId::random(),
            merchant_id,
            name,
            description,
            icon,
        };
        self.repos
            .catalogue
            .insert_checkpoint_reward(&reward)
            .await
            .map_err(map_catalogue_error)?;
        info!(%merchant_id, reward_id = %reward.id, "checkpoint reward created");
        Ok(reward)
    }

    async fn update_checkpoint_reward(
        &self,
        merchant_id: MerchantId,
        reward_id: CheckpointRewardId,
        draft: CheckpointRewardDraft,
    ) -> Result<CheckpointReward, Error> {
        let (name, description, icon) = Self::checkpoint_reward_fields(&draft)?;
        let existing = self.owned_checkpoint_reward(&merchant_id, &reward_id).await?;
        let updated = CheckpointReward {
            name,
            description,
            icon,
            ..existing
        };
        let found = self
            .repos
            .catalogue
            .update_checkpoint_reward(&updated)
            .await
            .map_err(map_catalogue_error)?;
        if !found {
            return Err(Error::not_found(format!(
                "checkpoint reward {reward_id} not found"
            )));
        }
        info!(%merchant_id, %reward_id, "checkpoint reward updated");
        Ok(updated)
    }

    async fn delete_checkpoint_reward(
        &self,
        merchant_id: MerchantId,
        reward_id: CheckpointRewardId,
    ) -> Result<(), Error> {
        self.owned_checkpoint_reward(&merchant_id, &reward_id).await?;
        let found = self
            .repos
            .catalogue
            .delete_checkpoint_reward(&reward_id)
            .await
            .map_err(map_catalogue_error)?;
        if !found {
            return Err(Error::not_found(format!(
                "checkpoint reward {reward_id} not found"
            )));
        }
        info!(%merchant_id, %reward_id, "checkpoint reward deleted");
        Ok(())
    }

    async fn create_reward(
        &self,
        merchant_id: MerchantId,
        draft: RewardDraft,
    ) -> Result<Reward, Error> {
        let reward = Reward {
            id: RewardId::random(),
            merchant_id,
            name: required_text("name", &draft.name, NAME_MAX)?,
            description: optional_text("description", draft.description.as_deref(), DESCRIPTION_MAX)?,
            price_coins: validate_price(draft.price_coins)?,
            is_active: draft.is_active,
        };
        self.repos.require_merchant(&merchant_id).await?;
        self.repos
            .catalogue
            .insert_reward(&reward)
            .await
            .map_err(map_catalogue_error)?;
        info!(%merchant_id, reward_id = %reward.id, price = reward.price_coins, "reward created");
        Ok(reward)
    }

    async fn update_reward(
        &self,
        merchant_id: MerchantId,
        reward_id: RewardId,
        draft: RewardDraft,
    ) -> Result<Reward, Error> {
        let name = required_text("name", &draft.name, NAME_MAX)?;
        let description =
            optional_text("description", draft.description.as_deref(), DESCRIPTION_MAX)?;
        let price_coins = validate_price(draft.price_coins)?;
        let existing = self.owned_reward(&merchant_id, &reward_id).await?;
        let updated = Reward {
            name,
            description,
            price_coins,
            is_active: draft.is_active,
            ..existing
        };
        let found = self
            .repos
            .catalogue
            .update_reward(&updated)
            .await
            .map_err(map_catalogue_error)?;
        if !found {
            return Err(Error::not_found(format!("reward {reward_id} not found")));
        }
        info!(%merchant_id, %reward_id, "reward updated");
        Ok(updated)
    }

    async fn delete_reward(&self, merchant_id: MerchantId, reward_id: RewardId) -> Result<(), Error> {
        self.owned_reward(&merchant_id, &reward_id).await?;
        let found = self
            .repos
            .catalogue
            .delete_reward(&reward_id)
            .await
            .map_err(map_catalogue_error)?;
        if !found {
            return Err(Error::not_found(format!("reward {reward_id} not found")));
        }
        info!(%merchant_id, %reward_id, "reward deleted");
        Ok(())
    }
}

#[async_trait]
impl CatalogueQuery for CatalogueService {
    async fn list_merchants(&self) -> Result<Vec<MerchantCatalogue>, Error> {
        let merchants = self
            .repos
            .merchants
            .list_merchants()
            .await
            .map_err(map_merchant_error)?;
        let mut out = Vec::with_capacity(merchants.len());
        for merchant in merchants {
            out.push(self.catalogue_for(merchant, true).await?);
        }
        Ok(out)
    }

    async fn merchant_rewards(&self, merchant_id: MerchantId) -> Result<Vec<Reward>, Error> {
        self.repos.require_merchant(&merchant_id).await?;
        self.repos
            .catalogue
            .rewards_for(&merchant_id)
            .await
            .map_err(map_catalogue_error)
    }

    async fn merchant_checkpoints(
        &self,
        merchant_id: MerchantId,
    ) -> Result<MerchantCheckpoints, Error> {
        self.repos.require_merchant(&merchant_id).await?;
        let offers = self.offers_with_steps(&merchant_id).await?;
        let rewards = self
            .repos
            .catalogue
            .checkpoint_rewards_for(&merchant_id)
            .await
            .map_err(map_catalogue_error)?;
        Ok(MerchantCheckpoints { offers, rewards })
    }

    async fn rewards_and_checkpoints(
        &self,
        merchant_id: MerchantId,
        card_id: CardId,
    ) -> Result<CustomerCatalogue, Error> {
        let merchant = self.repos.require_merchant(&merchant_id).await?;
        let card = self.repos.require_card(&card_id).await?;
        let catalogue = self.catalogue_for(merchant, true).await?;
        let balance = match self
            .repos
            .ledger
            .find_card_merchant(&card.id, &merchant_id)
            .await
            .map_err(map_ledger_error)?
        {
            Some(association) => self
                .repos
                .ledger
                .balance_for(&association.id)
                .await
                .map_err(map_ledger_error)?,
            None => 0,
        };
        let progress = self
            .repos
            .progress_for(&card.customer_id, &merchant_id)
            .await?;
        Ok(CustomerCatalogue {
            catalogue,
            balance,
            progress,
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
    use crate::domain::{ErrorCode, Merchant};
    use chrono::Utc;
    use mockable::DefaultClock;
    use rstest::rstest;

    fn service(catalogue: MockCatalogueRepository) -> CatalogueService {
        let mut merchants = MockMerchantRepository::new();
        merchants.expect_find_merchant().returning(|id| {
            Ok(Some(Merchant {
                id: *id,
                name: "Florist".into(),
                description: None,
                logo_url: None,
            }))
        });
        CatalogueService::new(
            Repositories {
                merchants: Arc::new(merchants),
                customers: Arc::new(MockCustomerRepository::new()),
                ledger: Arc::new(MockLedgerRepository::new()),
                checkpoints: Arc::new(MockCheckpointRepository::new()),
                catalogue: Arc::new(catalogue),
            },
            Arc::new(DefaultClock),
        )
    }

    fn offer(merchant_id: MerchantId, total_steps: u32) -> CheckpointOffer {
        CheckpointOffer {
            id: OfferId::random(),
            merchant_id,
            name: "Bouquets".into(),
            description: None,
            total_steps,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(0)]
    #[case(-3)]
    #[case(i64::from(MAX_TOTAL_STEPS) + 1)]
    fn total_steps_outside_range_are_rejected(#[case] raw: i64) {
        let err = validate_total_steps(raw).expect_err("out of range");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(i64::from(u32::MAX) + 1)]
    fn non_positive_prices_are_rejected(#[case] raw: i64) {
        assert!(validate_price(raw).is_err());
    }

    #[rstest]
    fn step_numbers_must_fit_the_offer() {
        assert_eq!(validate_step_number(3, 3), Ok(3));
        assert!(validate_step_number(4, 3).is_err());
        assert!(validate_step_number(0, 3).is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn updating_a_foreign_offer_is_not_found() {
        let foreign = offer(MerchantId::random(), 5);
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_offer()
            .returning(move |_| Ok(Some(foreign.clone())));
        catalogue.expect_update_offer().never();

        let err = service(catalogue)
            .update_offer(
                MerchantId::random(),
                OfferId::random(),
                OfferDraft {
                    name: "Hijack".into(),
                    description: None,
                    total_steps: 2,
                },
            )
            .await
            .expect_err("foreign offer");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn steps_cannot_reference_foreign_rewards() {
        let merchant_id = MerchantId::random();
        let own = offer(merchant_id, 4);
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_offer()
            .returning(move |_| Ok(Some(own.clone())));
        catalogue.expect_find_checkpoint_reward().returning(|id| {
            Ok(Some(CheckpointReward {
                id: *id,
                merchant_id: MerchantId::random(),
                name: "Not yours".into(),
                description: None,
                icon: None,
            }))
        });
        catalogue.expect_upsert_step().never();

        let err = service(catalogue)
            .set_step(SetStepRequest {
                merchant_id,
                offer_id: OfferId::random(),
                step_number: 2,
                reward_id: Some(CheckpointRewardId::random()),
            })
            .await
            .expect_err("foreign reward");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn shrinking_an_offer_delegates_to_the_repository() {
        let merchant_id = MerchantId::random();
        let own = offer(merchant_id, 6);
        let offer_id = own.id;
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_find_offer()
            .returning(move |_| Ok(Some(own.clone())));
        catalogue
            .expect_update_offer()
            .withf(|offer| offer.total_steps == 3)
            .times(1)
            .returning(|_| Ok(true));

        let updated = service(catalogue)
            .update_offer(
                merchant_id,
                offer_id,
                OfferDraft {
                    name: "Bouquets".into(),
                    description: None,
                    total_steps: 3,
                },
            )
            .await
            .expect("updated");
        assert_eq!(updated.total_steps, 3);
    }
}
