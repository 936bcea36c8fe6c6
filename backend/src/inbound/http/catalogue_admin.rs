//! Catalogue management HTTP handlers.
//!
//! ```text
//! POST   /checkpoint-offers
//! PUT    /checkpoint-offers/{offerId}
//! DELETE /checkpoint-offers/{offerId}
//! PUT    /checkpoint-offers/{offerId}/steps/{stepNumber}
//! DELETE /checkpoint-offers/{offerId}/steps/{stepNumber}
//! POST   /checkpoint-rewards
//! PUT    /checkpoint-rewards/{rewardId}
//! DELETE /checkpoint-rewards/{rewardId}
//! POST   /rewards
//! PUT    /rewards/{rewardId}
//! DELETE /rewards/{rewardId}
//! ```
//!
//! Every route acts for the merchant in `x-merchant-id`. Targets owned by
//! another merchant answer 404.

use actix_web::{HttpResponse, delete, post, put, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::{CheckpointRewardDraft, OfferDraft, RewardDraft, SetStepRequest};
use crate::domain::{CheckpointRewardId, Error, OfferId, RewardId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{
    CheckpointRewardResponse, OfferResponse, RewardResponse, StepResponse,
};
use crate::inbound::http::merchant::MerchantContext;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_id, parse_number, parse_optional_id, require,
};

const NAME: FieldName = FieldName::new("name");
const TOTAL_STEPS: FieldName = FieldName::new("totalSteps");
const PRICE_COINS: FieldName = FieldName::new("priceCoins");
const OFFER_ID: FieldName = FieldName::new("offerId");
const STEP_NUMBER: FieldName = FieldName::new("stepNumber");
const REWARD_ID: FieldName = FieldName::new("rewardId");

/// Fields of a checkpoint offer.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferBody {
    #[schema(example = "Coffee journey")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(example = 5)]
    pub total_steps: Option<i64>,
}

impl OfferBody {
    fn into_draft(self) -> Result<OfferDraft, Error> {
        Ok(OfferDraft {
            name: require(self.name, NAME)?,
            description: self.description,
            total_steps: require(self.total_steps, TOTAL_STEPS)?,
        })
    }
}

/// Reward attached to a step; omit or send `null` to detach.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepBody {
    pub reward_id: Option<String>,
}

/// Fields of a milestone reward.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRewardBody {
    #[schema(example = "Free espresso")]
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl CheckpointRewardBody {
    fn into_draft(self) -> Result<CheckpointRewardDraft, Error> {
        Ok(CheckpointRewardDraft {
            name: require(self.name, NAME)?,
            description: self.description,
            icon: self.icon,
        })
    }
}

/// Fields of a points-priced reward.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardBody {
    #[schema(example = "Tote bag")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(example = 150)]
    pub price_coins: Option<i64>,
    /// Defaults to `true`.
    pub is_active: Option<bool>,
}

impl RewardBody {
    fn into_draft(self) -> Result<RewardDraft, Error> {
        Ok(RewardDraft {
            name: require(self.name, NAME)?,
            description: self.description,
            price_coins: require(self.price_coins, PRICE_COINS)?,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

/// Create a checkpoint offer.
#[utoipa::path(
    post,
    path = "/checkpoint-offers",
    request_body = OfferBody,
    params(("x-merchant-id" = String, Header, description = "Acting merchant")),
    responses(
        (status = 201, description = "Offer created", body = OfferResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown merchant", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "createCheckpointOffer"
)]
#[post("/checkpoint-offers")]
pub async fn create_offer(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<OfferBody>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let draft = payload.into_inner().into_draft()?;
    let offer = state.catalogue.create_offer(merchant_id, draft).await?;
    info!(%merchant_id, offer_id = %offer.id, "checkpoint offer created");
    Ok(HttpResponse::Created().json(OfferResponse::from(offer)))
}

/// Replace an offer. Shrinking it drops steps beyond the new length and
/// clamps customer progress.
#[utoipa::path(
    put,
    path = "/checkpoint-offers/{offerId}",
    request_body = OfferBody,
    params(
        ("offerId" = String, Path, description = "Offer to update"),
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 200, description = "Offer updated", body = OfferResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown offer", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "updateCheckpointOffer"
)]
#[put("/checkpoint-offers/{offer_id}")]
pub async fn update_offer(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    path: web::Path<String>,
    payload: web::Json<OfferBody>,
) -> ApiResult<web::Json<OfferResponse>> {
    let merchant_id = merchant.require()?;
    let offer_id: OfferId = parse_id(&path, OFFER_ID)?;
    let draft = payload.into_inner().into_draft()?;
    let offer = state
        .catalogue
        .update_offer(merchant_id, offer_id, draft)
        .await?;
    info!(%merchant_id, %offer_id, total_steps = offer.total_steps, "checkpoint offer updated");
    Ok(web::Json(offer.into()))
}

/// Delete an offer with its steps and customer progress.
#[utoipa::path(
    delete,
    path = "/checkpoint-offers/{offerId}",
    params(
        ("offerId" = String, Path, description = "Offer to delete"),
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 204, description = "Offer deleted"),
        (status = 404, description = "Unknown offer", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "deleteCheckpointOffer"
)]
#[delete("/checkpoint-offers/{offer_id}")]
pub async fn delete_offer(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let offer_id: OfferId = parse_id(&path, OFFER_ID)?;
    state.catalogue.delete_offer(merchant_id, offer_id).await?;
    info!(%merchant_id, %offer_id, "checkpoint offer deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Create or replace a step.
#[utoipa::path(
    put,
    path = "/checkpoint-offers/{offerId}/steps/{stepNumber}",
    request_body = StepBody,
    params(
        ("offerId" = String, Path, description = "Offer"),
        ("stepNumber" = i64, Path, description = "Step between 1 and the offer's length"),
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 200, description = "Step stored", body = StepResponse),
        (status = 400, description = "Step number out of range", body = ErrorSchema),
        (status = 404, description = "Unknown offer or reward", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "setCheckpointStep"
)]
#[put("/checkpoint-offers/{offer_id}/steps/{step_number}")]
pub async fn set_step(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    path: web::Path<(String, String)>,
    payload: web::Json<StepBody>,
) -> ApiResult<web::Json<StepResponse>> {
    let merchant_id = merchant.require()?;
    let (raw_offer, raw_step) = path.into_inner();
    let step = state
        .catalogue
        .set_step(SetStepRequest {
            merchant_id,
            offer_id: parse_id(&raw_offer, OFFER_ID)?,
            step_number: parse_number(&raw_step, STEP_NUMBER)?,
            reward_id: parse_optional_id::<CheckpointRewardId>(
                payload.reward_id.as_deref(),
                REWARD_ID,
            )?,
        })
        .await?;
    Ok(web::Json(step.into()))
}

/// Remove a step.
#[utoipa::path(
    delete,
    path = "/checkpoint-offers/{offerId}/steps/{stepNumber}",
    params(
        ("offerId" = String, Path, description = "Offer"),
        ("stepNumber" = i64, Path, description = "Step to remove"),
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 204, description = "Step removed"),
        (status = 404, description = "Unknown offer or step", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "clearCheckpointStep"
)]
#[delete("/checkpoint-offers/{offer_id}/steps/{step_number}")]
pub async fn clear_step(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let (raw_offer, raw_step) = path.into_inner();
    let offer_id: OfferId = parse_id(&raw_offer, OFFER_ID)?;
    let step_number = parse_number(&raw_step, STEP_NUMBER)?;
    state
        .catalogue
        .clear_step(merchant_id, offer_id, step_number)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Create a milestone reward.
#[utoipa::path(
    post,
    path = "/checkpoint-rewards",
    request_body = CheckpointRewardBody,
    params(("x-merchant-id" = String, Header, description = "Acting merchant")),
    responses(
        (status = 201, description = "Reward created", body = CheckpointRewardResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown merchant", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "createCheckpointReward"
)]
#[post("/checkpoint-rewards")]
pub async fn create_checkpoint_reward(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<CheckpointRewardBody>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let draft = payload.into_inner().into_draft()?;
    let reward = state
        .catalogue
        .create_checkpoint_reward(merchant_id, draft)
        .await?;
    info!(%merchant_id, reward_id = %reward.id, "checkpoint reward created");
    Ok(HttpResponse::Created().json(CheckpointRewardResponse::from(reward)))
}

/// Replace a milestone reward.
#[utoipa::path(
    put,
    path = "/checkpoint-rewards/{rewardId}",
    request_body = CheckpointRewardBody,
    params(
        ("rewardId" = String, Path, description = "Reward to update"),
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 200, description = "Reward updated", body = CheckpointRewardResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown reward", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "updateCheckpointReward"
)]
#[put("/checkpoint-rewards/{reward_id}")]
pub async fn update_checkpoint_reward(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    path: web::Path<String>,
    payload: web::Json<CheckpointRewardBody>,
) -> ApiResult<web::Json<CheckpointRewardResponse>> {
    let merchant_id = merchant.require()?;
    let reward_id: CheckpointRewardId = parse_id(&path, REWARD_ID)?;
    let draft = payload.into_inner().into_draft()?;
    let reward = state
        .catalogue
        .update_checkpoint_reward(merchant_id, reward_id, draft)
        .await?;
    Ok(web::Json(reward.into()))
}

/// Delete a milestone reward, detaching it from every step.
#[utoipa::path(
    delete,
    path = "/checkpoint-rewards/{rewardId}",
    params(
        ("rewardId" = String, Path, description = "Reward to delete"),
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 204, description = "Reward deleted"),
        (status = 404, description = "Unknown reward", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "deleteCheckpointReward"
)]
#[delete("/checkpoint-rewards/{reward_id}")]
pub async fn delete_checkpoint_reward(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let reward_id: CheckpointRewardId = parse_id(&path, REWARD_ID)?;
    state
        .catalogue
        .delete_checkpoint_reward(merchant_id, reward_id)
        .await?;
    info!(%merchant_id, %reward_id, "checkpoint reward deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Create a points-priced reward.
#[utoipa::path(
    post,
    path = "/rewards",
    request_body = RewardBody,
    params(("x-merchant-id" = String, Header, description = "Acting merchant")),
    responses(
        (status = 201, description = "Reward created", body = RewardResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown merchant", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "createReward"
)]
#[post("/rewards")]
pub async fn create_reward(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<RewardBody>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let draft = payload.into_inner().into_draft()?;
    let reward = state.catalogue.create_reward(merchant_id, draft).await?;
    info!(%merchant_id, reward_id = %reward.id, price = reward.price_coins, "reward created");
    Ok(HttpResponse::Created().json(RewardResponse::from(reward)))
}

/// Replace a points-priced reward.
#[utoipa::path(
    put,
    path = "/rewards/{rewardId}",
    request_body = RewardBody,
    params(
        ("rewardId" = String, Path, description = "Reward to update"),
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 200, description = "Reward updated", body = RewardResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown reward", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "updateReward"
)]
#[put("/rewards/{reward_id}")]
pub async fn update_reward(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    path: web::Path<String>,
    payload: web::Json<RewardBody>,
) -> ApiResult<web::Json<RewardResponse>> {
    let merchant_id = merchant.require()?;
    let reward_id: RewardId = parse_id(&path, REWARD_ID)?;
    let draft = payload.into_inner().into_draft()?;
    let reward = state
        .catalogue
        .update_reward(merchant_id, reward_id, draft)
        .await?;
    Ok(web::Json(reward.into()))
}

/// Delete a points-priced reward. Past redemptions are kept.
#[utoipa::path(
    delete,
    path = "/rewards/{rewardId}",
    params(
        ("rewardId" = String, Path, description = "Reward to delete"),
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 204, description = "Reward deleted"),
        (status = 404, description = "Unknown reward", body = ErrorSchema)
    ),
    tags = ["catalogue-admin"],
    operation_id = "deleteReward"
)]
#[delete("/rewards/{reward_id}")]
pub async fn delete_reward(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let reward_id: RewardId = parse_id(&path, REWARD_ID)?;
    state.catalogue.delete_reward(merchant_id, reward_id).await?;
    info!(%merchant_id, %reward_id, "reward deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    fn offer_body_requires_name_and_length() {
        let err = OfferBody {
            name: Some("Coffee".to_owned()),
            description: None,
            total_steps: None,
        }
        .into_draft()
        .expect_err("missing totalSteps");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn reward_body_defaults_to_active() {
        let draft = RewardBody {
            name: Some("Tote".to_owned()),
            description: None,
            price_coins: Some(150),
            is_active: None,
        }
        .into_draft()
        .expect("valid reward");
        assert!(draft.is_active);
        assert_eq!(draft.price_coins, 150);
    }
}
