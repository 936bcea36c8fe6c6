//! Checkpoint journey HTTP handlers.
//!
//! ```text
//! POST /checkpoints/advance
//! POST /checkpoints/rewind
//! POST /checkpoints/redeem-reward
//! ```
//!
//! Terminals usually only know the card, so advance and rewind accept either
//! `customerId` or `cardId`; when both are sent the customer wins.

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::{
    CheckpointMoveRequest, CustomerSubject, RedeemCheckpointRewardRequest,
};
use crate::domain::{AdvanceResult, CardId, CustomerId, Error, MerchantId, OfferId, RewindResult};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{CheckpointRedemptionResponse, RewardSummaryResponse};
use crate::inbound::http::merchant::MerchantContext;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_optional_id, parse_required_id,
};

const CUSTOMER_ID: FieldName = FieldName::new("customerId");
const CARD_ID: FieldName = FieldName::new("cardId");
const OFFER_ID: FieldName = FieldName::new("offerId");
const REWARD_ID: FieldName = FieldName::new("rewardId");
const STEP_ID: FieldName = FieldName::new("stepId");

/// Identify whose cursor moves, and in which offer.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointMoveBody {
    pub customer_id: Option<String>,
    pub card_id: Option<String>,
    /// Defaults to the merchant's oldest offer.
    pub offer_id: Option<String>,
}

/// Redeem a milestone reward.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCheckpointRewardBody {
    pub customer_id: Option<String>,
    pub reward_id: Option<String>,
    pub step_id: Option<String>,
}

/// Cursor after an advance.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub offer_id: String,
    #[schema(example = 3)]
    pub current_step: u32,
    #[schema(example = 5)]
    pub total_steps: u32,
    /// Milestone reward attached to the step reached, if any.
    pub reward: Option<RewardSummaryResponse>,
}

impl From<AdvanceResult> for AdvanceResponse {
    fn from(value: AdvanceResult) -> Self {
        Self {
            offer_id: value.offer_id.to_string(),
            current_step: value.current_step,
            total_steps: value.total_steps,
            reward: value.reward.map(RewardSummaryResponse::from),
        }
    }
}

/// Cursor after a rewind.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewindResponse {
    pub offer_id: String,
    pub current_step: u32,
    pub total_steps: u32,
}

impl From<RewindResult> for RewindResponse {
    fn from(value: RewindResult) -> Self {
        Self {
            offer_id: value.offer_id.to_string(),
            current_step: value.current_step,
            total_steps: value.total_steps,
        }
    }
}

fn parse_move_body(
    merchant_id: MerchantId,
    body: &CheckpointMoveBody,
) -> Result<CheckpointMoveRequest, Error> {
    let customer = parse_optional_id::<CustomerId>(body.customer_id.as_deref(), CUSTOMER_ID)?;
    let card = parse_optional_id::<CardId>(body.card_id.as_deref(), CARD_ID)?;
    let subject = match (customer, card) {
        (Some(customer_id), _) => CustomerSubject::Customer(customer_id),
        (None, Some(card_id)) => CustomerSubject::Card(card_id),
        (None, None) => return Err(missing_field_error(CUSTOMER_ID)),
    };
    Ok(CheckpointMoveRequest {
        merchant_id,
        subject,
        offer_id: parse_optional_id::<OfferId>(body.offer_id.as_deref(), OFFER_ID)?,
    })
}

/// Advance the customer one step, wrapping from the last step to step 1.
#[utoipa::path(
    post,
    path = "/checkpoints/advance",
    request_body = CheckpointMoveBody,
    params(("x-merchant-id" = String, Header, description = "Merchant owning the offer")),
    responses(
        (status = 200, description = "Cursor advanced", body = AdvanceResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown customer, card, merchant or offer", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["checkpoints"],
    operation_id = "advanceCheckpoint"
)]
#[post("/checkpoints/advance")]
pub async fn advance(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<CheckpointMoveBody>,
) -> ApiResult<web::Json<AdvanceResponse>> {
    let merchant_id = merchant.require()?;
    let request = parse_move_body(merchant_id, &payload)?;
    let result = state.checkpoints.advance(request).await?;
    info!(
        %merchant_id,
        offer_id = %result.offer_id,
        current_step = result.current_step,
        "checkpoint advanced"
    );
    Ok(web::Json(result.into()))
}

/// Rewind the customer one step, wrapping from step 1 to the last step.
#[utoipa::path(
    post,
    path = "/checkpoints/rewind",
    request_body = CheckpointMoveBody,
    params(("x-merchant-id" = String, Header, description = "Merchant owning the offer")),
    responses(
        (status = 200, description = "Cursor rewound", body = RewindResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "No progress to rewind, or unknown offer", body = ErrorSchema)
    ),
    tags = ["checkpoints"],
    operation_id = "rewindCheckpoint"
)]
#[post("/checkpoints/rewind")]
pub async fn rewind(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<CheckpointMoveBody>,
) -> ApiResult<web::Json<RewindResponse>> {
    let merchant_id = merchant.require()?;
    let request = parse_move_body(merchant_id, &payload)?;
    let result = state.checkpoints.rewind(request).await?;
    info!(
        %merchant_id,
        offer_id = %result.offer_id,
        current_step = result.current_step,
        "checkpoint rewound"
    );
    Ok(web::Json(result.into()))
}

/// Record the redemption of a milestone reward. No points move.
#[utoipa::path(
    post,
    path = "/checkpoints/redeem-reward",
    request_body = RedeemCheckpointRewardBody,
    params(("x-merchant-id" = String, Header, description = "Merchant owning the reward")),
    responses(
        (status = 201, description = "Redemption recorded", body = CheckpointRedemptionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown customer, reward or step", body = ErrorSchema)
    ),
    tags = ["checkpoints"],
    operation_id = "redeemCheckpointReward"
)]
#[post("/checkpoints/redeem-reward")]
pub async fn redeem_checkpoint_reward(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<RedeemCheckpointRewardBody>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let body = payload.into_inner();
    let redemption = state
        .redemptions
        .redeem_checkpoint_reward(RedeemCheckpointRewardRequest {
            merchant_id,
            customer_id: parse_required_id(body.customer_id.as_deref(), CUSTOMER_ID)?,
            reward_id: parse_required_id(body.reward_id.as_deref(), REWARD_ID)?,
            step_id: parse_required_id(body.step_id.as_deref(), STEP_ID)?,
        })
        .await?;
    info!(
        %merchant_id,
        customer_id = %redemption.customer_id,
        reward_id = %redemption.reward_id,
        "checkpoint reward redeemed"
    );
    Ok(HttpResponse::Created().json(CheckpointRedemptionResponse::from(redemption)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    #[fixture]
    fn merchant_id() -> MerchantId {
        MerchantId::random()
    }

    #[rstest]
    fn customer_wins_over_card(merchant_id: MerchantId) {
        let customer = Uuid::new_v4();
        let body = CheckpointMoveBody {
            customer_id: Some(customer.to_string()),
            card_id: Some(Uuid::new_v4().to_string()),
            offer_id: None,
        };
        let request = parse_move_body(merchant_id, &body).expect("valid body");
        assert_eq!(
            request.subject,
            CustomerSubject::Customer(CustomerId::from_uuid(customer))
        );
        assert!(request.offer_id.is_none());
    }

    #[rstest]
    fn card_alone_identifies_the_subject(merchant_id: MerchantId) {
        let card = Uuid::new_v4();
        let body = CheckpointMoveBody {
            card_id: Some(card.to_string()),
            ..CheckpointMoveBody::default()
        };
        let request = parse_move_body(merchant_id, &body).expect("valid body");
        assert_eq!(request.subject, CustomerSubject::Card(CardId::from_uuid(card)));
    }

    #[rstest]
    fn subject_is_required(merchant_id: MerchantId) {
        let err = parse_move_body(merchant_id, &CheckpointMoveBody::default())
            .expect_err("no subject");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn malformed_offer_is_rejected(merchant_id: MerchantId) {
        let body = CheckpointMoveBody {
            customer_id: Some(Uuid::new_v4().to_string()),
            offer_id: Some("first".to_owned()),
            ..CheckpointMoveBody::default()
        };
        let err = parse_move_body(merchant_id, &body).expect_err("bad offer id");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
