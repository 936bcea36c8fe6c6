//! Points redemption HTTP handler.
//!
//! ```text
//! POST /redeemed_rewards
//! ```
//!
//! Clients may send an `Idempotency-Key` header. Retrying with the same key
//! returns the original redemption with `200 OK` instead of debiting again.

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::RedeemRewardRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::RedemptionResponse;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::merchant::MerchantContext;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_required_id, parse_status};

const CUSTOMER_ID: FieldName = FieldName::new("customerId");
const REWARD_ID: FieldName = FieldName::new("rewardId");
const STATUS: FieldName = FieldName::new("status");

/// Header set on responses that replay an earlier redemption.
pub const REPLAYED_HEADER: &str = "idempotent-replayed";

/// Redeem a points-priced reward.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRewardBody {
    pub customer_id: Option<String>,
    pub reward_id: Option<String>,
    /// Must equal the reward's price when given.
    #[schema(example = 150)]
    pub points_spent: Option<i64>,
    /// `pending` (default), `completed` or `cancelled`.
    pub status: Option<String>,
}

/// Debit the reward's price and record the redemption in one step.
#[utoipa::path(
    post,
    path = "/redeemed_rewards",
    request_body = RedeemRewardBody,
    params(
        ("x-merchant-id" = String, Header, description = "Merchant owning the reward"),
        ("Idempotency-Key" = Option<String>, Header, description = "Makes retries safe")
    ),
    responses(
        (status = 201, description = "Reward redeemed", body = RedemptionResponse),
        (status = 200, description = "Earlier redemption with the same key", body = RedemptionResponse),
        (status = 400, description = "Invalid request or inactive reward", body = ErrorSchema),
        (status = 404, description = "Unknown customer or reward", body = ErrorSchema),
        (status = 409, description = "Idempotency key held by another redemption", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["redemptions"],
    operation_id = "redeemReward"
)]
#[post("/redeemed_rewards")]
pub async fn redeem_reward(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    request: HttpRequest,
    payload: web::Json<RedeemRewardBody>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let idempotency_key =
        extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;
    let body = payload.into_inner();

    let response = state
        .redemptions
        .redeem_reward(RedeemRewardRequest {
            merchant_id,
            customer_id: parse_required_id(body.customer_id.as_deref(), CUSTOMER_ID)?,
            reward_id: parse_required_id(body.reward_id.as_deref(), REWARD_ID)?,
            points_spent: body.points_spent,
            status: parse_status(body.status.as_deref(), STATUS)?,
            idempotency_key,
        })
        .await?;

    let redemption = response.redemption;
    if response.replayed {
        info!(%merchant_id, redemption_id = %redemption.id, "redemption replayed");
        return Ok(HttpResponse::Ok()
            .insert_header((REPLAYED_HEADER, "true"))
            .json(RedemptionResponse::from(redemption)));
    }
    info!(
        %merchant_id,
        customer_id = %redemption.customer_id,
        reward_id = %redemption.reward_id,
        points = redemption.points_spent,
        "reward redeemed"
    );
    Ok(HttpResponse::Created().json(RedemptionResponse::from(redemption)))
}
