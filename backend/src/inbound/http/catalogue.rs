//! Catalogue read HTTP handlers.
//!
//! ```text
//! GET /rewards-and-checkpoints?merchantId=&cardId=
//! GET /merchant-rewards?merchantId=
//! GET /merchant-checkpoints?merchantId=
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::MerchantCheckpoints;
use crate::domain::{CardId, CustomerCatalogue};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{
    CheckpointRewardResponse, MerchantResponse, OfferWithStepsResponse, ProgressResponse,
    RewardResponse, map_all,
};
use crate::inbound::http::ledger::MerchantCardQuery;
use crate::inbound::http::merchant::MerchantContext;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_required_id};

const CARD_ID: FieldName = FieldName::new("cardId");

/// Merchant query string.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct MerchantQuery {
    /// Merchant; falls back to the `x-merchant-id` header.
    pub merchant_id: Option<String>,
}

/// A merchant's catalogue as one customer sees it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCatalogueResponse {
    pub merchant: MerchantResponse,
    /// Active points-priced rewards.
    pub rewards: Vec<RewardResponse>,
    pub checkpoint_rewards: Vec<CheckpointRewardResponse>,
    pub checkpoint_offers: Vec<OfferWithStepsResponse>,
    pub balance: i64,
    pub checkpoints: Vec<ProgressResponse>,
}

impl From<CustomerCatalogue> for CustomerCatalogueResponse {
    fn from(value: CustomerCatalogue) -> Self {
        let catalogue = value.catalogue;
        Self {
            merchant: catalogue.merchant.into(),
            rewards: map_all(catalogue.rewards),
            checkpoint_rewards: map_all(catalogue.checkpoint_rewards),
            checkpoint_offers: map_all(catalogue.offers),
            balance: value.balance,
            checkpoints: map_all(value.progress),
        }
    }
}

/// A merchant's checkpoint configuration.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerchantCheckpointsResponse {
    pub offers: Vec<OfferWithStepsResponse>,
    pub rewards: Vec<CheckpointRewardResponse>,
}

impl From<MerchantCheckpoints> for MerchantCheckpointsResponse {
    fn from(value: MerchantCheckpoints) -> Self {
        Self {
            offers: map_all(value.offers),
            rewards: map_all(value.rewards),
        }
    }
}

/// Catalogue with the card's balance and progress.
#[utoipa::path(
    get,
    path = "/rewards-and-checkpoints",
    params(
        MerchantCardQuery,
        ("x-merchant-id" = Option<String>, Header, description = "Merchant when not in the query")
    ),
    responses(
        (status = 200, description = "Customer-scoped catalogue", body = CustomerCatalogueResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown card or merchant", body = ErrorSchema)
    ),
    tags = ["catalogue"],
    operation_id = "getRewardsAndCheckpoints"
)]
#[get("/rewards-and-checkpoints")]
pub async fn rewards_and_checkpoints(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    query: web::Query<MerchantCardQuery>,
) -> ApiResult<web::Json<CustomerCatalogueResponse>> {
    let merchant_id = merchant.resolve(query.merchant_id.as_deref())?;
    let card_id: CardId = parse_required_id(query.card_id.as_deref(), CARD_ID)?;
    let catalogue = state
        .catalogue_query
        .rewards_and_checkpoints(merchant_id, card_id)
        .await?;
    Ok(web::Json(catalogue.into()))
}

/// Every points-priced reward of a merchant, inactive ones included.
#[utoipa::path(
    get,
    path = "/merchant-rewards",
    params(
        MerchantQuery,
        ("x-merchant-id" = Option<String>, Header, description = "Merchant when not in the query")
    ),
    responses(
        (status = 200, description = "Rewards by price", body = [RewardResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown merchant", body = ErrorSchema)
    ),
    tags = ["catalogue"],
    operation_id = "getMerchantRewards"
)]
#[get("/merchant-rewards")]
pub async fn merchant_rewards(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    query: web::Query<MerchantQuery>,
) -> ApiResult<web::Json<Vec<RewardResponse>>> {
    let merchant_id = merchant.resolve(query.merchant_id.as_deref())?;
    let rewards = state.catalogue_query.merchant_rewards(merchant_id).await?;
    Ok(web::Json(map_all(rewards)))
}

/// Offers, steps and milestone rewards of a merchant.
#[utoipa::path(
    get,
    path = "/merchant-checkpoints",
    params(
        MerchantQuery,
        ("x-merchant-id" = Option<String>, Header, description = "Merchant when not in the query")
    ),
    responses(
        (status = 200, description = "Checkpoint configuration", body = MerchantCheckpointsResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown merchant", body = ErrorSchema)
    ),
    tags = ["catalogue"],
    operation_id = "getMerchantCheckpoints"
)]
#[get("/merchant-checkpoints")]
pub async fn merchant_checkpoints(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    query: web::Query<MerchantQuery>,
) -> ApiResult<web::Json<MerchantCheckpointsResponse>> {
    let merchant_id = merchant.resolve(query.merchant_id.as_deref())?;
    let checkpoints = state
        .catalogue_query
        .merchant_checkpoints(merchant_id)
        .await?;
    Ok(web::Json(checkpoints.into()))
}
