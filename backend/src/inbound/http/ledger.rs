//! Points ledger HTTP handlers.
//!
//! ```text
//! GET  /balance?cardId=
//! POST /tx
//! GET  /merchants
//! GET  /merchant-details?merchantId=&cardId=
//! GET  /merchant-history?merchantId=&cardId=&limit=
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    AppendTransactionRequest, MerchantCardRequest, MerchantDetails, MerchantHistory,
    MerchantHistoryRequest,
};
use crate::domain::{AppendedTransaction, CardId, MerchantBalance, MerchantCatalogue};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{
    AdvancementResponse, CheckpointRedemptionResponse, CheckpointRewardResponse, MerchantResponse,
    OfferWithStepsResponse, ProgressResponse, RedemptionResponse, RewardResponse,
    TransactionResponse, map_all,
};
use crate::inbound::http::merchant::MerchantContext;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_required_id, require};

const CARD_ID: FieldName = FieldName::new("cardId");
const POINTS: FieldName = FieldName::new("points");

/// Card query string.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct CardIdQuery {
    /// Card identifier.
    pub card_id: Option<String>,
}

/// Merchant and card query string.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct MerchantCardQuery {
    /// Merchant; falls back to the `x-merchant-id` header.
    pub merchant_id: Option<String>,
    /// Card identifier.
    pub card_id: Option<String>,
}

/// Merchant, card and page size query string.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct MerchantHistoryQuery {
    /// Merchant; falls back to the `x-merchant-id` header.
    pub merchant_id: Option<String>,
    /// Card identifier.
    pub card_id: Option<String>,
    /// Rows per section, at most 200.
    pub limit: Option<u32>,
}

/// Append signed points.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppendTransactionBody {
    pub card_id: Option<String>,
    /// Positive to accrue, negative to debit; zero is rejected.
    #[schema(example = 10)]
    pub points: Option<i64>,
}

/// A card's balance at one merchant.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerchantBalanceResponse {
    pub merchant_id: String,
    pub merchant: MerchantResponse,
    pub balance: i64,
    pub checkpoints: Vec<ProgressResponse>,
}

impl From<MerchantBalance> for MerchantBalanceResponse {
    fn from(value: MerchantBalance) -> Self {
        Self {
            merchant_id: value.merchant.id.to_string(),
            merchant: value.merchant.into(),
            balance: value.balance,
            checkpoints: map_all(value.progress),
        }
    }
}

/// Stored transaction with the resulting balance.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppendedTransactionResponse {
    pub transaction: TransactionResponse,
    pub balance: i64,
    /// `true` when this was the card's first activity at the merchant.
    pub association_created: bool,
}

impl From<AppendedTransaction> for AppendedTransactionResponse {
    fn from(value: AppendedTransaction) -> Self {
        Self {
            transaction: value.transaction.into(),
            balance: value.balance,
            association_created: value.association_created,
        }
    }
}

/// Public catalogue entry for one merchant.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerchantCatalogueResponse {
    #[serde(flatten)]
    pub merchant: MerchantResponse,
    /// Active points-priced rewards.
    pub rewards: Vec<RewardResponse>,
    pub checkpoint_rewards: Vec<CheckpointRewardResponse>,
    pub checkpoint_offers: Vec<OfferWithStepsResponse>,
}

impl From<MerchantCatalogue> for MerchantCatalogueResponse {
    fn from(value: MerchantCatalogue) -> Self {
        Self {
            merchant: value.merchant.into(),
            rewards: map_all(value.rewards),
            checkpoint_rewards: map_all(value.checkpoint_rewards),
            checkpoint_offers: map_all(value.offers),
        }
    }
}

/// A card's standing at one merchant.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerchantDetailsResponse {
    pub merchant: MerchantResponse,
    pub card_id: String,
    pub customer_id: String,
    pub balance: i64,
    /// Whether the card has been used at the merchant.
    pub associated: bool,
    pub checkpoints: Vec<ProgressResponse>,
}

impl From<MerchantDetails> for MerchantDetailsResponse {
    fn from(value: MerchantDetails) -> Self {
        Self {
            merchant: value.merchant.into(),
            card_id: value.card_id.to_string(),
            customer_id: value.customer_id.to_string(),
            balance: value.balance,
            associated: value.associated,
            checkpoints: map_all(value.progress),
        }
    }
}

/// A card's activity at one merchant, each list newest first.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerchantHistoryResponse {
    pub merchant_id: String,
    pub card_id: String,
    pub customer_id: String,
    pub transactions: Vec<TransactionResponse>,
    pub checkpoint_advancements: Vec<AdvancementResponse>,
    pub redeemed_rewards: Vec<RedemptionResponse>,
    pub redeemed_checkpoint_rewards: Vec<CheckpointRedemptionResponse>,
}

impl From<MerchantHistory> for MerchantHistoryResponse {
    fn from(value: MerchantHistory) -> Self {
        Self {
            merchant_id: value.merchant_id.to_string(),
            card_id: value.card_id.to_string(),
            customer_id: value.customer_id.to_string(),
            transactions: map_all(value.transactions),
            checkpoint_advancements: map_all(value.advancements),
            redeemed_rewards: map_all(value.redemptions),
            redeemed_checkpoint_rewards: map_all(value.checkpoint_redemptions),
        }
    }
}

/// Balances at every merchant the card has been used at.
#[utoipa::path(
    get,
    path = "/balance",
    params(CardIdQuery),
    responses(
        (status = 200, description = "Per-merchant balances", body = [MerchantBalanceResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown card", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "getBalance"
)]
#[get("/balance")]
pub async fn balance(
    state: web::Data<HttpState>,
    query: web::Query<CardIdQuery>,
) -> ApiResult<web::Json<Vec<MerchantBalanceResponse>>> {
    let card_id: CardId = parse_required_id(query.card_id.as_deref(), CARD_ID)?;
    let balances = state.ledger_query.balances(card_id).await?;
    Ok(web::Json(map_all(balances)))
}

/// Append a signed points transaction.
#[utoipa::path(
    post,
    path = "/tx",
    request_body = AppendTransactionBody,
    params(("x-merchant-id" = String, Header, description = "Acting merchant")),
    responses(
        (status = 201, description = "Transaction stored", body = AppendedTransactionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown card or merchant", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "appendTransaction"
)]
#[post("/tx")]
pub async fn append_transaction(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<AppendTransactionBody>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let body = payload.into_inner();
    let card_id: CardId = parse_required_id(body.card_id.as_deref(), CARD_ID)?;
    let points = require(body.points, POINTS)?;
    let appended = state
        .ledger
        .append_transaction(AppendTransactionRequest {
            merchant_id,
            card_id,
            points,
        })
        .await?;
    info!(
        %merchant_id,
        %card_id,
        points,
        balance = appended.balance,
        "transaction appended"
    );
    Ok(HttpResponse::Created().json(AppendedTransactionResponse::from(appended)))
}

/// Public catalogue of every merchant.
#[utoipa::path(
    get,
    path = "/merchants",
    responses(
        (status = 200, description = "Merchants with active rewards and offers", body = [MerchantCatalogueResponse]),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "listMerchants"
)]
#[get("/merchants")]
pub async fn list_merchants(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<MerchantCatalogueResponse>>> {
    let merchants = state.catalogue_query.list_merchants().await?;
    Ok(web::Json(map_all(merchants)))
}

/// Merchant, balance and checkpoint progress for a card.
#[utoipa::path(
    get,
    path = "/merchant-details",
    params(
        MerchantCardQuery,
        ("x-merchant-id" = Option<String>, Header, description = "Merchant when not in the query")
    ),
    responses(
        (status = 200, description = "Card standing at the merchant", body = MerchantDetailsResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown card or merchant", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "getMerchantDetails"
)]
#[get("/merchant-details")]
pub async fn merchant_details(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    query: web::Query<MerchantCardQuery>,
) -> ApiResult<web::Json<MerchantDetailsResponse>> {
    let merchant_id = merchant.resolve(query.merchant_id.as_deref())?;
    let card_id: CardId = parse_required_id(query.card_id.as_deref(), CARD_ID)?;
    let details = state
        .ledger_query
        .merchant_details(MerchantCardRequest {
            merchant_id,
            card_id,
        })
        .await?;
    Ok(web::Json(details.into()))
}

/// Transactions, advances and redemptions for a card at a merchant.
#[utoipa::path(
    get,
    path = "/merchant-history",
    params(
        MerchantHistoryQuery,
        ("x-merchant-id" = Option<String>, Header, description = "Merchant when not in the query")
    ),
    responses(
        (status = 200, description = "Card history at the merchant", body = MerchantHistoryResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown card or merchant", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "getMerchantHistory"
)]
#[get("/merchant-history")]
pub async fn merchant_history(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    query: web::Query<MerchantHistoryQuery>,
) -> ApiResult<web::Json<MerchantHistoryResponse>> {
    let merchant_id = merchant.resolve(query.merchant_id.as_deref())?;
    let card_id: CardId = parse_required_id(query.card_id.as_deref(), CARD_ID)?;
    let history = state
        .ledger_query
        .merchant_history(MerchantHistoryRequest {
            merchant_id,
            card_id,
            limit: query.limit,
        })
        .await?;
    Ok(web::Json(history.into()))
}
