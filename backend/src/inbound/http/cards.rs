//! Customer and card HTTP handlers.
//!
//! ```text
//! POST /customers
//! GET  /cards?uid=
//! POST /cards
//! GET  /cards/status?uid=
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    CardStatusRequest, CreateCardRequest, CreateCustomerRequest, LookupCardRequest,
};
use crate::domain::{CardLookup, CardStatus, CustomerId, CustomerProfile};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{CardResponse, CustomerResponse};
use crate::inbound::http::merchant::MerchantContext;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_card_uid, parse_required_id};

const UID: FieldName = FieldName::new("uid");
const CUSTOMER_ID: FieldName = FieldName::new("customerId");

/// Contact details for a new customer. Every field is optional.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
}

impl From<CreateCustomerBody> for CustomerProfile {
    fn from(value: CreateCustomerBody) -> Self {
        Self {
            name: trimmed(value.name),
            email: trimmed(value.email),
            phone: trimmed(value.phone),
        }
    }
}

/// Bind a physical card to a customer.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardBody {
    #[schema(example = "04:A2:3F:1B")]
    pub uid: Option<String>,
    pub customer_id: Option<String>,
}

/// Card UID query string.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CardUidQuery {
    /// Physical card UID as read by the terminal.
    pub uid: Option<String>,
}

/// Card resolved at a terminal.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardLookupResponse {
    pub card: CardResponse,
    pub card_merchant_id: String,
    /// `true` when this read associated the card with the merchant.
    pub association_created: bool,
}

impl From<CardLookup> for CardLookupResponse {
    fn from(value: CardLookup) -> Self {
        Self {
            card: value.card.into(),
            card_merchant_id: value.card_merchant_id.to_string(),
            association_created: value.association_created,
        }
    }
}

/// Side-effect free card check.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardStatusResponse {
    pub uid: String,
    pub exists: bool,
    pub card_id: Option<String>,
    pub customer_id: Option<String>,
    /// Whether the card is associated with the requesting merchant.
    pub associated: bool,
}

impl From<CardStatus> for CardStatusResponse {
    fn from(value: CardStatus) -> Self {
        Self {
            uid: value.uid.into(),
            exists: value.card.is_some(),
            card_id: value.card.as_ref().map(|card| card.id.to_string()),
            customer_id: value.card.as_ref().map(|card| card.customer_id.to_string()),
            associated: value.associated,
        }
    }
}

/// Register a customer.
#[utoipa::path(
    post,
    path = "/customers",
    request_body = CreateCustomerBody,
    params(("x-merchant-id" = String, Header, description = "Acting merchant")),
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown merchant", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["cards"],
    operation_id = "createCustomer"
)]
#[post("/customers")]
pub async fn create_customer(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<CreateCustomerBody>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let customer = state
        .cards
        .create_customer(CreateCustomerRequest {
            merchant_id,
            profile: payload.into_inner().into(),
        })
        .await?;
    info!(%merchant_id, customer_id = %customer.id, "customer created");
    Ok(HttpResponse::Created().json(CustomerResponse::from(customer)))
}

/// Resolve a card at a terminal, associating it with the merchant on first
/// use.
#[utoipa::path(
    get,
    path = "/cards",
    params(
        CardUidQuery,
        ("x-merchant-id" = String, Header, description = "Acting merchant")
    ),
    responses(
        (status = 200, description = "Card found", body = CardLookupResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown card or merchant", body = ErrorSchema)
    ),
    tags = ["cards"],
    operation_id = "lookupCard"
)]
#[get("/cards")]
pub async fn lookup_card(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    query: web::Query<CardUidQuery>,
) -> ApiResult<web::Json<CardLookupResponse>> {
    let merchant_id = merchant.require()?;
    let uid = parse_card_uid(query.uid.as_deref(), UID)?;
    let lookup = state
        .cards
        .lookup_card(LookupCardRequest { merchant_id, uid })
        .await?;
    Ok(web::Json(lookup.into()))
}

/// Register a card for a customer. Re-registering the same card for the same
/// customer is accepted and returns the stored card.
#[utoipa::path(
    post,
    path = "/cards",
    request_body = CreateCardBody,
    params(("x-merchant-id" = String, Header, description = "Issuing merchant")),
    responses(
        (status = 201, description = "Card registered", body = CardResponse),
        (status = 200, description = "Card already registered to this customer", body = CardResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown customer or merchant", body = ErrorSchema),
        (status = 409, description = "UID belongs to another customer", body = ErrorSchema)
    ),
    tags = ["cards"],
    operation_id = "createCard"
)]
#[post("/cards")]
pub async fn create_card(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    payload: web::Json<CreateCardBody>,
) -> ApiResult<HttpResponse> {
    let merchant_id = merchant.require()?;
    let body = payload.into_inner();
    let uid = parse_card_uid(body.uid.as_deref(), UID)?;
    let customer_id: CustomerId = parse_required_id(body.customer_id.as_deref(), CUSTOMER_ID)?;
    let registration = state
        .cards
        .create_card(CreateCardRequest {
            merchant_id,
            uid,
            customer_id,
        })
        .await?;
    let mut response = if registration.created {
        info!(%merchant_id, card_id = %registration.card.id, "card registered");
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(response.json(CardResponse::from(registration.card)))
}

/// Check a card without creating anything.
#[utoipa::path(
    get,
    path = "/cards/status",
    params(
        CardUidQuery,
        ("x-merchant-id" = Option<String>, Header, description = "Merchant asking, if known")
    ),
    responses(
        (status = 200, description = "Card status", body = CardStatusResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema)
    ),
    tags = ["cards"],
    operation_id = "cardStatus"
)]
#[get("/cards/status")]
pub async fn card_status(
    state: web::Data<HttpState>,
    merchant: MerchantContext,
    query: web::Query<CardUidQuery>,
) -> ApiResult<web::Json<CardStatusResponse>> {
    let uid = parse_card_uid(query.uid.as_deref(), UID)?;
    let status = state
        .card_status
        .card_status(CardStatusRequest {
            merchant_id: merchant.merchant_id(),
            uid,
        })
        .await?;
    Ok(web::Json(status.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn blank_profile_fields_are_dropped() {
        let profile = CustomerProfile::from(CreateCustomerBody {
            name: Some("  Ada ".to_owned()),
            email: Some("   ".to_owned()),
            phone: None,
        });
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert!(profile.email.is_none());
        assert!(profile.phone.is_none());
    }
}
