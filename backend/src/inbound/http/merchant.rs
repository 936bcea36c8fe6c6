//! Merchant identity extractor.
//!
//! The upstream gateway authenticates the merchant and forwards its id in the
//! `x-merchant-id` header. Handlers receive a [`MerchantContext`] and decide
//! whether the header is mandatory; the domain services then confirm the
//! merchant exists.

use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};
use serde_json::json;
use tracing::warn;

use crate::domain::{Error, MerchantId};
use crate::inbound::http::validation::{FieldName, parse_id};

/// Header carrying the acting merchant's id.
pub const MERCHANT_ID_HEADER: &str = "x-merchant-id";

const MERCHANT_ID_QUERY: FieldName = FieldName::new("merchantId");

/// Merchant identity supplied with the request, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MerchantContext(Option<MerchantId>);

impl MerchantContext {
    /// Context for a known merchant.
    #[must_use]
    pub const fn new(merchant_id: MerchantId) -> Self {
        Self(Some(merchant_id))
    }

    /// Read the header. A present but malformed header is rejected even on
    /// endpoints where it is optional.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, Error> {
        let Some(value) = headers.get(MERCHANT_ID_HEADER) else {
            return Ok(Self(None));
        };
        let raw = value
            .to_str()
            .map_err(|_| Error::invalid_request("x-merchant-id header must be a valid UUID"))?;
        if raw.trim().is_empty() {
            return Ok(Self(None));
        }
        raw.trim()
            .parse::<MerchantId>()
            .map(|id| Self(Some(id)))
            .map_err(|_| {
                Error::invalid_request("x-merchant-id header must be a valid UUID").with_details(
                    json!({ "header": MERCHANT_ID_HEADER, "value": raw, "code": "invalid_uuid" }),
                )
            })
    }

    /// Merchant from the header, if supplied.
    #[must_use]
    pub fn merchant_id(&self) -> Option<MerchantId> {
        self.0
    }

    /// Merchant from the header, which must be present.
    pub fn require(&self) -> Result<MerchantId, Error> {
        self.0.ok_or_else(|| {
            Error::invalid_request("x-merchant-id header is required")
                .with_details(json!({ "header": MERCHANT_ID_HEADER, "code": "missing_header" }))
        })
    }

    /// Merchant for read endpoints that accept `merchantId` in the query
    /// string as an alternative to the header. When both are given they must
    /// agree.
    pub fn resolve(&self, query: Option<&str>) -> Result<MerchantId, Error> {
        let from_query = query
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_id::<MerchantId>(raw, MERCHANT_ID_QUERY))
            .transpose()?;
        match (from_query, self.0) {
            (Some(queried), Some(header)) if queried != header => {
                warn!(%queried, %header, "merchantId query disagrees with header");
                Err(Error::invalid_request(
                    "merchantId does not match the x-merchant-id header",
                ))
            }
            (Some(id), _) | (None, Some(id)) => Ok(id),
            (None, None) => Err(Error::invalid_request(
                "merchantId query parameter or x-merchant-id header is required",
            )
            .with_details(json!({ "field": "merchantId", "code": "missing_field" }))),
        }
    }
}

impl FromRequest for MerchantContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_headers(req.headers()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse, web};
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    const MERCHANT: &str = "6f1c2a4e-8f0d-4b7a-9c51-2d3e4f5a6b7c";

    #[fixture]
    fn merchant_id() -> MerchantId {
        MerchantId::from_uuid(Uuid::parse_str(MERCHANT).expect("fixture uuid"))
    }

    #[rstest]
    fn require_rejects_missing_header() {
        let err = MerchantContext::default().require().expect_err("missing");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn resolve_prefers_query_when_header_absent(merchant_id: MerchantId) {
        let resolved = MerchantContext::default()
            .resolve(Some(MERCHANT))
            .expect("query id");
        assert_eq!(resolved, merchant_id);
    }

    #[rstest]
    fn resolve_falls_back_to_header(merchant_id: MerchantId) {
        let resolved = MerchantContext::new(merchant_id)
            .resolve(None)
            .expect("header id");
        assert_eq!(resolved, merchant_id);
    }

    #[rstest]
    fn resolve_rejects_disagreement(merchant_id: MerchantId) {
        let other = Uuid::new_v4().to_string();
        let err = MerchantContext::new(merchant_id)
            .resolve(Some(&other))
            .expect_err("mismatch");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn resolve_requires_some_merchant() {
        let err = MerchantContext::default().resolve(Some(" ")).expect_err("none");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    async fn echo(context: MerchantContext) -> Result<HttpResponse, Error> {
        let id = context.require()?;
        Ok(HttpResponse::Ok().body(id.to_string()))
    }

    #[actix_web::test]
    async fn extractor_reads_header() {
        let app = actix_test::init_service(App::new().route("/", web::get().to(echo))).await;
        let req = actix_test::TestRequest::get()
            .uri("/")
            .insert_header((MERCHANT_ID_HEADER, MERCHANT))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = actix_test::read_body(res).await;
        assert_eq!(body, MERCHANT);
    }

    #[actix_web::test]
    async fn extractor_rejects_malformed_header() {
        let app = actix_test::init_service(App::new().route("/", web::get().to(echo))).await;
        let req = actix_test::TestRequest::get()
            .uri("/")
            .insert_header((MERCHANT_ID_HEADER, "merchant-7"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Error = actix_test::read_body_json(res).await;
        assert_eq!(body.code(), ErrorCode::InvalidRequest);
    }
}
