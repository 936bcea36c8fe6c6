//! Helpers for parsing idempotency headers in HTTP handlers.

use actix_web::http::header::HeaderMap;

use crate::domain::{Error, REDEMPTION_KEY_MAX, RedemptionKey, RedemptionKeyError};

/// HTTP header name for idempotency keys.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Failure to read the idempotency header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotencyHeaderError {
    /// The header bytes are not visible ASCII.
    NotText,
    /// The key failed validation.
    Invalid(RedemptionKeyError),
}

/// Extract the idempotency key from request headers.
pub fn extract_idempotency_key(
    headers: &HeaderMap,
) -> Result<Option<RedemptionKey>, IdempotencyHeaderError> {
    let Some(header_value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key_str = header_value
        .to_str()
        .map_err(|_| IdempotencyHeaderError::NotText)?;

    RedemptionKey::new(key_str)
        .map(Some)
        .map_err(IdempotencyHeaderError::Invalid)
}

/// Map idempotency header errors to domain errors.
pub fn map_idempotency_key_error(err: IdempotencyHeaderError) -> Error {
    match err {
        IdempotencyHeaderError::NotText => {
            Error::invalid_request("idempotency-key header must be visible ASCII")
        }
        IdempotencyHeaderError::Invalid(RedemptionKeyError::Empty) => {
            Error::invalid_request("idempotency-key header must not be empty")
        }
        IdempotencyHeaderError::Invalid(RedemptionKeyError::TooLong) => Error::invalid_request(
            format!("idempotency-key header must be at most {REDEMPTION_KEY_MAX} characters"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};
    use rstest::rstest;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("idempotency-key"),
            HeaderValue::from_str(value).expect("header value"),
        );
        headers
    }

    #[rstest]
    fn absent_header_is_none() {
        let key = extract_idempotency_key(&HeaderMap::new()).expect("no header");
        assert!(key.is_none());
    }

    #[rstest]
    fn present_header_is_trimmed() {
        let key = extract_idempotency_key(&headers_with(" order-17 "))
            .expect("valid header")
            .expect("key present");
        assert_eq!(key.as_ref(), "order-17");
    }

    #[rstest]
    fn blank_header_is_rejected() {
        let err = extract_idempotency_key(&headers_with("  ")).expect_err("blank");
        assert_eq!(err, IdempotencyHeaderError::Invalid(RedemptionKeyError::Empty));
        let mapped = map_idempotency_key_error(err);
        assert_eq!(mapped.message(), "idempotency-key header must not be empty");
    }

    #[rstest]
    fn oversized_header_is_rejected() {
        let long = "k".repeat(REDEMPTION_KEY_MAX + 1);
        let err = extract_idempotency_key(&headers_with(&long)).expect_err("too long");
        assert_eq!(
            err,
            IdempotencyHeaderError::Invalid(RedemptionKeyError::TooLong)
        );
    }
}
