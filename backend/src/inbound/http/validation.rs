//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every rejection is an `invalid_request` error whose details name the
//! offending field, so clients can highlight it without parsing messages.

use serde_json::json;
use uuid::Uuid;

use crate::domain::{CardUid, Error, RedemptionStatus};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidCardUid,
    InvalidNumber,
    InvalidStatus,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidCardUid => "invalid_card_uid",
            ErrorCode::InvalidNumber => "invalid_number",
            ErrorCode::InvalidStatus => "invalid_status",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    fn new(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field: field.as_str(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: &str) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value,
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("missing required field: {name}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("{name} must be a valid UUID"))
        .with_value(ErrorCode::InvalidUuid, value)
}

/// Unwrap a required field.
pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

/// Parse a UUID-backed identifier.
pub(crate) fn parse_id<T: From<Uuid>>(value: &str, field: FieldName) -> Result<T, Error> {
    Uuid::parse_str(value.trim())
        .map(T::from)
        .map_err(|_| invalid_uuid_error(field, value))
}

/// Parse a required UUID-backed identifier.
pub(crate) fn parse_required_id<T: From<Uuid>>(
    value: Option<&str>,
    field: FieldName,
) -> Result<T, Error> {
    parse_id(require(value, field)?, field)
}

/// Parse an optional UUID-backed identifier; blank counts as absent.
pub(crate) fn parse_optional_id<T: From<Uuid>>(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<T>, Error> {
    value
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_id(raw, field))
        .transpose()
}

pub(crate) fn parse_card_uid(value: Option<&str>, field: FieldName) -> Result<CardUid, Error> {
    let raw = require(value, field)?;
    CardUid::new(raw).map_err(|err| {
        ValidationError::new(field, err.to_string()).with_value(ErrorCode::InvalidCardUid, raw)
    })
}

/// Parse a decimal path segment.
pub(crate) fn parse_number(value: &str, field: FieldName) -> Result<i64, Error> {
    let name = field.as_str();
    value.trim().parse().map_err(|_| {
        ValidationError::new(field, format!("{name} must be an integer"))
            .with_value(ErrorCode::InvalidNumber, value)
    })
}

pub(crate) fn parse_status(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<RedemptionStatus>, Error> {
    let name = field.as_str();
    value
        .map(|raw| {
            raw.parse::<RedemptionStatus>().map_err(|_| {
                ValidationError::new(
                    field,
                    format!("{name} must be one of pending, completed, cancelled"),
                )
                .with_value(ErrorCode::InvalidStatus, raw)
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerId, ErrorCode as DomainCode};
    use rstest::rstest;

    const CARD_ID: FieldName = FieldName::new("cardId");

    #[rstest]
    fn missing_field_names_the_field() {
        let err = require::<&str>(None, CARD_ID).expect_err("missing");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        assert_eq!(
            err.details(),
            Some(&json!({ "field": "cardId", "code": "missing_field" }))
        );
    }

    #[rstest]
    fn invalid_uuid_echoes_value() {
        let err = parse_id::<CustomerId>("nope", CARD_ID).expect_err("invalid");
        assert_eq!(
            err.details(),
            Some(&json!({ "field": "cardId", "value": "nope", "code": "invalid_uuid" }))
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn blank_optional_id_is_absent(#[case] raw: Option<&str>) {
        let parsed = parse_optional_id::<CustomerId>(raw, CARD_ID).expect("absent");
        assert!(parsed.is_none());
    }

    #[rstest]
    fn card_uid_is_normalised() {
        let uid = parse_card_uid(Some(" 04:a2 "), FieldName::new("uid")).expect("valid uid");
        assert_eq!(uid.as_ref(), "04:A2");
    }

    #[rstest]
    #[case("pending", Some(RedemptionStatus::Pending))]
    #[case("completed", Some(RedemptionStatus::Completed))]
    fn status_parses_known_values(#[case] raw: &str, #[case] expected: Option<RedemptionStatus>) {
        let parsed = parse_status(Some(raw), FieldName::new("status")).expect("known status");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    fn status_rejects_unknown_values() {
        let err = parse_status(Some("lost"), FieldName::new("status")).expect_err("unknown");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
    }

    #[rstest]
    fn number_rejects_words() {
        let err = parse_number("three", FieldName::new("stepNumber")).expect_err("word");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
    }
}
