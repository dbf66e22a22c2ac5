//! Identity document built from a pin request body.

use chrono::{DateTime, SecondsFormat, Utc};
use haki_types::IdentityKind;
use serde_json::{Map, Value};

use super::error::PinGatewayError;

/// Document forwarded to the pinning service.
#[derive(Debug, Clone, PartialEq)]
pub struct PinPayload {
    pub kind: IdentityKind,
    /// Identifier exactly as received
    pub value: Value,
    pub timestamp: DateTime<Utc>,
}

impl PinPayload {
    /// Pick the identifying field from a request body.
    ///
    /// Fields are tried in `lsk`, `ngoId`, `donorId` order and the first
    /// truthy one wins.
    pub fn from_request(body: &Value, timestamp: DateTime<Utc>) -> Result<Self, PinGatewayError> {
        if body.is_null() {
            return Err(PinGatewayError::Internal("request body is null".into()));
        }

        IdentityKind::PRECEDENCE
            .into_iter()
            .find_map(|kind| {
                body.get(kind.field())
                    .filter(|value| is_truthy(value))
                    .map(|value| Self {
                        kind,
                        value: value.clone(),
                        timestamp,
                    })
            })
            .ok_or(PinGatewayError::MissingIdentifier)
    }

    /// `{type, name, description, <field>, timestamp}` in that key order.
    pub fn to_document(&self) -> Value {
        let kind = self.kind;
        let mut document = Map::new();
        document.insert("type".into(), kind.type_tag().into());
        document.insert("name".into(), kind.display_name().into());
        document.insert("description".into(), kind.description().into());
        document.insert(kind.field().into(), self.value.clone());
        document.insert(
            "timestamp".into(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        Value::Object(document)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_lawyer_document() {
        let payload = PinPayload::from_request(&json!({ "lsk": "LSK-123" }), at()).unwrap();
        assert_eq!(
            payload.to_document().to_string(),
            r#"{"type":"lawyer","name":"Lawyer LSK","description":"LSK number for lawyer (Haki)","lsk":"LSK-123","timestamp":"2025-03-01T12:30:00.000Z"}"#
        );
    }

    #[test]
    fn test_lsk_wins_over_other_fields() {
        let body = json!({ "donorId": "D1", "ngoId": "N1", "lsk": "L1" });
        let payload = PinPayload::from_request(&body, at()).unwrap();
        assert_eq!(payload.kind, IdentityKind::Lawyer);
    }

    #[test]
    fn test_empty_field_falls_through() {
        let body = json!({ "lsk": "", "ngoId": 0, "donorId": "D1" });
        let payload = PinPayload::from_request(&body, at()).unwrap();
        assert_eq!(payload.kind, IdentityKind::Donor);
        assert_eq!(payload.to_document()["donorId"], "D1");
    }

    #[test]
    fn test_numeric_identifier_kept_as_number() {
        let payload = PinPayload::from_request(&json!({ "ngoId": 42 }), at()).unwrap();
        assert_eq!(payload.to_document()["ngoId"], json!(42));
    }

    #[test]
    fn test_missing_identifier() {
        for body in [json!({}), json!({ "lsk": null, "donorId": false }), json!([1, 2])] {
            assert_eq!(
                PinPayload::from_request(&body, at()),
                Err(PinGatewayError::MissingIdentifier)
            );
        }
    }

    #[test]
    fn test_null_body_is_internal() {
        assert!(matches!(
            PinPayload::from_request(&Value::Null, at()),
            Err(PinGatewayError::Internal(_))
        ));
    }
}
