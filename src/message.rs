//! Platform message boundary
//!
//! Inbound bodies are parsed into typed submissions before any field is read.
//! Outbound messages keep every inbound field and add `deal_id`.

use crate::config::owner_id_from_value;
use crate::error::ConnectorError;
use crate::models::{DealId, OrganisationId, PersonId, UserId};
use crate::Result;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

pub const DEAL_ID_FIELD: &str = "deal_id";

/// Message exchanged with the workflow platform
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub headers: Map<String, Value>,
    pub body: Map<String, Value>,
}

impl Message {
    pub fn new(body: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            headers: Map::new(),
            body,
        }
    }

    /// Non-object bodies (triggers send none) become an empty body.
    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(map) => Self::new(map),
            _ => Self::new(Map::new()),
        }
    }

    /// Deal id carried over from an earlier step. Null, `""`, `0` and `false`
    /// count as absent; any other value, whitespace included, is a deal id.
    pub fn existing_deal_id(&self) -> Option<&Value> {
        self.body.get(DEAL_ID_FIELD).filter(|v| match v {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            _ => true,
        })
    }

    /// Same message with `deal_id` set; every other field is kept as is.
    pub fn with_deal_id(mut self, deal_id: DealId) -> Self {
        self.body.insert(DEAL_ID_FIELD.to_string(), Value::from(deal_id.0));
        self
    }

    fn parse_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.body.clone()))
            .map_err(|e| ConnectorError::InvalidMessage(e.to_string()))
    }
}

/// Opaque per-invocation scratchpad owned by the platform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(pub Value);

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

//
// ================= Typed submissions =================
//

/// Website lead, input of the full-chain action
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LeadSubmission {
    #[serde(deserialize_with = "text")]
    pub contact_name: String,
    #[serde(default, deserialize_with = "text")]
    pub contact_email: String,
    #[serde(default, deserialize_with = "text")]
    pub contact_phone: String,
    #[serde(default, deserialize_with = "text")]
    pub role: String,
    #[serde(deserialize_with = "text")]
    pub company: String,
    #[serde(default, deserialize_with = "text")]
    pub company_size: String,
    #[serde(default, deserialize_with = "text")]
    pub message: String,
}

impl LeadSubmission {
    pub fn from_message(msg: &Message) -> Result<Self> {
        let lead: Self = msg.parse_body()?;

        if lead.company.trim().is_empty() {
            return Err(ConnectorError::InvalidMessage(
                "company must not be empty".to_string(),
            ));
        }
        if lead.contact_name.trim().is_empty() {
            return Err(ConnectorError::InvalidMessage(
                "contact_name must not be empty".to_string(),
            ));
        }

        Ok(lead)
    }

    pub fn deal_title(&self) -> String {
        format!("Website: {}", self.company)
    }

    pub fn note_content(&self) -> String {
        format!(
            "Deal generated by the website:\n\
             \n\
             Lead's name: {}\n\
             Contact email: {}\n\
             Contact phone number: {}\n\
             Role: {}\n\
             Company: {}\n\
             Size of the company: {}\n\
             \n\
             Submitted message:\n\
             {}\n",
            self.contact_name,
            self.contact_email,
            self.contact_phone,
            self.role,
            self.company,
            self.company_size,
            self.message,
        )
    }
}

/// Input of the deal-only action; person and organisation already exist.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DealSubmission {
    #[serde(deserialize_with = "text")]
    pub deal_title: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub deal_currency: Option<String>,
    #[serde(deserialize_with = "numeric_id")]
    pub person_id: PersonId,
    #[serde(deserialize_with = "numeric_id")]
    pub org_id: OrganisationId,
    #[serde(default, deserialize_with = "owner")]
    pub owner_id: Option<UserId>,
}

impl DealSubmission {
    pub fn from_message(msg: &Message) -> Result<Self> {
        let deal: Self = msg.parse_body()?;

        if deal.deal_title.trim().is_empty() {
            return Err(ConnectorError::InvalidMessage(
                "deal_title must not be empty".to_string(),
            ));
        }

        Ok(deal)
    }
}

//
// ================= Field helpers =================
//

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(optional_text(deserializer)?.unwrap_or_default())
}

fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected text, found {}",
            other
        ))),
    }
}

fn numeric_id<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<u64>,
{
    let value = Value::deserialize(deserializer)?;
    let id = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    id.map(T::from)
        .ok_or_else(|| serde::de::Error::custom(format!("expected a numeric id, found {}", value)))
}

fn owner<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<UserId>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    let owner = value.as_ref().and_then(owner_id_from_value);

    if let (Some(raw), None) = (&value, owner) {
        if !raw.is_null() {
            warn!(owner_id = %raw, "Ignoring owner_id that is not a valid user id");
        }
    }
    Ok(owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(body: Value) -> Message {
        Message::from_body(body)
    }

    fn jane() -> Message {
        message(json!({
            "contact_name": "Jane",
            "contact_email": "jane@x.com",
            "contact_phone": "555",
            "role": "CTO",
            "company": "Acme",
            "company_size": "50",
            "message": "Hi"
        }))
    }

    #[test]
    fn test_note_content_lists_values_in_order() {
        let lead = LeadSubmission::from_message(&jane()).unwrap();
        let content = lead.note_content();

        let mut cursor = 0;
        for value in ["Jane", "jane@x.com", "555", "CTO", "Acme", "50", "Hi"] {
            let found = content[cursor..]
                .find(value)
                .unwrap_or_else(|| panic!("{} missing or out of order", value));
            cursor += found + value.len();
        }
        assert!(content.starts_with("Deal generated by the website:"));
    }

    #[test]
    fn test_lead_accepts_numeric_company_size() {
        let msg = message(json!({
            "contact_name": "Jane",
            "company": "Acme",
            "company_size": 50
        }));
        let lead = LeadSubmission::from_message(&msg).unwrap();

        assert_eq!(lead.company_size, "50");
        assert_eq!(lead.contact_email, "");
        assert_eq!(lead.deal_title(), "Website: Acme");
    }

    #[test]
    fn test_lead_requires_company() {
        let msg = message(json!({ "contact_name": "Jane" }));
        assert!(matches!(
            LeadSubmission::from_message(&msg),
            Err(ConnectorError::InvalidMessage(_))
        ));

        let msg = message(json!({ "contact_name": "Jane", "company": "  " }));
        assert!(matches!(
            LeadSubmission::from_message(&msg),
            Err(ConnectorError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_deal_submission_parsing() {
        let msg = message(json!({
            "deal_title": "Renewal",
            "deal_currency": "EUR",
            "person_id": "12",
            "org_id": 4,
            "owner_id": 7
        }));
        let deal = DealSubmission::from_message(&msg).unwrap();

        assert_eq!(deal.person_id, PersonId(12));
        assert_eq!(deal.org_id, OrganisationId(4));
        assert_eq!(deal.owner_id, Some(UserId(7)));
        assert_eq!(deal.deal_currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_deal_submission_rejects_bad_person_id() {
        let msg = message(json!({ "deal_title": "Renewal", "person_id": "x", "org_id": 4 }));
        assert!(matches!(
            DealSubmission::from_message(&msg),
            Err(ConnectorError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_existing_deal_id() {
        assert!(message(json!({ "deal_id": 42 })).existing_deal_id().is_some());
        assert!(message(json!({ "deal_id": "42" })).existing_deal_id().is_some());
        assert!(message(json!({ "deal_id": "" })).existing_deal_id().is_none());
        assert!(message(json!({ "deal_id": " " })).existing_deal_id().is_some());
        assert!(message(json!({ "deal_id": false })).existing_deal_id().is_none());
        assert!(message(json!({ "deal_id": null })).existing_deal_id().is_none());
        assert!(message(json!({ "deal_id": 0 })).existing_deal_id().is_none());
        assert!(message(json!({})).existing_deal_id().is_none());
    }

    #[test]
    fn test_with_deal_id_keeps_every_field() {
        let input = jane();
        let output = input.clone().with_deal_id(DealId(31));

        assert_eq!(output.body.len(), input.body.len() + 1);
        for (key, value) in &input.body {
            assert_eq!(output.body.get(key), Some(value));
        }
        assert_eq!(output.body.get(DEAL_ID_FIELD), Some(&json!(31)));
        assert_eq!(output.id, input.id);
    }

    #[test]
    fn test_non_object_body_is_empty() {
        assert!(message(Value::Null).body.is_empty());
        assert!(Snapshot::default().is_empty());
        assert!(!Snapshot(json!({ "last": 1 })).is_empty());
    }
}
