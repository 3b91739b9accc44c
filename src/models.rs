//! Core data models for Pipedrive records
//!
//! Creation payloads (`New*`) take the exact id types of the records they
//! depend on, so a person cannot be posted without an organisation id that
//! came back from the CRM, a deal without a person, and so on.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

//
// ================= Ids =================
//

macro_rules! crm_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

crm_id!(OrganisationId);
crm_id!(PersonId);
crm_id!(DealId);
crm_id!(NoteId);
crm_id!(ActivityId);
crm_id!(
    /// Pipedrive user, used as the owner of a deal
    UserId
);

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Visibility {
    OwnerAndFollowers = 1,
    EntireCompany = 3,
}

impl Visibility {
    fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Visibility::OwnerAndFollowers),
            3 => Some(Visibility::EntireCompany),
            _ => None,
        }
    }
}

impl Serialize for Visibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Visibility {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(n) => Some(n),
            NumberOrText::Text(s) => s.trim().parse().ok(),
        };
        code.and_then(Visibility::from_code)
            .ok_or_else(|| serde::de::Error::custom("unknown visible_to value"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Open,
    Won,
    Lost,
    Deleted,
}

/// Activity completion flag, sent as `0`/`1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoneFlag {
    #[default]
    NotDone,
    Done,
}

impl Serialize for DoneFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(matches!(self, DoneFlag::Done) as u8)
    }
}

impl<'de> Deserialize<'de> for DoneFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(true) | Raw::Number(1) => DoneFlag::Done,
            _ => DoneFlag::NotDone,
        })
    }
}

//
// ================= Lenient wire helpers =================
//

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

/// Pipedrive answers reference fields either as a bare id or as an expanded
/// object such as `{"value": 12, "name": "Acme"}` (`{"id": 3, ...}` for users).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawReference {
    Id(u64),
    Text(String),
    Expanded {
        #[serde(alias = "id")]
        value: Option<u64>,
    },
}

impl RawReference {
    fn into_id(self) -> Option<u64> {
        match self {
            RawReference::Id(id) => Some(id),
            RawReference::Text(s) => s.trim().parse().ok(),
            RawReference::Expanded { value } => value,
        }
    }
}

fn reference<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<u64>,
{
    let raw = Option::<RawReference>::deserialize(deserializer)?;
    Ok(raw.and_then(RawReference::into_id).map(T::from))
}

fn optional_visibility<'de, D>(deserializer: D) -> Result<Option<Visibility>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| Visibility::deserialize(v).ok()))
}

const ADD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn add_time<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDateTime::parse_from_str(&s, ADD_TIME_FORMAT).ok()))
}

//
// ================= Records returned by the CRM =================
//

#[derive(Debug, Clone, Deserialize)]
pub struct Organisation {
    pub id: OrganisationId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "reference")]
    pub owner_id: Option<UserId>,
    #[serde(default, deserialize_with = "reference")]
    pub org_id: Option<OrganisationId>,
    #[serde(default)]
    pub email: Vec<Value>,
    #[serde(default)]
    pub phone: Vec<Value>,
    #[serde(default, rename = "visible_to", deserialize_with = "optional_visibility")]
    pub visibility: Option<Visibility>,
    #[serde(default, deserialize_with = "add_time")]
    pub add_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "reference")]
    pub owner_id: Option<UserId>,
    #[serde(default, deserialize_with = "reference")]
    pub org_id: Option<OrganisationId>,
    #[serde(default)]
    pub email: Vec<Value>,
    #[serde(default)]
    pub phone: Vec<Value>,
    #[serde(default, rename = "visible_to", deserialize_with = "optional_visibility")]
    pub visibility: Option<Visibility>,
    #[serde(default, deserialize_with = "add_time")]
    pub add_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Deal {
    pub id: DealId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "reference")]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "reference")]
    pub person_id: Option<PersonId>,
    #[serde(default, deserialize_with = "reference")]
    pub org_id: Option<OrganisationId>,
    #[serde(default)]
    pub stage_id: Option<u64>,
    #[serde(default)]
    pub status: Option<DealStatus>,
    #[serde(default)]
    pub lost_reason: Option<String>,
    #[serde(default, rename = "visible_to", deserialize_with = "optional_visibility")]
    pub visibility: Option<Visibility>,
    #[serde(default, deserialize_with = "add_time")]
    pub add_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "reference")]
    pub deal_id: Option<DealId>,
    #[serde(default, deserialize_with = "reference")]
    pub person_id: Option<PersonId>,
    #[serde(default, deserialize_with = "reference")]
    pub org_id: Option<OrganisationId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub done: DoneFlag,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
    #[serde(default, deserialize_with = "reference")]
    pub deal_id: Option<DealId>,
    #[serde(default, deserialize_with = "reference")]
    pub person_id: Option<PersonId>,
    #[serde(default, deserialize_with = "reference")]
    pub org_id: Option<OrganisationId>,
    #[serde(default, deserialize_with = "reference")]
    pub user_id: Option<UserId>,
}

//
// ================= Creation payloads =================
//

#[derive(Debug, Clone, Serialize)]
pub struct NewOrganisation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    #[serde(rename = "visible_to", skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPerson {
    pub name: String,
    pub email: Vec<String>,
    pub phone: Vec<String>,
    pub org_id: OrganisationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    #[serde(rename = "visible_to", skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDeal {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub person_id: PersonId,
    pub org_id: OrganisationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<u64>,
    pub status: DealStatus,
    #[serde(rename = "visible_to", skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewNote {
    pub content: String,
    pub deal_id: DealId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<PersonId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<OrganisationId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewActivity {
    pub subject: String,
    pub done: DoneFlag,
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<PersonId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<OrganisationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

//
// ================= Response envelope =================
//

/// Shape shared by every Pipedrive v1 response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub related_objects: Option<Value>,
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DealStatus::Open => "Open",
            DealStatus::Won => "Won",
            DealStatus::Lost => "Lost",
            DealStatus::Deleted => "Deleted",
        };
        write!(f, "{}", s)
    }
}
