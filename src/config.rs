//! Action configuration
//!
//! The platform hands every invocation a loosely shaped JSON object. It is
//! parsed once into [`ConnectorConfig`] before any field is used.

use crate::error::ConnectorError;
use crate::models::UserId;
use crate::Result;
use serde_json::Value;
use std::env;
use std::fmt;

const TOKEN_ENV: &str = "PIPEDRIVE_API_TOKEN";
const COMPANY_DOMAIN_ENV: &str = "PIPEDRIVE_COMPANY_DOMAIN";
const OWNER_ID_ENV: &str = "PIPEDRIVE_OWNER_ID";

/// Validated per-invocation configuration
#[derive(Clone, PartialEq)]
pub struct ConnectorConfig {
    token: String,
    company_domain: String,
    owner_id: Option<UserId>,
}

impl ConnectorConfig {
    /// Checks run in order: config, token, company domain.
    pub fn from_value(cfg: Option<&Value>) -> Result<Self> {
        let cfg = match cfg {
            Some(Value::Null) | None => return Err(ConnectorError::MissingConfig),
            Some(cfg) => cfg,
        };

        let token = required_text(cfg, "token").ok_or(ConnectorError::MissingToken)?;
        let company_domain =
            required_text(cfg, "company_domain").ok_or(ConnectorError::MissingCompanyDomain)?;
        let owner_id = cfg.get("owner_id").and_then(owner_id_from_value);

        Ok(Self {
            token,
            company_domain,
            owner_id,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn company_domain(&self) -> &str {
        &self.company_domain
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }

    pub fn api_base_url(&self) -> String {
        format!("https://{}.pipedrive.com/v1", self.company_domain)
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("token", &"<redacted>")
            .field("company_domain", &self.company_domain)
            .field("owner_id", &self.owner_id)
            .finish()
    }
}

/// Unvalidated config object built from `PIPEDRIVE_API_TOKEN`,
/// `PIPEDRIVE_COMPANY_DOMAIN` and `PIPEDRIVE_OWNER_ID`. Actions validate it
/// themselves, after any checks that must run first.
pub fn raw_from_env() -> Value {
    raw_from_lookup(|key| env::var(key).ok())
}

pub(crate) fn raw_from_lookup<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = serde_json::Map::new();
    for (env_key, cfg_key) in [
        (TOKEN_ENV, "token"),
        (COMPANY_DOMAIN_ENV, "company_domain"),
        (OWNER_ID_ENV, "owner_id"),
    ] {
        if let Some(value) = lookup(env_key) {
            cfg.insert(cfg_key.to_string(), Value::String(value));
        }
    }
    Value::Object(cfg)
}

fn required_text(cfg: &Value, key: &str) -> Option<String> {
    let text = match cfg.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Owner ids are only taken from finite, integral, positive numbers.
pub fn parse_owner_id(raw: &str) -> Option<UserId> {
    let number: f64 = raw.trim().parse().ok()?;
    owner_id_from_f64(number)
}

pub(crate) fn owner_id_from_value(value: &Value) -> Option<UserId> {
    match value {
        Value::String(s) => parse_owner_id(s),
        Value::Number(n) => match n.as_u64() {
            Some(id) if id > 0 => Some(UserId(id)),
            Some(_) => None,
            None => n.as_f64().and_then(owner_id_from_f64),
        },
        _ => None,
    }
}

fn owner_id_from_f64(number: f64) -> Option<UserId> {
    if number.is_finite() && number > 0.0 && number.fract() == 0.0 && number < u64::MAX as f64 {
        Some(UserId(number as u64))
    } else {
        None
    }
}

/// Owner precedence: the inbound message, then configuration, else unset.
pub fn resolve_owner(from_message: Option<UserId>, from_config: Option<UserId>) -> Option<UserId> {
    from_message.or(from_config)
}
