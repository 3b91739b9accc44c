//! Action trait and registry
//!
//! An action receives one platform message, talks to Pipedrive and emits one
//! message. Actions are stateless; the CRM client is built per invocation.

use crate::client::PipedriveClient;
use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::message::{Message, Snapshot};
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod create_deal;
pub mod create_deal_only;

pub use create_deal::CreateDealAction;
pub use create_deal_only::CreateDealOnlyAction;

#[async_trait::async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// `cfg` is the raw configuration object handed over by the platform.
    async fn process(
        &self,
        msg: Message,
        cfg: Option<&Value>,
        snapshot: &Snapshot,
    ) -> Result<Message>;
}

/// Where actions send their requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Endpoint {
    /// `https://{company_domain}.pipedrive.com/v1`
    #[default]
    CompanyDomain,
    Fixed(String),
}

impl Endpoint {
    pub(crate) fn client(&self, config: &ConnectorConfig) -> Result<PipedriveClient> {
        match self {
            Endpoint::CompanyDomain => PipedriveClient::new(config),
            Endpoint::Fixed(base_url) => PipedriveClient::with_base_url(config, base_url.as_str()),
        }
    }
}

/// Action registry for looking up actions by name
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<dyn Action>> {
        self.get(name)
            .ok_or_else(|| ConnectorError::ActionNotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with every action this connector ships
pub fn create_default_registry() -> ActionRegistry {
    create_registry(Endpoint::default())
}

pub fn create_registry(endpoint: Endpoint) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(CreateDealAction::new(endpoint.clone())));
    registry.register(Arc::new(CreateDealOnlyAction::new(endpoint)));
    registry
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory CRM that records every create call in order.

    use crate::client::CrmApi;
    use crate::models::*;
    use crate::Result;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Call {
        pub resource: &'static str,
        pub body: Value,
    }

    pub struct RecordingCrm {
        calls: Mutex<Vec<Call>>,
        reject: Option<&'static str>,
    }

    impl RecordingCrm {
        pub fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject: None,
            }
        }

        /// Answers `success: false` for the given resource
        pub fn rejecting(resource: &'static str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject: Some(resource),
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record<B: Serialize, T: DeserializeOwned>(
            &self,
            resource: &'static str,
            id: u64,
            body: &B,
        ) -> Result<ApiEnvelope<T>> {
            let body = serde_json::to_value(body)?;
            self.calls.lock().unwrap().push(Call {
                resource,
                body: body.clone(),
            });

            if self.reject == Some(resource) {
                return Ok(serde_json::from_value(json!({
                    "success": false,
                    "error": format!("{} rejected", resource)
                }))?);
            }

            let mut data = body;
            data["id"] = json!(id);
            Ok(serde_json::from_value(json!({ "success": true, "data": data }))?)
        }
    }

    #[async_trait::async_trait]
    impl CrmApi for RecordingCrm {
        async fn create_organisation(
            &self,
            organisation: &NewOrganisation,
        ) -> Result<ApiEnvelope<Organisation>> {
            self.record("organisation", 101, organisation)
        }

        async fn create_person(&self, person: &NewPerson) -> Result<ApiEnvelope<Person>> {
            self.record("person", 202, person)
        }

        async fn create_deal(&self, deal: &NewDeal) -> Result<ApiEnvelope<Deal>> {
            self.record("deal", 303, deal)
        }

        async fn create_note(&self, note: &NewNote) -> Result<ApiEnvelope<Note>> {
            self.record("note", 404, note)
        }

        async fn create_activity(&self, activity: &NewActivity) -> Result<ApiEnvelope<Activity>> {
            self.record("activity", 505, activity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = create_default_registry();
        assert_eq!(registry.list(), vec!["create_deal", "create_deal_only"]);
        assert!(registry.get("create_deal").is_some());
    }

    #[test]
    fn test_unknown_action() {
        let registry = create_default_registry();
        assert!(matches!(
            registry.require("delete_everything"),
            Err(ConnectorError::ActionNotFound(_))
        ));
    }
}
