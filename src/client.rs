//! Pipedrive REST client
//!
//! One client is built per invocation from that invocation's configuration.
//! Every request carries the `api_token` query parameter.

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::models::{
    Activity, ApiEnvelope, Deal, NewActivity, NewDeal, NewNote, NewOrganisation, NewPerson, Note,
    Organisation, Person,
};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// CRM operations the actions depend on
#[async_trait]
pub trait CrmApi: Send + Sync {
    async fn create_organisation(
        &self,
        organisation: &NewOrganisation,
    ) -> Result<ApiEnvelope<Organisation>>;

    async fn create_person(&self, person: &NewPerson) -> Result<ApiEnvelope<Person>>;

    async fn create_deal(&self, deal: &NewDeal) -> Result<ApiEnvelope<Deal>>;

    async fn create_note(&self, note: &NewNote) -> Result<ApiEnvelope<Note>>;

    async fn create_activity(&self, activity: &NewActivity) -> Result<ApiEnvelope<Activity>>;
}

pub struct PipedriveClient {
    client: Client,
    base_url: String,
    token: String,
}

impl PipedriveClient {
    /// Client for `https://{company_domain}.pipedrive.com/v1`
    pub fn new(config: &ConnectorConfig) -> Result<Self> {
        Self::with_base_url(config, config.api_base_url())
    }

    /// Client against another base URL (proxies, test servers)
    pub fn with_base_url(config: &ConnectorConfig, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pipedrive-connector/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: config.token().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(path, "POST to Pipedrive");

        let response = self
            .client
            .post(&url)
            .query(&[("api_token", self.token.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        match serde_json::from_slice::<ApiEnvelope<T>>(&bytes) {
            Ok(envelope) => {
                debug!(path, %status, success = envelope.success, "Pipedrive responded");
                Ok(envelope)
            }
            // Gateways answer errors with non-JSON pages.
            Err(_) if !status.is_success() => Ok(ApiEnvelope {
                success: false,
                data: None,
                error: Some(format!("HTTP {}", status)),
                related_objects: None,
            }),
            Err(e) => Err(ConnectorError::SerializationError(e)),
        }
    }
}

#[async_trait]
impl CrmApi for PipedriveClient {
    async fn create_organisation(
        &self,
        organisation: &NewOrganisation,
    ) -> Result<ApiEnvelope<Organisation>> {
        self.post("/organisations", organisation).await
    }

    async fn create_person(&self, person: &NewPerson) -> Result<ApiEnvelope<Person>> {
        self.post("/persons", person).await
    }

    async fn create_deal(&self, deal: &NewDeal) -> Result<ApiEnvelope<Deal>> {
        self.post("/deals", deal).await
    }

    async fn create_note(&self, note: &NewNote) -> Result<ApiEnvelope<Note>> {
        self.post("/notes", note).await
    }

    async fn create_activity(&self, activity: &NewActivity) -> Result<ApiEnvelope<Activity>> {
        self.post("/activities", activity).await
    }
}

/// Created record, or `could not create {what}` when Pipedrive refused it
pub fn expect_created<T>(envelope: ApiEnvelope<T>, what: &str) -> Result<T> {
    match envelope {
        ApiEnvelope {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        ApiEnvelope { error, .. } => {
            warn!(
                resource = what,
                error = error.as_deref().unwrap_or("no error detail"),
                "Pipedrive did not create resource"
            );
            Err(ConnectorError::upstream(what))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteId;
    use serde_json::json;

    #[test]
    fn test_expect_created_success() {
        let envelope: ApiEnvelope<Note> =
            serde_json::from_value(json!({ "success": true, "data": { "id": 3 } })).unwrap();
        let note = expect_created(envelope, "note").unwrap();
        assert_eq!(note.id, NoteId(3));
    }

    #[test]
    fn test_expect_created_failure() {
        let envelope: ApiEnvelope<Note> =
            serde_json::from_value(json!({ "success": false, "error": "nope" })).unwrap();
        let err = expect_created(envelope, "note").unwrap_err();
        assert_eq!(err.to_string(), "could not create note");
    }

    #[test]
    fn test_success_without_data_is_a_failure() {
        let envelope: ApiEnvelope<Note> =
            serde_json::from_value(json!({ "success": true, "data": null })).unwrap();
        assert!(matches!(
            expect_created(envelope, "note"),
            Err(ConnectorError::Upstream(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let cfg = json!({ "token": "t", "company_domain": "acme" });
        let config = ConnectorConfig::from_value(Some(&cfg)).unwrap();

        let client = PipedriveClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://acme.pipedrive.com/v1");

        let client = PipedriveClient::with_base_url(&config, "http://localhost:9000/v1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/v1");
    }
}
