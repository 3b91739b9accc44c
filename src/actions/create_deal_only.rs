//! Deal-only creation
//!
//! Used when an earlier step already created the person and organisation.
//! A message that already carries a `deal_id` is passed through untouched so
//! replayed messages do not create duplicate deals.

use crate::actions::{Action, Endpoint};
use crate::client::{expect_created, CrmApi};
use crate::config::{resolve_owner, ConnectorConfig};
use crate::message::{DealSubmission, Message, Snapshot};
use crate::models::{Deal, DealStatus, NewDeal, UserId};
use crate::Result;
use serde_json::Value;
use tracing::{debug, info};

pub struct CreateDealOnlyAction {
    endpoint: Endpoint,
}

impl CreateDealOnlyAction {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl Default for CreateDealOnlyAction {
    fn default() -> Self {
        Self::new(Endpoint::default())
    }
}

#[async_trait::async_trait]
impl Action for CreateDealOnlyAction {
    fn name(&self) -> &'static str {
        "create_deal_only"
    }

    fn description(&self) -> &'static str {
        "Create a deal for an existing person and organisation"
    }

    async fn process(
        &self,
        msg: Message,
        cfg: Option<&Value>,
        snapshot: &Snapshot,
    ) -> Result<Message> {
        if let Some(deal_id) = msg.existing_deal_id() {
            info!(message_id = %msg.id, %deal_id, "Deal already exists, skipping");
            return Ok(msg);
        }

        debug!(
            message_id = %msg.id,
            fields = msg.body.len(),
            snapshot_empty = snapshot.is_empty(),
            "create_deal_only invoked"
        );

        let config = ConnectorConfig::from_value(cfg)?;
        let crm = self.endpoint.client(&config)?;

        process_deal(&crm, msg, config.owner_id()).await
    }
}

/// `config_owner` only applies when the message names no owner.
pub async fn process_deal(
    crm: &dyn CrmApi,
    msg: Message,
    config_owner: Option<UserId>,
) -> Result<Message> {
    let submission = DealSubmission::from_message(&msg)?;
    let deal = create_deal(crm, &submission, config_owner).await?;

    Ok(msg.with_deal_id(deal.id))
}

pub async fn create_deal(
    crm: &dyn CrmApi,
    submission: &DealSubmission,
    config_owner: Option<UserId>,
) -> Result<Deal> {
    let owner = resolve_owner(submission.owner_id, config_owner);
    info!(
        person_id = %submission.person_id,
        org_id = %submission.org_id,
        owner = ?owner,
        "Creating deal"
    );

    let request = NewDeal {
        title: submission.deal_title.clone(),
        value: None,
        currency: submission.deal_currency.clone(),
        user_id: owner,
        person_id: submission.person_id,
        org_id: submission.org_id,
        stage_id: None,
        status: DealStatus::Open,
        visibility: None,
    };
    let deal = expect_created(crm.create_deal(&request).await?, "deal")?;

    info!(deal_id = %deal.id, "Created deal");
    Ok(deal)
}
