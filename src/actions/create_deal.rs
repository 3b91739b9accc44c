//! Full-chain deal creation
//!
//! organisation → person → deal → note. Each stage takes the record returned
//! by the stage before it, so a later request can only be built from ids the
//! CRM actually handed back. The first failure aborts the chain; records
//! created before it are left in place.

use crate::actions::{Action, Endpoint};
use crate::client::{expect_created, CrmApi};
use crate::config::ConnectorConfig;
use crate::message::{LeadSubmission, Message, Snapshot};
use crate::models::{
    Deal, DealStatus, NewDeal, NewNote, NewOrganisation, NewPerson, Note, Organisation, Person,
};
use crate::Result;
use serde_json::Value;
use tracing::{debug, info};

pub struct CreateDealAction {
    endpoint: Endpoint,
}

impl CreateDealAction {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl Default for CreateDealAction {
    fn default() -> Self {
        Self::new(Endpoint::default())
    }
}

#[async_trait::async_trait]
impl Action for CreateDealAction {
    fn name(&self) -> &'static str {
        "create_deal"
    }

    fn description(&self) -> &'static str {
        "Create an organisation, a contact person, a deal and a note from a website lead"
    }

    async fn process(
        &self,
        msg: Message,
        cfg: Option<&Value>,
        snapshot: &Snapshot,
    ) -> Result<Message> {
        debug!(
            message_id = %msg.id,
            fields = msg.body.len(),
            snapshot_empty = snapshot.is_empty(),
            "create_deal invoked"
        );

        let config = ConnectorConfig::from_value(cfg)?;
        let crm = self.endpoint.client(&config)?;

        process_lead(&crm, msg).await
    }
}

/// Runs the chain for one message against any CRM backend.
pub async fn process_lead(crm: &dyn CrmApi, msg: Message) -> Result<Message> {
    let lead = LeadSubmission::from_message(&msg)?;
    let deal = run_lead_chain(crm, &lead).await?;

    Ok(msg.with_deal_id(deal.id))
}

pub async fn run_lead_chain(crm: &dyn CrmApi, lead: &LeadSubmission) -> Result<Deal> {
    let organisation = create_organisation(crm, lead).await?;
    let person = create_person(crm, lead, &organisation).await?;
    let deal = create_deal(crm, lead, &person, &organisation).await?;
    create_note(crm, lead, &deal).await?;

    Ok(deal)
}

pub async fn create_organisation(crm: &dyn CrmApi, lead: &LeadSubmission) -> Result<Organisation> {
    info!(company = %lead.company, "Creating organisation");

    let request = NewOrganisation {
        name: lead.company.clone(),
        owner_id: None,
        visibility: None,
    };
    let organisation = expect_created(crm.create_organisation(&request).await?, "company")?;

    info!(org_id = %organisation.id, "Created organisation");
    Ok(organisation)
}

pub async fn create_person(
    crm: &dyn CrmApi,
    lead: &LeadSubmission,
    organisation: &Organisation,
) -> Result<Person> {
    info!(org_id = %organisation.id, "Creating person");

    let request = NewPerson {
        name: lead.contact_name.clone(),
        email: vec![lead.contact_email.clone()],
        phone: vec![lead.contact_phone.clone()],
        org_id: organisation.id,
        owner_id: None,
        visibility: None,
    };
    let person = expect_created(crm.create_person(&request).await?, "person")?;

    info!(person_id = %person.id, "Created person");
    Ok(person)
}

pub async fn create_deal(
    crm: &dyn CrmApi,
    lead: &LeadSubmission,
    person: &Person,
    organisation: &Organisation,
) -> Result<Deal> {
    info!(person_id = %person.id, org_id = %organisation.id, "Creating deal");

    let request = NewDeal {
        title: lead.deal_title(),
        value: None,
        currency: None,
        user_id: None,
        person_id: person.id,
        org_id: organisation.id,
        stage_id: None,
        status: DealStatus::Open,
        visibility: None,
    };
    let deal = expect_created(crm.create_deal(&request).await?, "deal")?;

    info!(deal_id = %deal.id, "Created deal");
    Ok(deal)
}

pub async fn create_note(crm: &dyn CrmApi, lead: &LeadSubmission, deal: &Deal) -> Result<Note> {
    info!(deal_id = %deal.id, "Creating note");

    let request = NewNote {
        content: lead.note_content(),
        deal_id: deal.id,
        person_id: None,
        org_id: None,
    };
    let note = expect_created(crm.create_note(&request).await?, "note")?;

    info!(note_id = %note.id, "Created note");
    Ok(note)
}
