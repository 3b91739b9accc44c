//! Pipedrive Connector
//!
//! Workflow-platform actions that turn an inbound message (typically a
//! website lead) into Pipedrive records:
//! - `create_deal`: organisation, contact person, deal and note, in that order
//! - `create_deal_only`: a single deal for an existing person/organisation
//!
//! FLOW:
//! CONFIG → ORGANISATION → PERSON → DEAL → NOTE → OUTPUT (+ deal_id)

pub mod actions;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod models;

pub use error::Result;

// Re-export common types
pub use actions::{create_default_registry, Action, ActionRegistry, Endpoint};
pub use client::{CrmApi, PipedriveClient};
pub use config::ConnectorConfig;
pub use error::ConnectorError;
pub use message::{Message, Snapshot};
