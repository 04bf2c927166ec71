//! Pipedrive REST API client
//!
//! This crate provides a thin client for the Pipedrive endpoints exercised by
//! the contract suite:
//! - Person creation, retrieval and deletion
//! - Organization creation and deletion
//!
//! # Example
//!
//! ```rust,no_run
//! use pipedrive_client::{ContactField, NewPerson, PipedriveClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PipedriveClient::from_env()?;
//!
//! let org = client.create_organization("Acme").await?;
//! let person = client
//!     .create_person(
//!         &NewPerson::new("Jane Doe")
//!             .email(vec![ContactField::primary("work", "jane@acme.test")])
//!             .org_id(org.id),
//!     )
//!     .await?;
//!
//! client.delete_person(person.id).await?;
//! client.delete_organization(org.id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! - `PIPEDRIVE_API_TOKEN`: API token (required)
//! - `PIPEDRIVE_API_URL`: API root (default: `https://api.pipedrive.com/v1`)
//! - `PIPEDRIVE_TIMEOUT`: request timeout in seconds (default: 30)

mod client;
mod error;
mod models;

pub use client::PipedriveClient;
pub use error::{PipedriveError, PipedriveResult};
pub use models::{
    ApiEnvelope, ContactField, DeletedEntity, NewPerson, OrgRef, Organization, Person,
};
pub use pipedrive_shared_config::PipedriveConfig;
