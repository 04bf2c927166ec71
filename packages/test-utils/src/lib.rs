//! Shared test utilities for the Pipedrive contract suite
//!
//! This crate provides the fixture layer the contract tests are written
//! against, plus an in-memory stand-in for the Pipedrive API so the suite can
//! run without network access.
//!
//! # Components
//!
//! - [`TestSession`] - The client shared by the tests, pointed at the mock or the live API
//! - [`SharedSession`] - The one session of a test binary, on its own runtime
//! - [`FixtureScope`] - Setup and guaranteed teardown around a test body
//! - [`MockPipedriveServer`] - Stateful mock of the person/organization endpoints
//! - [`PersonFixture`] - Random and canned person payloads
//!
//! # Example
//!
//! ```rust,ignore
//! use pipedrive_client::NewPerson;
//! use pipedrive_test_utils::SharedSession;
//!
//! #[test]
//! fn test_with_cleanup() {
//!     SharedSession::get().unwrap().block_on(|session| async move {
//!         session
//!             .scope()
//!             .run(|ctx| async move {
//!                 ctx.create_person(&NewPerson::new("Ada")).await.unwrap();
//!             })
//!             .await
//!             .unwrap();
//!     });
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `PIPEDRIVE_CONTRACT_TARGET`: `live` to hit the real API, anything else for the mock
//! - `PIPEDRIVE_API_TOKEN`: required when the target is `live`

mod data;
mod fixtures;
mod pipedrive;

pub use data::{PersonFixture, KNOWN_LABEL_IDS};
pub use fixtures::{FixtureScope, PersonTracker, SharedSession, TestContext, TestSession};
pub use pipedrive::MockPipedriveServer;
