//! Session and scoped fixtures for contract tests
//!
//! A [`TestSession`] owns the one client the tests talk through, and
//! [`SharedSession`] holds the single session of a test binary. Each test
//! body runs inside a [`FixtureScope`], which creates the requested
//! preconditions, hands the body a [`TestContext`], and afterwards deletes
//! everything the body recorded, whether the body returned normally or
//! panicked.
//!
//! # Example
//!
//! ```rust,ignore
//! use pipedrive_client::NewPerson;
//! use pipedrive_test_utils::SharedSession;
//!
//! #[test]
//! fn test_person_with_org() {
//!     SharedSession::get().unwrap().block_on(|session| async move {
//!         session
//!             .scope()
//!             .with_organization("Test Org for Person")
//!             .run(|ctx| async move {
//!                 let org = ctx.organization().unwrap();
//!                 let person = ctx
//!                     .create_person(&NewPerson::new("Ada").org_id(org.id))
//!                     .await
//!                     .unwrap();
//!                 assert_eq!(person.organization_id(), Some(org.id));
//!             })
//!             .await
//!             .unwrap();
//!     });
//! }
//! ```

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use once_cell::sync::OnceCell;
use pipedrive_client::{NewPerson, Organization, Person, PipedriveClient, PipedriveResult};
use pipedrive_shared_config::{load_dotenv, ContractTarget};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info, warn};

use crate::pipedrive::MockPipedriveServer;

static SHARED: OnceCell<SharedSession> = OnceCell::new();

/// The one [`TestSession`] of a test binary
///
/// The session is started on first use and lives until the process exits,
/// so every test talks through the same client. It owns a Tokio runtime of
/// its own: the client's connection pool stays on the runtime that built it
/// whichever test thread is calling. Bodies passed to [`block_on`] take
/// turns, so no two tests have requests in flight at the same time even
/// under the parallel test runner.
///
/// [`block_on`]: SharedSession::block_on
pub struct SharedSession {
    runtime: Runtime,
    session: TestSession,
    turn: Mutex<()>,
}

impl SharedSession {
    /// Get the shared session, starting it on first call
    ///
    /// A failed start is not kept, so the next caller tries again.
    ///
    /// # Errors
    /// Returns the error of [`TestSession::start`]
    pub fn get() -> PipedriveResult<&'static SharedSession> {
        SHARED.get_or_try_init(|| {
            let runtime = Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("pipedrive-session")
                .enable_all()
                .build()
                .expect("Failed building the Runtime");
            let session = runtime.block_on(TestSession::start())?;

            Ok(Self {
                runtime,
                session,
                turn: Mutex::new(()),
            })
        })
    }

    /// The session every test shares
    pub fn session(&self) -> &TestSession {
        &self.session
    }

    /// Run `test` against the shared session on the session runtime
    ///
    /// Waits until no other test body is running. A body that panicked
    /// releases its turn as it unwinds.
    pub fn block_on<'a, F, Fut>(&'a self, test: F) -> Fut::Output
    where
        F: FnOnce(&'a TestSession) -> Fut,
        Fut: Future,
    {
        let _turn = self.turn.lock().unwrap_or_else(|e| e.into_inner());
        self.runtime.block_on(test(&self.session))
    }
}

/// The client shared by every scope of a session
pub struct TestSession {
    client: PipedriveClient,
    mock: Option<MockPipedriveServer>,
}

impl TestSession {
    /// Start a session against the target named by `PIPEDRIVE_CONTRACT_TARGET`
    ///
    /// A `.env` file is loaded first, so the target and token may live there.
    pub async fn start() -> PipedriveResult<Self> {
        load_dotenv();
        match ContractTarget::from_env() {
            ContractTarget::Live => Self::live(),
            ContractTarget::Mock => Self::mock().await,
        }
    }

    /// Start a session against the real API configured in the environment
    ///
    /// # Errors
    /// Returns `PipedriveError::Config` if `PIPEDRIVE_API_TOKEN` is not set
    pub fn live() -> PipedriveResult<Self> {
        let client = PipedriveClient::from_env()?;
        info!(base_url = %client.config().base_url, "Contract session targets live API");

        Ok(Self { client, mock: None })
    }

    /// Start a session against a fresh in-memory mock server
    pub async fn mock() -> PipedriveResult<Self> {
        let server = MockPipedriveServer::start().await;
        let client = server.client()?;
        debug!(url = %server.url(), "Contract session targets mock server");

        Ok(Self {
            client,
            mock: Some(server),
        })
    }

    /// Get the shared client
    pub fn client(&self) -> &PipedriveClient {
        &self.client
    }

    /// The backing mock server, if the session is not live
    pub fn mock_server(&self) -> Option<&MockPipedriveServer> {
        self.mock.as_ref()
    }

    /// Open a fixture scope on this session
    pub fn scope(&self) -> FixtureScope<'_> {
        FixtureScope {
            session: self,
            organization_name: None,
        }
    }
}

/// Ids of persons created inside one scope
///
/// Clones share the same list, so the body can record ids that the scope
/// deletes afterwards.
#[derive(Debug, Clone, Default)]
pub struct PersonTracker {
    ids: Arc<Mutex<Vec<i64>>>,
}

impl PersonTracker {
    /// Record a person for deletion at the end of the scope
    pub fn track(&self, person_id: i64) {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).push(person_id);
    }

    /// Ids recorded so far, in creation order
    pub fn ids(&self) -> Vec<i64> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self) -> Vec<i64> {
        std::mem::take(&mut *self.ids.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// What a test body receives from its scope
#[derive(Debug, Clone)]
pub struct TestContext {
    /// Client of the owning session
    pub client: PipedriveClient,
    /// Persons to delete when the scope ends
    pub persons: PersonTracker,
    organization: Option<Organization>,
}

impl TestContext {
    /// Organization created for this scope, if one was requested
    pub fn organization(&self) -> Option<&Organization> {
        self.organization.as_ref()
    }

    /// Create a person and record it for deletion
    pub async fn create_person(&self, person: &NewPerson) -> PipedriveResult<Person> {
        let created = self.client.create_person(person).await?;
        self.persons.track(created.id);
        Ok(created)
    }
}

/// Setup and guaranteed teardown around one test body
pub struct FixtureScope<'a> {
    session: &'a TestSession,
    organization_name: Option<String>,
}

impl FixtureScope<'_> {
    /// Create an organization with this name before the body runs
    ///
    /// The organization is deleted after the tracked persons.
    pub fn with_organization(mut self, name: impl Into<String>) -> Self {
        self.organization_name = Some(name.into());
        self
    }

    /// Run `body`, then delete every tracked person and the organization
    ///
    /// Teardown runs on every exit path. If the body panicked, the panic is
    /// resumed once teardown is done. A failed delete is not retried: the
    /// remaining persons are left in place, the organization delete is still
    /// attempted, and the first error is returned.
    ///
    /// # Errors
    /// Returns the error of organization setup or of the first failed delete
    pub async fn run<F, Fut, T>(self, body: F) -> PipedriveResult<T>
    where
        F: FnOnce(TestContext) -> Fut,
        Fut: Future<Output = T>,
    {
        let client = self.session.client().clone();
        let organization = match &self.organization_name {
            Some(name) => Some(client.create_organization(name).await?),
            None => None,
        };

        let persons = PersonTracker::default();
        let context = TestContext {
            client: client.clone(),
            persons: persons.clone(),
            organization: organization.clone(),
        };

        let outcome = AssertUnwindSafe(body(context)).catch_unwind().await;
        let teardown = teardown(&client, &persons, organization.as_ref()).await;

        match outcome {
            Ok(value) => teardown.map(|()| value),
            Err(panic) => {
                if let Err(e) = teardown {
                    error!(error = %e, "Teardown failed after test body panicked");
                }
                panic::resume_unwind(panic)
            }
        }
    }
}

async fn teardown(
    client: &PipedriveClient,
    persons: &PersonTracker,
    organization: Option<&Organization>,
) -> PipedriveResult<()> {
    let mut result = Ok(());

    for person_id in persons.take() {
        if let Err(e) = client.delete_person(person_id).await {
            warn!(person_id, error = %e, "Failed to delete tracked person");
            result = Err(e);
            break;
        }
    }

    if let Some(org) = organization {
        if let Err(e) = client.delete_organization(org.id).await {
            warn!(org_id = org.id, error = %e, "Failed to delete scope organization");
            if result.is_ok() {
                result = Err(e);
            }
        }
    }

    result
}
