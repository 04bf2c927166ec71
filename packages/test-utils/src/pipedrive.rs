//! Mock Pipedrive server for contract tests
//!
//! Provides a [`MockPipedriveServer`] that keeps persons and organizations in
//! memory and answers the person/organization endpoints with Pipedrive's
//! envelope and error shapes, so the contract suite can run without an
//! account.
//!
//! # Lock Poisoning Recovery
//!
//! The store lock is acquired with `unwrap_or_else(|e| e.into_inner())`. If a
//! test panics while holding it, later requests still see the store instead
//! of failing with a `PoisonError`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use pipedrive_client::{PipedriveClient, PipedriveConfig, PipedriveResult};
use serde_json::{json, Value};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const PERSONS: &str = r"^/persons$";
const PERSON_BY_ID: &str = r"^/persons/\d+$";
const ORGANIZATIONS: &str = r"^/organizations$";
const ORGANIZATION_BY_ID: &str = r"^/organizations/\d+$";

/// Mock Pipedrive server backed by an in-memory store
///
/// This struct wraps a [`wiremock::MockServer`] with stateful responders for
/// `POST /persons`, `GET /persons/{id}`, `DELETE /persons/{id}`,
/// `POST /organizations` and `DELETE /organizations/{id}`.
///
/// # Example
///
/// ```rust,ignore
/// use pipedrive_client::NewPerson;
/// use pipedrive_test_utils::MockPipedriveServer;
///
/// #[tokio::test]
/// async fn test_round_trip() {
///     let server = MockPipedriveServer::start().await;
///     let client = server.client().unwrap();
///
///     let person = client.create_person(&NewPerson::new("Ada")).await.unwrap();
///     assert_eq!(server.person_count(), 1);
///     client.delete_person(person.id).await.unwrap();
/// }
/// ```
pub struct MockPipedriveServer {
    server: MockServer,
    api_token: String,
    store: Arc<Mutex<Store>>,
}

/// State shared by all route responders
#[derive(Debug, Default)]
struct Store {
    last_id: i64,
    persons: BTreeMap<i64, Value>,
    organizations: BTreeMap<i64, String>,
    injected_failure: Option<u16>,
    request_count: usize,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

type Handler = fn(&mut Store, &Request) -> ResponseTemplate;

/// One endpoint bound to the shared store
struct Route {
    store: Arc<Mutex<Store>>,
    api_token: String,
    handler: Handler,
}

impl Respond for Route {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let authorized = request
            .url
            .query_pairs()
            .any(|(key, value)| key == "api_token" && value == self.api_token.as_str());
        if !authorized {
            return error_response(401, "You need to be authorized to make this request.");
        }

        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store.request_count += 1;
        if let Some(status) = store.injected_failure.take() {
            return error_response(status, "Injected failure");
        }
        (self.handler)(&mut *store, request)
    }
}

impl MockPipedriveServer {
    /// Start a new mock Pipedrive server with default API token
    pub async fn start() -> Self {
        Self::start_with_api_token("test-api-token").await
    }

    /// Start a new mock Pipedrive server with custom API token
    pub async fn start_with_api_token(api_token: &str) -> Self {
        let mock = Self {
            server: MockServer::start().await,
            api_token: api_token.to_string(),
            store: Arc::new(Mutex::new(Store::default())),
        };

        mock.mount("POST", PERSONS, create_person).await;
        mock.mount("GET", PERSON_BY_ID, get_person).await;
        mock.mount("DELETE", PERSON_BY_ID, delete_person).await;
        mock.mount("POST", ORGANIZATIONS, create_organization).await;
        mock.mount("DELETE", ORGANIZATION_BY_ID, delete_organization).await;
        mock
    }

    async fn mount(&self, verb: &str, pattern: &str, handler: Handler) {
        let route = Route {
            store: Arc::clone(&self.store),
            api_token: self.api_token.clone(),
            handler,
        };

        Mock::given(method(verb))
            .and(path_regex(pattern))
            .respond_with(route)
            .mount(&self.server)
            .await;
    }

    /// Get the server URL
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Get the API token
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// Client configuration pointing at this server
    pub fn config(&self) -> PipedriveConfig {
        PipedriveConfig::with_base_url(self.url(), self.api_token.clone())
    }

    /// Build a client pointing at this server
    pub fn client(&self) -> PipedriveResult<PipedriveClient> {
        PipedriveClient::new(self.config())
    }

    /// Number of persons currently stored
    pub fn person_count(&self) -> usize {
        self.lock().persons.len()
    }

    /// Number of organizations currently stored
    pub fn organization_count(&self) -> usize {
        self.lock().organizations.len()
    }

    /// Check if a person is currently stored
    pub fn has_person(&self, person_id: i64) -> bool {
        self.lock().persons.contains_key(&person_id)
    }

    /// Number of authorized requests handled so far
    pub fn request_count(&self) -> usize {
        self.lock().request_count
    }

    /// Answer the next authorized request with `status` instead of handling it
    pub fn fail_next_with(&self, status: u16) {
        self.lock().injected_failure = Some(status);
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn create_person(store: &mut Store, request: &Request) -> ResponseTemplate {
    let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
        return error_response(400, "Request body is not valid JSON.");
    };

    let name = body.get("name").and_then(Value::as_str).unwrap_or_default();
    if name.trim().is_empty() {
        return error_response(400, "Name must be given.");
    }

    let org_id = match body.get("org_id") {
        None | Some(Value::Null) => Value::Null,
        Some(raw) => {
            let linked = raw
                .as_i64()
                .and_then(|id| store.organizations.get(&id).map(|org_name| (id, org_name)));
            match linked {
                Some((id, org_name)) => json!({ "value": id, "name": org_name }),
                None => return error_response(400, "Organization not found."),
            }
        }
    };

    let id = store.next_id();
    let person = json!({
        "id": id,
        "name": name,
        "email": contact_entries(body.get("email")),
        "phone": contact_entries(body.get("phone")),
        "org_id": org_id,
        "label_ids": body.get("label_ids").cloned().unwrap_or_else(|| json!([])),
    });
    store.persons.insert(id, person.clone());

    ResponseTemplate::new(201).set_body_json(json!({ "success": true, "data": person }))
}

fn get_person(store: &mut Store, request: &Request) -> ResponseTemplate {
    match path_id(request).and_then(|id| store.persons.get(&id)) {
        Some(person) => {
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": person }))
        }
        None => error_response(404, "Person not found"),
    }
}

fn delete_person(store: &mut Store, request: &Request) -> ResponseTemplate {
    match path_id(request).filter(|id| store.persons.remove(id).is_some()) {
        Some(id) => deleted_response(id),
        None => error_response(404, "Person not found"),
    }
}

fn create_organization(store: &mut Store, request: &Request) -> ResponseTemplate {
    let name = serde_json::from_slice::<Value>(&request.body)
        .ok()
        .and_then(|body| body.get("name").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default();
    if name.trim().is_empty() {
        return error_response(400, "Name must be given.");
    }

    let id = store.next_id();
    store.organizations.insert(id, name.clone());
    ResponseTemplate::new(201).set_body_json(json!({
        "success": true,
        "data": { "id": id, "name": name }
    }))
}

fn delete_organization(store: &mut Store, request: &Request) -> ResponseTemplate {
    let Some(id) = path_id(request).filter(|id| store.organizations.remove(id).is_some()) else {
        return error_response(404, "Organization not found");
    };

    // Pipedrive unlinks persons from a deleted organization
    for person in store.persons.values_mut() {
        if person["org_id"]["value"].as_i64() == Some(id) {
            person["org_id"] = Value::Null;
        }
    }
    deleted_response(id)
}

/// Normalize submitted email/phone entries the way Pipedrive stores them
///
/// Lists are kept positionally, a bare string becomes one primary entry, and
/// an absent field becomes a single blank primary entry.
fn contact_entries(raw: Option<&Value>) -> Value {
    match raw {
        Some(Value::Array(entries)) => Value::Array(entries.clone()),
        Some(Value::String(value)) => json!([{ "label": "", "value": value, "primary": true }]),
        _ => json!([{ "value": "", "primary": true }]),
    }
}

fn path_id(request: &Request) -> Option<i64> {
    request.url.path().rsplit('/').next()?.parse().ok()
}

fn deleted_response(id: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": { "id": id } }))
}

fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "success": false,
        "error": message,
        "data": null
    }))
}
