//! Pipedrive API client implementation

use std::fmt;
use std::time::Duration;

use pipedrive_shared_config::{ConfigError, PipedriveConfig};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::{PipedriveError, PipedriveResult};
use crate::models::{
    ApiEnvelope, DeletedEntity, ErrorResponse, NewOrganization, NewPerson, Organization, Person,
};

/// Query parameter carrying the API token
const TOKEN_PARAM: &str = "api_token";

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum error body size kept in error messages
const MAX_ERROR_BODY_SIZE: usize = 1000;

/// Pipedrive REST API client
///
/// Every request carries the configured token as the `api_token` query
/// parameter. Requests are sent once; any non-2xx answer is returned as
/// [`PipedriveError::Api`].
#[derive(Clone)]
pub struct PipedriveClient {
    http_client: Client,
    config: PipedriveConfig,
}

impl fmt::Debug for PipedriveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipedriveClient")
            .field("base_url", &self.config.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl PipedriveClient {
    /// Create a new Pipedrive client from configuration
    ///
    /// # Errors
    /// Returns `PipedriveError::Config` if the API token is empty
    pub fn new(config: PipedriveConfig) -> PipedriveResult<Self> {
        Self::validate_token(&config)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .user_agent("pipedrive-contract/0.1")
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create a Pipedrive client from environment variables
    ///
    /// Reads `PIPEDRIVE_API_TOKEN` (required), `PIPEDRIVE_API_URL` and
    /// `PIPEDRIVE_TIMEOUT`.
    ///
    /// # Errors
    /// Returns `PipedriveError::Config` if the token is not set or a value
    /// cannot be parsed
    pub fn from_env() -> PipedriveResult<Self> {
        Self::new(PipedriveConfig::from_env()?)
    }

    /// Create a client with a custom HTTP client (for testing)
    ///
    /// # Errors
    /// Returns `PipedriveError::Config` if the API token is empty
    pub fn with_client(config: PipedriveConfig, http_client: Client) -> PipedriveResult<Self> {
        Self::validate_token(&config)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn validate_token(config: &PipedriveConfig) -> PipedriveResult<()> {
        if config.api_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "api_token".to_string(),
                "API token cannot be empty".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &PipedriveConfig {
        &self.config
    }

    /// Create a person
    ///
    /// Returns the `data` payload of the response. No local validation is
    /// done on the name; Pipedrive decides what it accepts.
    ///
    /// # Errors
    /// - `PipedriveError::Api` - If Pipedrive rejects the request (e.g. empty name)
    /// - `PipedriveError::Http` - If the HTTP request fails
    #[instrument(skip(self, person), fields(name = %person.name))]
    pub async fn create_person(&self, person: &NewPerson) -> PipedriveResult<Person> {
        let request = self.request(Method::POST, "/persons").json(person);
        let envelope = self.execute::<Person>(request, "POST /persons").await?;
        let created = Self::into_data(envelope, "POST /persons")?;

        debug!(person_id = created.id, "Created person");
        Ok(created)
    }

    /// Fetch a person by id
    ///
    /// # Errors
    /// - `PipedriveError::Api` - If the person does not exist (404)
    /// - `PipedriveError::Http` - If the HTTP request fails
    #[instrument(skip(self))]
    pub async fn get_person(&self, person_id: i64) -> PipedriveResult<Person> {
        let endpoint = format!("/persons/{}", person_id);
        let request = self.request(Method::GET, &endpoint);
        let envelope = self.execute::<Person>(request, &endpoint).await?;
        Self::into_data(envelope, &endpoint)
    }

    /// Delete a person by id
    ///
    /// Returns the whole response envelope rather than its `data` payload.
    #[instrument(skip(self))]
    pub async fn delete_person(
        &self,
        person_id: i64,
    ) -> PipedriveResult<ApiEnvelope<DeletedEntity>> {
        let endpoint = format!("/persons/{}", person_id);
        let request = self.request(Method::DELETE, &endpoint);
        let envelope = self.execute(request, &endpoint).await?;

        debug!(person_id, "Deleted person");
        Ok(envelope)
    }

    /// Create an organization
    #[instrument(skip(self))]
    pub async fn create_organization(&self, name: &str) -> PipedriveResult<Organization> {
        let request = self
            .request(Method::POST, "/organizations")
            .json(&NewOrganization { name });
        let envelope = self
            .execute::<Organization>(request, "POST /organizations")
            .await?;
        let created = Self::into_data(envelope, "POST /organizations")?;

        debug!(org_id = created.id, "Created organization");
        Ok(created)
    }

    /// Delete an organization by id
    ///
    /// Returns the whole response envelope rather than its `data` payload.
    #[instrument(skip(self))]
    pub async fn delete_organization(
        &self,
        org_id: i64,
    ) -> PipedriveResult<ApiEnvelope<DeletedEntity>> {
        let endpoint = format!("/organizations/{}", org_id);
        let request = self.request(Method::DELETE, &endpoint);
        let envelope = self.execute(request, &endpoint).await?;

        debug!(org_id, "Deleted organization");
        Ok(envelope)
    }

    /// Build a request with the API token attached
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, self.config.endpoint_url(path))
            .query(&[(TOKEN_PARAM, self.config.api_token.as_str())])
    }

    /// Send a request and decode the response envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> PipedriveResult<ApiEnvelope<T>> {
        // The URL carries the token, so it is stripped from transport errors
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PipedriveError::Timeout
            } else {
                PipedriveError::Http(e.without_url())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = Self::error_message(&body);
            warn!(%status, endpoint = %endpoint, message = %message, "Pipedrive rejected request");
            return Err(PipedriveError::Api { status, message });
        }

        let text = response
            .text()
            .await
            .map_err(|e| PipedriveError::Http(e.without_url()))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn into_data<T>(envelope: ApiEnvelope<T>, endpoint: &str) -> PipedriveResult<T> {
        envelope
            .data
            .ok_or_else(|| PipedriveError::MissingData(endpoint.to_string()))
    }

    /// Extract a readable message from an error body
    fn error_message(body: &str) -> String {
        if let Ok(ErrorResponse {
            error: Some(error),
            error_info,
        }) = serde_json::from_str::<ErrorResponse>(body)
        {
            return match error_info {
                Some(info) if !info.is_empty() => format!("{} ({})", error, info),
                _ => error,
            };
        }
        Self::truncate_error_body(body)
    }

    /// Truncate error body on a UTF-8 boundary
    fn truncate_error_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_SIZE {
            return body.to_string();
        }

        let truncate_at = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_ERROR_BODY_SIZE)
            .last()
            .unwrap_or(0);

        format!("{}... (truncated)", &body[..truncate_at])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "test-token";

    fn client_for(server: &MockServer) -> PipedriveClient {
        PipedriveClient::new(PipedriveConfig::with_base_url(server.uri(), TOKEN)).unwrap()
    }

    #[test]
    fn test_client_requires_api_token() {
        let result = PipedriveClient::new(PipedriveConfig::new(""));
        assert_matches!(result, Err(PipedriveError::Config(_)));
    }

    #[test]
    fn test_with_client_requires_api_token() {
        let result = PipedriveClient::with_client(PipedriveConfig::new("  "), Client::new());
        assert_matches!(result, Err(PipedriveError::Config(_)));
    }

    #[test]
    fn test_client_from_env_without_token() {
        temp_env::with_var_unset("PIPEDRIVE_API_TOKEN", || {
            let err = PipedriveClient::from_env().unwrap_err();
            assert!(err.is_config_error());
            assert!(!err.is_request_error());
        });
    }

    #[test]
    fn test_client_from_env_with_token() {
        temp_env::with_vars(
            [
                ("PIPEDRIVE_API_TOKEN", Some("env-token")),
                ("PIPEDRIVE_API_URL", None),
            ],
            || {
                let client = PipedriveClient::from_env().unwrap();
                assert_eq!(client.config().api_token, "env-token");
            },
        );
    }

    #[test]
    fn test_client_debug_redacts_api_token() {
        let client = PipedriveClient::new(PipedriveConfig::new("secret_token")).unwrap();
        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_with_client_uses_given_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organizations"))
            .and(query_param("api_token", TOKEN))
            .and(body_json(json!({ "name": "Acme" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "data": { "id": 2, "name": "Acme", "owner_id": 1 }
            })))
            .mount(&server)
            .await;

        let config = PipedriveConfig::with_base_url(server.uri(), TOKEN);
        let client = PipedriveClient::with_client(config, Client::new()).unwrap();
        let org = client.create_organization("Acme").await.unwrap();

        assert_eq!(org.id, 2);
        assert_eq!(org.name, "Acme");
    }

    #[test]
    fn test_error_message_from_pipedrive_body() {
        let body = r#"{"success":false,"error":"Name must be given.","error_info":"","data":null}"#;
        assert_eq!(PipedriveClient::error_message(body), "Name must be given.");

        let body = r#"{"success":false,"error":"Not found","error_info":"Check the id"}"#;
        assert_eq!(PipedriveClient::error_message(body), "Not found (Check the id)");
    }

    #[test]
    fn test_error_message_falls_back_to_truncated_body() {
        let body = "é".repeat(MAX_ERROR_BODY_SIZE);
        let message = PipedriveClient::error_message(&body);
        assert!(message.ends_with("... (truncated)"));
        assert!(message.len() < body.len());
    }

    #[test_log::test(tokio::test)]
    async fn test_create_person_sends_token_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/persons"))
            .and(query_param("api_token", TOKEN))
            .and(body_json(json!({ "name": "John Doe", "label_ids": [14] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "data": { "id": 11, "name": "John Doe", "org_id": null, "label_ids": [14] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let person = client
            .create_person(&NewPerson::new("John Doe").label_ids(vec![14]))
            .await
            .unwrap();

        assert_eq!(person.id, 11);
        assert_eq!(person.name, "John Doe");
        assert_eq!(person.label_ids, vec![14]);
        assert_eq!(person.organization_id(), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_rejected_request_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/persons"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "error": "Name must be given.",
                "data": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.create_person(&NewPerson::new("")).await.unwrap_err();

        assert!(err.is_request_error());
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_matches!(
            err,
            PipedriveError::Api { message, .. } if message == "Name must be given."
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/persons/3"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_person(3).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_matches!(
            err,
            PipedriveError::Api { message, .. } if message == "upstream unavailable"
        );
    }

    #[tokio::test]
    async fn test_get_person_without_data_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/persons/8"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": null })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_person(8).await.unwrap_err();
        assert_matches!(err, PipedriveError::MissingData(endpoint) if endpoint == "/persons/8");
    }

    #[tokio::test]
    async fn test_delete_returns_whole_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/organizations/5"))
            .and(query_param("api_token", TOKEN))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "data": { "id": 5 } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let envelope = client.delete_organization(5).await.unwrap();

        assert!(envelope.success);
        assert_eq!(envelope.data, Some(DeletedEntity { id: 5 }));
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let config = PipedriveConfig::with_base_url("http://127.0.0.1:1", "hidden-token");
        let client = PipedriveClient::new(config).unwrap();
        let err = client.get_person(1).await.unwrap_err();

        assert!(!err.is_request_error());
        assert!(!err.to_string().contains("hidden-token"));
    }
}
