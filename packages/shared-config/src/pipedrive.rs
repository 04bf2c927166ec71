//! Pipedrive API configuration types

use std::fmt;

use url::Url;

use crate::{get_env_or_default, get_required_env, parse_env, ConfigError, ConfigResult};

/// Public Pipedrive REST API root
pub const DEFAULT_API_URL: &str = "https://api.pipedrive.com/v1";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pipedrive API configuration
#[derive(Clone)]
pub struct PipedriveConfig {
    /// API root every endpoint path is appended to
    pub base_url: String,

    /// Token sent as the `api_token` query parameter
    pub api_token: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl fmt::Debug for PipedriveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipedriveConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PipedriveConfig {
    /// Load Pipedrive configuration from environment variables
    ///
    /// `PIPEDRIVE_API_TOKEN` is required. `PIPEDRIVE_API_URL` and
    /// `PIPEDRIVE_TIMEOUT` fall back to the public API and 30 seconds.
    pub fn from_env() -> ConfigResult<Self> {
        let api_token = get_required_env("PIPEDRIVE_API_TOKEN")?;
        let base_url = get_env_or_default("PIPEDRIVE_API_URL", DEFAULT_API_URL);
        validate_base_url(&base_url)?;

        Ok(Self {
            base_url,
            api_token,
            timeout_secs: parse_env("PIPEDRIVE_TIMEOUT", DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Create a configuration for the public API with the given token
    pub fn new(api_token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_URL, api_token)
    }

    /// Create a configuration with a custom API root (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Get the full URL for an endpoint path such as `/persons/42`
    pub fn endpoint_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}

fn validate_base_url(raw: &str) -> ConfigResult<()> {
    let parsed = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl("PIPEDRIVE_API_URL".to_string(), e.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            "PIPEDRIVE_API_URL".to_string(),
            format!("{} cannot be used as an API root", raw),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_new_config() {
        let config = PipedriveConfig::new("token");
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.api_token, "token");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_endpoint_url() {
        let config = PipedriveConfig::new("token");
        assert_eq!(
            config.endpoint_url("/persons"),
            "https://api.pipedrive.com/v1/persons"
        );
        assert_eq!(
            config.endpoint_url("organizations/7"),
            "https://api.pipedrive.com/v1/organizations/7"
        );
    }

    #[test]
    fn test_endpoint_url_with_trailing_slash() {
        let config = PipedriveConfig::with_base_url("http://127.0.0.1:9000/", "token");
        assert_eq!(config.endpoint_url("/persons/1"), "http://127.0.0.1:9000/persons/1");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = PipedriveConfig::new("very-secret");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("very-secret"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_env_requires_token() {
        temp_env::with_var_unset("PIPEDRIVE_API_TOKEN", || {
            assert_matches!(
                PipedriveConfig::from_env(),
                Err(ConfigError::MissingEnvVar(name)) if name == "PIPEDRIVE_API_TOKEN"
            );
        });
    }

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(
            [
                ("PIPEDRIVE_API_TOKEN", Some("abc123")),
                ("PIPEDRIVE_API_URL", None),
                ("PIPEDRIVE_TIMEOUT", None),
            ],
            || {
                let config = PipedriveConfig::from_env().unwrap();
                assert_eq!(config.api_token, "abc123");
                assert_eq!(config.base_url, DEFAULT_API_URL);
                assert_eq!(config.timeout_secs, 30);
            },
        );
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("PIPEDRIVE_API_TOKEN", Some("abc123")),
                ("PIPEDRIVE_API_URL", Some("https://sandbox.example.com/v1")),
                ("PIPEDRIVE_TIMEOUT", Some("5")),
            ],
            || {
                let config = PipedriveConfig::from_env().unwrap();
                assert_eq!(config.base_url, "https://sandbox.example.com/v1");
                assert_eq!(config.timeout_secs, 5);
            },
        );
    }

    #[test]
    fn test_from_env_rejects_bad_url() {
        temp_env::with_vars(
            [
                ("PIPEDRIVE_API_TOKEN", Some("abc123")),
                ("PIPEDRIVE_API_URL", Some("not a url")),
            ],
            || {
                assert_matches!(PipedriveConfig::from_env(), Err(ConfigError::InvalidUrl(..)));
            },
        );
    }
}
