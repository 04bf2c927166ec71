//! Shared configuration types for the Pipedrive contract harness
//!
//! This crate provides the configuration used by both the API client and
//! the test fixtures, so every entry point reads the environment the same way.

mod error;
mod pipedrive;

pub use error::{ConfigError, ConfigResult};
pub use pipedrive::{PipedriveConfig, DEFAULT_API_URL};

use std::env;

/// Environment variable selecting where contract tests send their requests
pub const CONTRACT_TARGET_VAR: &str = "PIPEDRIVE_CONTRACT_TARGET";

/// Where a contract test session sends its requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractTarget {
    /// In-process mock server
    #[default]
    Mock,
    /// The real Pipedrive account configured through the environment
    Live,
}

impl std::str::FromStr for ContractTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "live" | "remote" => Self::Live,
            _ => Self::Mock,
        })
    }
}

impl ContractTarget {
    /// Read the target from `PIPEDRIVE_CONTRACT_TARGET`, defaulting to the mock
    pub fn from_env() -> Self {
        env::var(CONTRACT_TARGET_VAR)
            .map(|v| v.parse().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Check if requests go to the real service
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl std::fmt::Display for ContractTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Load variables from a `.env` file if one exists
///
/// Missing files are not an error; values already in the process
/// environment take precedence.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Helper function to get a required environment variable
///
/// Empty and whitespace-only values count as missing.
pub fn get_required_env(name: &str) -> ConfigResult<String> {
    match env::var(name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

/// Helper function to get an optional environment variable with a default
pub fn get_env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Helper function to parse an environment variable into a specific type
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}
