//! Configuration for calls from the reward worker to the session service.

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionApiConfig {
    /// Base URL of the session service, e.g. `http://session-service:8080`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Shared key sent as `X-Internal-Api-Key`
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SessionApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidSessionApiUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("session_api.timeout_secs"));
        }
        Ok(())
    }
}

impl Default for SessionApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: empty_secret(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Configuration of the session service's internal endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct InternalApiConfig {
    /// Key expected in `X-Internal-Api-Key`; empty rejects every call
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,
}

impl InternalApiConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Default for InternalApiConfig {
    fn default() -> Self {
        Self {
            api_key: empty_secret(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_session_api_defaults() {
        let config = SessionApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.api_key.expose_secret().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_non_http_url() {
        let config = SessionApiConfig {
            base_url: "session-service:8080".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidSessionApiUrl));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = InternalApiConfig {
            api_key: SecretString::new("super-secret".to_string()),
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
