//! HTTP client for the session service's internal endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::SessionApiConfig;
use crate::domain::foundation::SessionId;
use crate::ports::{SessionApiError, SessionOfRecord};

use super::internal::INTERNAL_API_KEY_HEADER;

/// Calls `PATCH {base_url}/api/sessions/{id}/daily-goal-achieved`.
pub struct HttpSessionApiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl HttpSessionApiClient {
    pub fn new(config: &SessionApiConfig) -> Result<Self, SessionApiError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SessionApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn flag_url(&self, session_id: &SessionId) -> String {
        format!(
            "{}/api/sessions/{}/daily-goal-achieved",
            self.base_url, session_id
        )
    }
}

#[async_trait]
impl SessionOfRecord for HttpSessionApiClient {
    async fn mark_daily_goal_achieved(
        &self,
        session_id: &SessionId,
    ) -> Result<(), SessionApiError> {
        let response = self
            .client
            .patch(self.flag_url(session_id))
            .header(INTERNAL_API_KEY_HEADER, self.api_key.expose_secret().as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SessionApiError::Transport(format!("Request timed out: {}", e))
                } else {
                    SessionApiError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        debug!(session_id = %session_id, status = status.as_u16(), "Session API responded");

        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SessionApiError::NotFound(*session_id));
        }
        Err(SessionApiError::Rejected(status.as_u16()))
    }
}
