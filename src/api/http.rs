//! reqwest-backed [`ProfileApi`].

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::types::{ProfileError, ProfileRecord, ProfileUpdate, SignupPayload, parse_profile_record};
use super::{PROFILE_PATH, ProfileApi, STORE_USER_DATA_PATH};
use crate::config::{HttpTimeouts, ProfileConfig};

#[derive(Debug, Clone)]
pub struct HttpProfileApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpProfileApi {
    /// Build a client rooted at `base_url` (trailing `/` trimmed).
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::HttpClientBuild`] if reqwest rejects the config.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ProfileError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ProfileError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Build a client from parsed config.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::HttpClientBuild`] if reqwest rejects the config.
    pub fn from_config(config: &ProfileConfig) -> Result<Self, ProfileError> {
        Self::new(&config.base_url, config.timeouts)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a JSON POST and map any non-2xx status to an error.
    async fn post_json(&self, path: &str, token: Option<&str>, body: &impl Serialize) -> Result<(), ProfileError> {
        let mut request = self.http.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        debug!(path, "profile api POST");
        let response = request
            .send()
            .await
            .map_err(|e| ProfileError::Network(e.to_string()))?;
        read_success_body(response).await?;
        Ok(())
    }
}

/// Return the body text of a 2xx response, or `NonSuccessStatus`.
///
/// The status decides the outcome; an unreadable error body is reported as
/// empty rather than as a network failure.
async fn read_success_body(response: reqwest::Response) -> Result<String, ProfileError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProfileError::NonSuccessStatus { status: status.as_u16(), body });
    }
    response
        .text()
        .await
        .map_err(|e| ProfileError::Network(e.to_string()))
}

#[async_trait::async_trait]
impl ProfileApi for HttpProfileApi {
    async fn fetch_profile(&self, token: &str) -> Result<ProfileRecord, ProfileError> {
        debug!(path = PROFILE_PATH, "profile api GET");
        let response = self
            .http
            .get(self.url(PROFILE_PATH))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProfileError::Network(e.to_string()))?;
        let text = read_success_body(response).await?;
        parse_profile_record(&text)
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<(), ProfileError> {
        self.post_json(PROFILE_PATH, Some(token), update).await
    }

    async fn store_user_data(&self, payload: &SignupPayload) -> Result<(), ProfileError> {
        self.post_json(STORE_USER_DATA_PATH, None, payload).await
    }
}
