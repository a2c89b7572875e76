//! Profile API types: wire shapes and the error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::TokenError;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by profile API operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// No bearer token could be obtained for the session.
    #[error("token acquisition failed: {0}")]
    TokenAcquisition(#[from] TokenError),

    /// The HTTP request could not be completed.
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("non-success status {status}")]
    NonSuccessStatus { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ProfileError {
    /// Stable code attached to log events.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TokenAcquisition(_) => "E_TOKEN_ACQUISITION",
            Self::Network(_) => "E_NETWORK",
            Self::NonSuccessStatus { .. } => "E_NON_SUCCESS_STATUS",
            Self::MalformedResponse(_) => "E_MALFORMED_RESPONSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Signup-time fields gathered during the OAuth redirect. Opaque to this crate.
pub type SignupPayload = serde_json::Map<String, Value>;

/// Body of `GET /api/profile`. Fields other than `deviceId` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(default)]
    pub device_id: Option<String>,
}

impl ProfileRecord {
    /// Device id with absent/null collapsed to the empty string.
    #[must_use]
    pub fn device_id_or_default(&self) -> String {
        self.device_id.clone().unwrap_or_default()
    }
}

/// Body of `POST /api/profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: String,
    pub name: String,
    pub device_id: String,
}

/// Parse a `GET /api/profile` body. Anything but a JSON object is malformed.
///
/// # Errors
///
/// Returns [`ProfileError::MalformedResponse`] for invalid JSON, a non-object
/// body, or a `deviceId` that is not a string.
pub fn parse_profile_record(text: &str) -> Result<ProfileRecord, ProfileError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ProfileError::MalformedResponse(e.to_string()))?;
    if !value.is_object() {
        return Err(ProfileError::MalformedResponse("expected a JSON object".into()));
    }
    serde_json::from_value(value).map_err(|e| ProfileError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
