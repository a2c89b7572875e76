//! Profile client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_ACCESS_TOKEN_ENV: &str = "PROFILE_ACCESS_TOKEN";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeouts: HttpTimeouts,
    pub ledger_path: Option<PathBuf>,
}

impl ProfileConfig {
    /// Build typed profile config from environment variables.
    ///
    /// Optional:
    /// - `PROFILE_API_BASE_URL`: default `http://127.0.0.1:3000`
    /// - `PROFILE_ACCESS_TOKEN_ENV`: names the env var holding the bearer
    ///   token (default `PROFILE_ACCESS_TOKEN`)
    /// - `PROFILE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PROFILE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PROFILE_LEDGER_PATH`: provisioning ledger file; in-memory when absent
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the base URL is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            parse_base_url(&std::env::var("PROFILE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.into()))?;

        let token_var = std::env::var("PROFILE_ACCESS_TOKEN_ENV").unwrap_or_else(|_| DEFAULT_ACCESS_TOKEN_ENV.into());
        let access_token = std::env::var(&token_var).ok().filter(|t| !t.trim().is_empty());

        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("PROFILE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("PROFILE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let ledger_path = std::env::var_os("PROFILE_LEDGER_PATH").map(PathBuf::from);

        Ok(Self { base_url, access_token, timeouts, ledger_path })
    }

    /// Replace the base URL, applying the same validation as `from_env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `raw` is not http(s).
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_base_url(raw)?;
        Ok(self)
    }
}

/// Trim trailing slashes and require an http(s) scheme.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for any other scheme or an empty value.
pub fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Parse(format!("base URL must be http(s): '{raw}'")));
    }
    Ok(trimmed.to_string())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
