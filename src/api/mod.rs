//! Profile API: transport seam between the controller and the backend.
//!
//! DESIGN
//! ======
//! `ProfileApi` is the trait the controller talks to; `HttpProfileApi` is the
//! reqwest-backed implementation. Tests substitute an in-memory mock.

pub mod http;
pub mod types;

pub use http::HttpProfileApi;
pub use types::{ProfileError, ProfileRecord, ProfileUpdate, SignupPayload};

/// Path of the profile resource (GET and POST).
pub const PROFILE_PATH: &str = "/api/profile";
/// Path of the post-signup provisioning endpoint.
pub const STORE_USER_DATA_PATH: &str = "/api/auth/store-user-data";

/// Backend operations used by the profile page.
#[async_trait::async_trait]
pub trait ProfileApi: Send + Sync {
    /// `GET /api/profile` with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] on transport failure, non-2xx status, or a
    /// malformed body.
    async fn fetch_profile(&self, token: &str) -> Result<ProfileRecord, ProfileError>;

    /// `POST /api/profile` with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] on transport failure or non-2xx status.
    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<(), ProfileError>;

    /// `POST /api/auth/store-user-data`, unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] on transport failure or non-2xx status.
    async fn store_user_data(&self, payload: &SignupPayload) -> Result<(), ProfileError>;
}
