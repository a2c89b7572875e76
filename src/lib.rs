//! # labnose-profile
//!
//! Profile sync client for the LabNose web application. Loads the signed-in
//! user's profile, pushes edits back to the backend, and relays signup data
//! collected during the OAuth redirect to the provisioning endpoint once.
//!
//! DESIGN
//! ======
//! The identity provider, notification surface, HTTP transport and the
//! "already provisioned" marker are all injected as trait objects, so the
//! [`controller::ProfileSyncController`] runs headless in tests and in the
//! `labnose-profile` CLI alike.

pub mod api;
pub mod config;
pub mod controller;
pub mod notify;
pub mod provision;
pub mod session;
pub mod view;

pub use api::{HttpProfileApi, ProfileApi, ProfileError};
pub use controller::{ProfileForm, ProfileSyncController};
pub use notify::{Notification, Notifier, Severity};
pub use provision::{NavigationState, ProvisionLedger, ProvisionOutcome};
pub use session::{PageState, Session, SessionUser, TokenProvider};
