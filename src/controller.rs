//! Profile sync controller: reconciles local form state with the session
//! and the backend profile store.
//!
//! DESIGN
//! ======
//! The controller owns a single `ProfileForm` behind a tokio `RwLock`. The
//! lock is only held for copies in and out, never across a network await, so
//! `load_profile`, `save_profile` and `handle_post_signup` can run
//! concurrently on clones of the same controller.
//!
//! ERROR HANDLING
//! ==============
//! Read failures (`load_profile`) are logged and absorbed; the form keeps its
//! previous values. Write failures (`save_profile`, `handle_post_signup`) are
//! logged and surfaced through the notifier. Nothing is retried.

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::api::{ProfileApi, ProfileError, ProfileUpdate};
use crate::notify::{Notification, Notifier};
use crate::provision::{NavigationState, ProvisionLedger, ProvisionOutcome, provisioning_request};
use crate::session::{PageState, Session, TokenProvider};

// =============================================================================
// FORM STATE
// =============================================================================

/// Editable profile fields shown on the page.
///
/// `email` mirrors the session and is only written by
/// [`ProfileSyncController::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub device_id: String,
}

impl ProfileForm {
    #[must_use]
    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate { email: self.email.clone(), name: self.name.clone(), device_id: self.device_id.clone() }
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Clones share the same form state.
#[derive(Clone)]
pub struct ProfileSyncController {
    api: Arc<dyn ProfileApi>,
    tokens: Arc<dyn TokenProvider>,
    notifier: Arc<dyn Notifier>,
    ledger: Arc<dyn ProvisionLedger>,
    form: Arc<RwLock<ProfileForm>>,
}

impl ProfileSyncController {
    #[must_use]
    pub fn new(
        api: Arc<dyn ProfileApi>,
        tokens: Arc<dyn TokenProvider>,
        notifier: Arc<dyn Notifier>,
        ledger: Arc<dyn ProvisionLedger>,
    ) -> Self {
        Self { api, tokens, notifier, ledger, form: Arc::new(RwLock::new(ProfileForm::default())) }
    }

    /// Snapshot of the current form.
    pub async fn form(&self) -> ProfileForm {
        self.form.read().await.clone()
    }

    pub async fn set_name(&self, name: impl Into<String>) {
        self.form.write().await.name = name.into();
    }

    pub async fn set_device_id(&self, device_id: impl Into<String>) {
        self.form.write().await.device_id = device_id.into();
    }

    /// Seed the form from the session user and load the stored profile.
    ///
    /// Does nothing unless the session is authenticated, finished loading,
    /// and carries a user. Returns whether it acted.
    pub async fn initialize(&self, session: &Session) -> bool {
        let PageState::Authenticated(user) = PageState::from(session) else {
            debug!("profile initialize skipped: session not authenticated");
            return false;
        };
        {
            let mut form = self.form.write().await;
            form.name = user.name;
            form.email = user.email;
        }
        self.load_profile().await;
        true
    }

    /// Fetch the persisted device id into the form, absorbing failures.
    ///
    /// Failures leave the form untouched, are logged, and never notify the
    /// user; the form stays usable with its current values.
    pub async fn load_profile(&self) {
        if let Err(e) = self.try_load_profile().await {
            warn!(error = %e, code = e.error_code(), "profile load failed");
        }
    }

    /// Fetch the persisted device id into the form.
    ///
    /// # Errors
    ///
    /// Returns the [`ProfileError`] that prevented the load; the form is
    /// left unchanged.
    pub async fn try_load_profile(&self) -> Result<(), ProfileError> {
        let device_id = self.fetch_device_id().await?;
        self.form.write().await.device_id = device_id;
        info!("profile loaded");
        Ok(())
    }

    async fn fetch_device_id(&self) -> Result<String, ProfileError> {
        let token = self.tokens.access_token().await?;
        let record = self.api.fetch_profile(&token).await?;
        Ok(record.device_id_or_default())
    }

    /// Push the current form to the backend.
    ///
    /// # Errors
    ///
    /// Returns the [`ProfileError`] after emitting "Update Failed".
    pub async fn save_profile(&self) -> Result<(), ProfileError> {
        let update = self.form.read().await.to_update();
        self.save_profile_with(&update).await
    }

    /// Push explicit field values to the backend and notify the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`ProfileError`] after emitting "Update Failed".
    pub async fn save_profile_with(&self, update: &ProfileUpdate) -> Result<(), ProfileError> {
        match self.push_update(update).await {
            Ok(()) => {
                info!("profile updated");
                self.notifier.notify(Notification::profile_updated());
                Ok(())
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), "profile update failed");
                self.notifier.notify(Notification::update_failed());
                Err(e)
            }
        }
    }

    async fn push_update(&self, update: &ProfileUpdate) -> Result<(), ProfileError> {
        let token = self.tokens.access_token().await?;
        self.api.update_profile(&token, update).await
    }

    /// Forward signup data from the OAuth redirect to the provisioning
    /// endpoint, at most once per user.
    pub async fn handle_post_signup(&self, session: &Session, nav: &NavigationState) -> ProvisionOutcome {
        let (payload, key) = match provisioning_request(session, nav) {
            Ok(request) => request,
            Err(reason) => {
                debug!(?reason, "post-signup provisioning skipped");
                return ProvisionOutcome::Skipped(reason);
            }
        };

        match self.ledger.try_claim(&key) {
            Ok(true) => {}
            Ok(false) => {
                info!("post-signup provisioning already done");
                return ProvisionOutcome::AlreadyProvisioned;
            }
            Err(e) => {
                error!(error = %e, "provision ledger unavailable");
                self.notifier.notify(Notification::account_error());
                return ProvisionOutcome::Failed;
            }
        }

        match self.api.store_user_data(payload).await {
            Ok(()) => {
                if let Err(e) = self.ledger.mark_provisioned(&key) {
                    error!(error = %e, "failed to record provisioning");
                }
                info!("account provisioned");
                self.notifier.notify(Notification::account_created());
                ProvisionOutcome::Created
            }
            Err(e) => {
                if let Err(le) = self.ledger.release(&key) {
                    warn!(error = %le, "failed to release provisioning claim");
                }
                error!(error = %e, code = e.error_code(), "storing user data failed");
                self.notifier.notify(Notification::account_error());
                ProvisionOutcome::Failed
            }
        }
    }
}
