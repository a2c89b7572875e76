//! Post-signup provisioning: navigation state and the "provisioned" ledger.
//!
//! DESIGN
//! ======
//! Signup data rides along the OAuth redirect in navigation state. Relying on
//! that state being consumed exactly once breaks under reload and
//! back-navigation, so each user key is claimed in a [`ProvisionLedger`]
//! before the provisioning POST and marked provisioned only on success.
//!
//! Claims are held in memory only. A process that dies mid-request leaves the
//! key unclaimed on disk, so the next run may retry.

#[cfg(test)]
#[path = "provision_test.rs"]
mod tests;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::api::SignupPayload;
use crate::session::Session;

/// Canonical path of the profile page; the only accepted `returnTo`.
pub const PROFILE_PAGE_PATH: &str = "/authentication/profile";

// =============================================================================
// NAVIGATION STATE
// =============================================================================

/// State attached to the redirect that lands on the profile page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    #[serde(default)]
    pub return_to: Option<String>,
    #[serde(default)]
    pub signup_data: Option<SignupPayload>,
}

impl NavigationState {
    #[must_use]
    pub fn new(return_to: impl Into<String>, signup_data: SignupPayload) -> Self {
        Self { return_to: Some(return_to.into()), signup_data: Some(signup_data) }
    }
}

/// Why a post-signup call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Session still loading or not authenticated.
    SessionNotReady,
    /// `returnTo` absent or not the profile page.
    ReturnToMismatch,
    /// No signup payload in the navigation state.
    NoSignupData,
}

/// Result of a post-signup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Skipped(SkipReason),
    AlreadyProvisioned,
    Created,
    Failed,
}

/// Check the trigger conditions and return the payload plus ledger key.
///
/// # Errors
///
/// Returns the [`SkipReason`] for the first unmet condition.
pub fn provisioning_request<'a>(
    session: &Session,
    nav: &'a NavigationState,
) -> Result<(&'a SignupPayload, String), SkipReason> {
    if !session.is_ready() {
        return Err(SkipReason::SessionNotReady);
    }
    if nav.return_to.as_deref() != Some(PROFILE_PAGE_PATH) {
        return Err(SkipReason::ReturnToMismatch);
    }
    let payload = nav.signup_data.as_ref().ok_or(SkipReason::NoSignupData)?;
    let key = session
        .user
        .as_ref()
        .map(|u| ledger_key(&u.email))
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| payload_key(payload));
    Ok((payload, key))
}

/// Normalize an email into a ledger key.
#[must_use]
pub fn ledger_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Ledger key for a session without a usable email: the signup payload as
/// JSON with top-level fields sorted, so equal payloads produce equal keys.
#[must_use]
pub fn payload_key(payload: &SignupPayload) -> String {
    let sorted: BTreeMap<&String, &serde_json::Value> = payload.iter().collect();
    format!("signup:{}", serde_json::json!(sorted))
}

// =============================================================================
// LEDGER
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger file corrupt: {0}")]
    Corrupt(String),
    #[error("ledger lock poisoned")]
    Poisoned,
}

/// Durable record of which users have been provisioned.
pub trait ProvisionLedger: Send + Sync {
    /// Claim `key` for an in-flight provisioning call.
    /// Returns `false` if it is already claimed or provisioned.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the ledger cannot be read.
    fn try_claim(&self, key: &str) -> Result<bool, LedgerError>;

    /// Record `key` as provisioned and drop its claim.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the record cannot be persisted.
    fn mark_provisioned(&self, key: &str) -> Result<(), LedgerError>;

    /// Drop an in-flight claim without recording success.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the ledger cannot be updated.
    fn release(&self, key: &str) -> Result<(), LedgerError>;

    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the ledger cannot be read.
    fn is_provisioned(&self, key: &str) -> Result<bool, LedgerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimState {
    InFlight,
    Provisioned,
}

/// Process-local ledger.
#[derive(Debug, Default)]
pub struct MemoryProvisionLedger {
    entries: Mutex<HashMap<String, ClaimState>>,
}

impl MemoryProvisionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, ClaimState>>, LedgerError> {
        self.entries.lock().map_err(|_| LedgerError::Poisoned)
    }
}

impl ProvisionLedger for MemoryProvisionLedger {
    fn try_claim(&self, key: &str) -> Result<bool, LedgerError> {
        let mut entries = self.entries()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), ClaimState::InFlight);
        Ok(true)
    }

    fn mark_provisioned(&self, key: &str) -> Result<(), LedgerError> {
        self.entries()?.insert(key.to_string(), ClaimState::Provisioned);
        Ok(())
    }

    fn release(&self, key: &str) -> Result<(), LedgerError> {
        let mut entries = self.entries()?;
        if entries.get(key) == Some(&ClaimState::InFlight) {
            entries.remove(key);
        }
        Ok(())
    }

    fn is_provisioned(&self, key: &str) -> Result<bool, LedgerError> {
        Ok(self.entries()?.get(key) == Some(&ClaimState::Provisioned))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    provisioned: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct FileLedgerState {
    provisioned: BTreeSet<String>,
    in_flight: HashSet<String>,
}

/// Ledger persisted as a small JSON file, rewritten atomically on success.
#[derive(Debug)]
pub struct FileProvisionLedger {
    path: PathBuf,
    state: Mutex<FileLedgerState>,
}

impl FileProvisionLedger {
    /// Open the ledger at `path`. A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the file exists but cannot be read, or
    /// [`LedgerError::Corrupt`] if it is not valid ledger JSON.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let provisioned = match std::fs::read_to_string(&path) {
            Ok(text) => {
                serde_json::from_str::<LedgerFile>(&text)
                    .map_err(|e| LedgerError::Corrupt(e.to_string()))?
                    .provisioned
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, state: Mutex::new(FileLedgerState { provisioned, in_flight: HashSet::new() }) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> Result<MutexGuard<'_, FileLedgerState>, LedgerError> {
        self.state.lock().map_err(|_| LedgerError::Poisoned)
    }

    fn persist(&self, provisioned: &BTreeSet<String>) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(&LedgerFile { provisioned: provisioned.clone() })
            .map_err(|e| LedgerError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProvisionLedger for FileProvisionLedger {
    fn try_claim(&self, key: &str) -> Result<bool, LedgerError> {
        let mut state = self.state()?;
        if state.provisioned.contains(key) || state.in_flight.contains(key) {
            return Ok(false);
        }
        state.in_flight.insert(key.to_string());
        Ok(true)
    }

    fn mark_provisioned(&self, key: &str) -> Result<(), LedgerError> {
        let mut state = self.state()?;
        state.in_flight.remove(key);
        state.provisioned.insert(key.to_string());
        self.persist(&state.provisioned)
    }

    fn release(&self, key: &str) -> Result<(), LedgerError> {
        self.state()?.in_flight.remove(key);
        Ok(())
    }

    fn is_provisioned(&self, key: &str) -> Result<bool, LedgerError> {
        Ok(self.state()?.provisioned.contains(key))
    }
}
