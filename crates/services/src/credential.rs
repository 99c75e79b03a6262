use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Seconds before the real expiry at which a token is treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    /// Unix timestamp after which the access token is no longer valid.
    pub expires_at: Option<i64>,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now().timestamp() >= exp.saturating_sub(EXPIRY_SKEW_SECS))
    }
}

/// The single credential slot shared by every request handler.
///
/// Cloning yields another handle to the same slot, so a credential stored
/// by the OAuth callback is seen by the storage client on its next call.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Credential> {
        self.inner.read().clone()
    }

    pub fn is_authorized(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Stores `credential`, returning whatever it replaced.
    pub fn set(&self, credential: Credential) -> Option<Credential> {
        self.inner.write().replace(credential)
    }

    /// Swaps in a refreshed credential only if the slot still holds `stale`.
    ///
    /// Returns the credential in the slot afterwards. A refresh token
    /// missing from `fresh` is carried over from `stale`.
    pub fn replace_if_current(&self, stale: &Credential, mut fresh: Credential) -> Credential {
        let mut slot = self.inner.write();
        match slot.as_ref() {
            Some(current) if current == stale => {
                if fresh.refresh_token.is_none() {
                    fresh.refresh_token = stale.refresh_token.clone();
                }
                *slot = Some(fresh.clone());
                fresh
            }
            Some(current) => current.clone(),
            // Slot emptied concurrently; the refreshed token is still good for this call.
            None => fresh,
        }
    }
}
