//! CredentialStore - セッション中の認証情報スロット
//!
//! プロセス全体のグローバルではなく、所有者が明示的に生成してコーディネータや
//! クライアントへ渡すハンドルです。クローンは同じスロットを共有します。

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::domain::Credential;

#[derive(Default)]
struct Slot {
    identity: String,
    secret: String,
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Shared, in-memory credential slot for one session.
///
/// Writes are last-write-wins. Readers take a [`snapshot`](Self::snapshot) at
/// request construction time, so a request built before
/// [`clear_credentials`](Self::clear_credentials) keeps the old pair.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    slot: Arc<RwLock<Slot>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the pair, replacing any previous one. No validation here.
    pub fn set_credentials(&self, identity: impl Into<String>, secret: impl Into<String>) {
        let mut slot = self.write();
        slot.identity = identity.into();
        slot.secret = secret.into();
        info!(identity = %slot.identity, "credentials configured");
    }

    /// Remove both fields at once.
    pub fn clear_credentials(&self) {
        let mut slot = self.write();
        slot.identity.clear();
        slot.secret.clear();
        debug!("credentials cleared");
    }

    /// True iff both fields are non-empty.
    pub fn has_credentials(&self) -> bool {
        let slot = self.read();
        !slot.identity.is_empty() && !slot.secret.is_empty()
    }

    /// The complete credential, if any. Partial pairs are reported as absent.
    pub fn snapshot(&self) -> Option<Credential> {
        let slot = self.read();
        Credential::new(slot.identity.as_str(), slot.secret.as_str())
    }

    // 書き込み中に panic しても Slot は常に有効な値なので、poison は無視してよい
    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
