//! Credential - セッション中だけ保持する認証情報

use std::fmt;

/// The `{identity, secret}` pair the local API authenticates each request with.
///
/// Only complete pairs exist as values of this type: the store treats a
/// partial or empty pair as absent and never hands one out.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    identity: String,
    secret: String,
}

impl Credential {
    /// Returns `None` unless both fields are non-empty.
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Option<Self> {
        let identity = identity.into();
        let secret = secret.into();
        if identity.is_empty() || secret.is_empty() {
            return None;
        }
        Some(Self { identity, secret })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

// secret は絶対にログに出さない
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}
