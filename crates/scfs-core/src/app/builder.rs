//! CoordinatorBuilder - コーディネータの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 両方のバックエンドが揃っていなければ build() で BuildError を返す
//! - 設定からの構築（from_config）では URL の組み立て失敗もここで検出する

use std::sync::Arc;

use reqwest::Url;

use super::coordinator::AccessCoordinator;
use crate::config::AccessConfig;
use crate::credentials::CredentialStore;
use crate::domain::{BackendError, BackendKind};
use crate::impls::{HttpLocalApi, PostgrestMetadataStore};
use crate::ports::{LocalFileApi, MetadataStore};

/// CoordinatorBuilder は AccessCoordinator を構築
///
/// # 使用例
/// ```ignore
/// let coordinator = CoordinatorBuilder::new(CredentialStore::new())
///     .http_local_api(base_url)
///     .metadata_store(InMemoryMetadataStore::new())
///     .build()?;
/// ```
pub struct CoordinatorBuilder {
    credentials: CredentialStore,
    local: Option<Arc<dyn LocalFileApi>>,
    remote: Option<Arc<dyn MetadataStore>>,
}

/// BuildError はコーディネータ構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing backends: {0:?}. Both the local API and the metadata store must be configured.")]
    MissingBackends(Vec<BackendKind>),

    #[error("could not set up {0}")]
    Backend(#[from] BackendError),
}

impl CoordinatorBuilder {
    /// `credentials` is the slot the coordinator reads for eligibility and
    /// writes on sign-in.
    ///
    /// A local API passed to [`local_api`](Self::local_api) must read the
    /// same slot (a clone of this handle), otherwise the coordinator routes to
    /// it while it sends no credentials. [`http_local_api`](Self::http_local_api)
    /// wires that up itself.
    pub fn new(credentials: CredentialStore) -> Self {
        Self {
            credentials,
            local: None,
            remote: None,
        }
    }

    /// Wires the HTTP clients described by `config`. The metadata store is
    /// left unset when `config` has none, so `build()` reports it.
    pub fn from_config(config: &AccessConfig, credentials: CredentialStore) -> Result<Self, BuildError> {
        let mut builder = Self::new(credentials).http_local_api(config.local_api_base_url().clone());
        if let Some(store) = config.metadata_store() {
            builder = builder.metadata_store(PostgrestMetadataStore::new(store)?);
        }
        Ok(builder)
    }

    /// HTTP client for the local API, sharing this builder's credential slot.
    pub fn http_local_api(self, base_url: Url) -> Self {
        let local = HttpLocalApi::new(base_url, self.credentials.clone());
        self.local_api(local)
    }

    pub fn local_api(self, local: impl LocalFileApi + 'static) -> Self {
        self.shared_local_api(Arc::new(local))
    }

    pub fn shared_local_api(mut self, local: Arc<dyn LocalFileApi>) -> Self {
        self.local = Some(local);
        self
    }

    pub fn metadata_store(self, remote: impl MetadataStore + 'static) -> Self {
        self.shared_metadata_store(Arc::new(remote))
    }

    pub fn shared_metadata_store(mut self, remote: Arc<dyn MetadataStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn build(self) -> Result<AccessCoordinator, BuildError> {
        match (self.local, self.remote) {
            (Some(local), Some(remote)) => Ok(AccessCoordinator::new(self.credentials, local, remote)),
            (local, remote) => {
                let mut missing = Vec::new();
                if local.is_none() {
                    missing.push(BackendKind::LocalApi);
                }
                if remote.is_none() {
                    missing.push(BackendKind::MetadataStore);
                }
                Err(BuildError::MissingBackends(missing))
            }
        }
    }
}
