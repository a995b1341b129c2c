//! Runtime configuration.
//!
//! Resolved once at process startup and passed into the builder, so request
//! handling never reads the process environment. [`AccessConfig::from_lookup`]
//! takes any key lookup, which keeps tests away from `std::env`.

use std::fmt;

use reqwest::Url;

/// Same-machine desktop service, as started by `scfs_api.py`.
pub const DEFAULT_LOCAL_API_BASE_URL: &str = "http://localhost:8080/api";

pub const DEFAULT_METADATA_TABLE: &str = "file_metadata";

/// Environment variable names.
pub mod vars {
    pub const LOCAL_API_BASE_URL: &str = "SCFS_API_BASE_URL";
    pub const SUPABASE_URL: &str = "SUPABASE_URL";
    pub const SUPABASE_API_KEY: &str = "SUPABASE_API_KEY";
    pub const SUPABASE_ACCESS_TOKEN: &str = "SUPABASE_ACCESS_TOKEN";
    pub const METADATA_TABLE: &str = "SCFS_METADATA_TABLE";
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a usable base URL ({value}): {message}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        message: String,
    },

    #[error("{missing} must be set when {present} is set")]
    Incomplete {
        present: &'static str,
        missing: &'static str,
    },
}

/// Connection settings for the hosted metadata store.
#[derive(Clone)]
pub struct MetadataStoreConfig {
    url: Url,
    api_key: String,
    access_token: Option<String>,
    table: String,
}

impl MetadataStoreConfig {
    pub fn new(url: Url, api_key: impl Into<String>) -> Self {
        Self {
            url,
            api_key: api_key.into(),
            access_token: None,
            table: DEFAULT_METADATA_TABLE.to_string(),
        }
    }

    /// Session token of the signed-in user; without one the API key is sent as
    /// the bearer and row-level security decides what is visible.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Debug for MetadataStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStoreConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("table", &self.table)
            .finish()
    }
}

/// Everything needed to assemble an access coordinator.
#[derive(Clone, Debug)]
pub struct AccessConfig {
    local_api_base_url: Url,
    metadata_store: Option<MetadataStoreConfig>,
}

impl AccessConfig {
    pub fn new(local_api_base_url: Url, metadata_store: Option<MetadataStoreConfig>) -> Self {
        Self {
            local_api_base_url,
            metadata_store,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary lookup. Empty values count as unset.
    ///
    /// A missing local API address falls back to
    /// [`DEFAULT_LOCAL_API_BASE_URL`]; a missing `SUPABASE_URL` leaves the
    /// metadata store unconfigured.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let local_api_base_url = match get(vars::LOCAL_API_BASE_URL) {
            Some(raw) => parse_base_url(vars::LOCAL_API_BASE_URL, &raw)?,
            None => parse_base_url(vars::LOCAL_API_BASE_URL, DEFAULT_LOCAL_API_BASE_URL)?,
        };

        let metadata_store = match (get(vars::SUPABASE_URL), get(vars::SUPABASE_API_KEY)) {
            (Some(raw), Some(api_key)) => {
                let mut store =
                    MetadataStoreConfig::new(parse_base_url(vars::SUPABASE_URL, &raw)?, api_key);
                if let Some(token) = get(vars::SUPABASE_ACCESS_TOKEN) {
                    store = store.with_access_token(token);
                }
                if let Some(table) = get(vars::METADATA_TABLE) {
                    store = store.with_table(table);
                }
                Some(store)
            }
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: vars::SUPABASE_URL,
                    missing: vars::SUPABASE_API_KEY,
                });
            }
            (None, _) => None,
        };

        Ok(Self {
            local_api_base_url,
            metadata_store,
        })
    }

    pub fn local_api_base_url(&self) -> &Url {
        &self.local_api_base_url
    }

    pub fn metadata_store(&self) -> Option<&MetadataStoreConfig> {
        self.metadata_store.as_ref()
    }
}

fn parse_base_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidUrl {
        var,
        value: raw.to_string(),
        message,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) URL".to_string()));
    }
    Ok(url)
}
