//! Errors - エラー型と分類
//!
//! - `BackendError`: 各バックエンドクライアントが返すエラー（どのバックエンド由来かを保持）
//! - `AccessError`: コーディネータが呼び出し元へ返す最終エラー
//! - `ErrorKind`: 運用上の分類

use std::fmt;

use thiserror::Error;

use super::ids::FileId;
use super::operation::Operation;

/// Which backend an error (or a call) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The same-machine desktop companion API.
    LocalApi,
    /// The hosted metadata database.
    MetadataStore,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::LocalApi => f.write_str("local API"),
            BackendKind::MetadataStore => f.write_str("metadata store"),
        }
    }
}

/// ErrorKind は失敗の分類
///
/// - CredentialsAbsent: ローカル API を試行しなかった（ルーティング用、ユーザーには出さない）
/// - TransportFailure: 接続不可・タイムアウト・切断
/// - BackendLogicFailure: 応答はあったが失敗（非 2xx、`success: false`、不正な本文）
/// - DownloadUnavailable: ダウンロード経路がない（フォールバックなし）
/// - NotFound: 対象 ID が存在しない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CredentialsAbsent,
    TransportFailure,
    BackendLogicFailure,
    DownloadUnavailable,
    NotFound,
}

/// Failure reported by one backend client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("no credentials are configured for the local API")]
    CredentialsAbsent,

    #[error("{backend} is unreachable: {message}")]
    Transport { backend: BackendKind, message: String },

    #[error("{backend} error{}: {message}", status_suffix(.status))]
    Logic {
        backend: BackendKind,
        status: Option<u16>,
        message: String,
    },

    #[error("{backend} has no file with id {id}")]
    NotFound { backend: BackendKind, id: FileId },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl BackendError {
    pub fn transport(backend: BackendKind, message: impl Into<String>) -> Self {
        Self::Transport {
            backend,
            message: message.into(),
        }
    }

    pub fn logic(backend: BackendKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Logic {
            backend,
            status,
            message: message.into(),
        }
    }

    pub fn not_found(backend: BackendKind, id: &FileId) -> Self {
        Self::NotFound {
            backend,
            id: id.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::CredentialsAbsent => ErrorKind::CredentialsAbsent,
            BackendError::Transport { .. } => ErrorKind::TransportFailure,
            BackendError::Logic { .. } => ErrorKind::BackendLogicFailure,
            BackendError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }
}

/// Terminal error returned by the access coordinator.
///
/// Every variant renders a message fit for showing to the user as-is.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Both backends failed (or the metadata store failed while the local API
    /// was ineligible).
    #[error("files unavailable: could not {operation} files ({})", describe_failures(.local, .remote))]
    FilesUnavailable {
        operation: Operation,
        local: Option<BackendError>,
        remote: BackendError,
    },

    #[error("file {id} was not found")]
    NotFound { id: FileId },

    /// Only the local API serves file contents, so there is no fallback.
    #[error("download unavailable: {cause}{}", download_hint(.cause))]
    DownloadUnavailable { cause: BackendError },

    #[error("sign-in failed: {0}")]
    SignIn(BackendError),
}

fn describe_failures(local: &Option<BackendError>, remote: &BackendError) -> String {
    match local {
        Some(local) => format!("{local}; {remote}"),
        None => remote.to_string(),
    }
}

// サービスが応答した場合（NotFound や業務エラー）は起動を促さない
fn download_hint(cause: &BackendError) -> &'static str {
    match cause.kind() {
        ErrorKind::CredentialsAbsent => ". Sign in with the SecureCloudFS desktop service running to download files",
        ErrorKind::TransportFailure => ". Start the SecureCloudFS desktop service to download files",
        _ => "",
    }
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccessError::FilesUnavailable { remote, .. } => remote.kind(),
            AccessError::NotFound { .. } => ErrorKind::NotFound,
            AccessError::DownloadUnavailable { .. } => ErrorKind::DownloadUnavailable,
            AccessError::SignIn(cause) => cause.kind(),
        }
    }
}
