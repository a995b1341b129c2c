//! LocalFileApi port - デスクトップ常駐サービス（同一マシンの HTTP API）
//!
//! # 実装
//! - **HttpLocalApi**: reqwest による本番実装（`impls::http_local_api`）

use async_trait::async_trait;

use crate::domain::{BackendError, FileId, FileRecord};

/// LocalFileApi は特権ローカルサービスへの操作
///
/// # 設計原則
/// - 各リクエストは組み立て時点の認証情報スナップショットをヘッダに載せる
/// - 非 2xx と `success: false` はどちらも失敗（transport 失敗とはログ上でのみ区別）
/// - 存在しない ID は `BackendError::NotFound`
#[async_trait]
pub trait LocalFileApi: Send + Sync {
    /// `GET /files` for the user the credential headers identify.
    async fn list_files(&self) -> Result<Vec<FileRecord>, BackendError>;

    /// `DELETE /files/{id}`.
    async fn delete_file(&self, id: &FileId) -> Result<(), BackendError>;

    /// `GET /files/download/{id}`; the raw body, byte for byte.
    async fn download_file(&self, id: &FileId) -> Result<Vec<u8>, BackendError>;

    /// Authenticated connectivity test. Never fails, only reports.
    async fn test_connection(&self) -> bool;

    /// `POST /auth/login`; returns the user object the service reports.
    async fn login(&self, identity: &str, secret: &str) -> Result<serde_json::Value, BackendError>;
}
