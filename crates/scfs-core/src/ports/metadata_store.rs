//! MetadataStore port - ホスト型データベース上のファイルメタデータ
//!
//! # 実装
//! - **PostgrestMetadataStore**: Supabase (PostgREST) 向け本番実装
//! - **InMemoryMetadataStore**: 開発・テスト用

use async_trait::async_trait;

use crate::domain::{BackendError, FileId, FileRecord, OwnerId};

/// MetadataStore はメタデータの一覧・削除・検索を提供（ダウンロードは不可）
///
/// # 設計原則
/// - 一覧と検索はアップロード日時の降順
/// - 検索は filename / original_path に対する大文字小文字を無視した部分一致
/// - 下位ストアの失敗は `BackendKind::MetadataStore` 付きの `BackendError` に包む
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, BackendError>;

    /// Removing an id that matches no row is `BackendError::NotFound`.
    async fn delete(&self, id: &FileId) -> Result<(), BackendError>;

    /// An empty query behaves like [`MetadataStore::list_by_owner`].
    async fn search(&self, owner: &OwnerId, query: &str) -> Result<Vec<FileRecord>, BackendError>;
}
