//! InMemoryMetadataStore - 開発・テスト用のメタデータストア
//!
//! PostgREST 版と同じ並び順・検索規則を Vec 上で再現します。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{BackendError, BackendKind, FileId, FileRecord, OwnerId};
use crate::ports::MetadataStore;

/// In-memory [`MetadataStore`].
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Mutex<Vec<FileRecord>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().collect()),
        }
    }

    /// 同じ id があれば置き換える
    pub async fn insert(&self, record: FileRecord) {
        let mut records = self.records.lock().await;
        records.retain(|r| r.id != record.id);
        records.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    async fn select<F>(&self, owner: &OwnerId, keep: F) -> Vec<FileRecord>
    where
        F: Fn(&FileRecord) -> bool,
    {
        let records = self.records.lock().await;
        let mut found: Vec<FileRecord> = records
            .iter()
            .filter(|r| &r.owner == owner && keep(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        found
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, BackendError> {
        Ok(self.select(owner, |_| true).await)
    }

    async fn delete(&self, id: &FileId) -> Result<(), BackendError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| &r.id != id);
        if records.len() == before {
            return Err(BackendError::not_found(BackendKind::MetadataStore, id));
        }
        Ok(())
    }

    async fn search(&self, owner: &OwnerId, query: &str) -> Result<Vec<FileRecord>, BackendError> {
        Ok(self.select(owner, |r| r.matches(query)).await)
    }
}
