//! FileRecord - 暗号化済みファイルのメタデータ
//!
//! This module only defines the shape shared by both backends. Records are
//! created by the external upload pipeline; this crate reads and deletes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{FileId, OwnerId};

/// Metadata of one uploaded (encrypted) file.
///
/// Field names on the wire follow the hosted `file_metadata` table, which the
/// local API passes through unchanged. Extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,

    #[serde(rename = "user_id")]
    pub owner: OwnerId,

    pub filename: String,

    pub original_path: String,

    #[serde(rename = "size")]
    pub size_bytes: u64,

    #[serde(rename = "hash_sha256")]
    pub content_hash: String,

    #[serde(with = "timestamp")]
    pub uploaded_at: DateTime<Utc>,

    #[serde(rename = "oci_object_name")]
    pub storage_object_name: String,
}

impl FileRecord {
    /// Case-insensitive substring match against filename or original path.
    ///
    /// An empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.filename.to_lowercase().contains(&needle)
            || self.original_path.to_lowercase().contains(&needle)
    }
}

/// `uploaded_at` は RFC 3339 と、タイムゾーンなしの ISO-8601（UTC とみなす）の両方を受け付ける。
///
/// The upload pipeline writes naive timestamps, and the column type decides
/// whether they come back with an offset.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        // Postgres の timestamptz は "2024-01-01 12:00:00+00" のようにスペース区切りで返ることもある
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
