//! Domain model (IDs, credentials, file records, errors, fallback state).
//!
//! - ids: FileId / OwnerId（不透明な文字列 ID）
//! - credential: セッション中の認証情報
//! - file_record: ファイルメタデータ
//! - reply: ローカル API 応答のタグ付き結果
//! - state: フォールバックの状態遷移
//! - errors: エラー型と分類

pub mod credential;
pub mod download;
pub mod errors;
pub mod file_record;
pub mod ids;
pub mod operation;
pub mod reply;
pub mod state;

pub use self::credential::Credential;
pub use self::download::DownloadedFile;
pub use self::errors::{AccessError, BackendError, BackendKind, ErrorKind};
pub use self::file_record::FileRecord;
pub use self::ids::{FileId, OwnerId};
pub use self::operation::Operation;
pub use self::reply::Reply;
pub use self::state::{Phase, Step};
