//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **HttpLocalApi**: デスクトップ常駐サービスの HTTP API（reqwest）
//! - **PostgrestMetadataStore**: Supabase 上の `file_metadata` テーブル（reqwest）
//! - **InMemoryMetadataStore**: 開発・テスト用

pub(crate) mod http;
pub mod http_local_api;
pub mod inmem_store;
pub mod postgrest_store;

// 主要な型を再エクスポート
pub use self::http_local_api::HttpLocalApi;
pub use self::inmem_store::InMemoryMetadataStore;
pub use self::postgrest_store::PostgrestMetadataStore;
