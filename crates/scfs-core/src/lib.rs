//! scfs-core
//!
//! File access for the SecureCloudFS dashboard: a local HTTP API first, with a
//! hosted metadata store as the fallback.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, credential, file_record, reply, state, errors）
//! - **ports**: 抽象化レイヤー（LocalFileApi, MetadataStore）
//! - **impls**: 実装（HttpLocalApi, PostgrestMetadataStore, InMemoryMetadataStore）
//! - **app**: アプリケーションロジック（AccessCoordinator, CoordinatorBuilder）
//! - **config**: 起動時に一度だけ解決する設定
//! - **credentials**: セッション中の認証情報スロット

pub mod domain;
pub mod ports;
pub mod impls;
pub mod app;
pub mod config;
pub mod credentials;

pub use app::{AccessCoordinator, BuildError, CoordinatorBuilder};
pub use config::{AccessConfig, ConfigError, MetadataStoreConfig};
pub use credentials::CredentialStore;
pub use domain::{AccessError, BackendError, BackendKind, DownloadedFile, ErrorKind, FileId, FileRecord, OwnerId};
