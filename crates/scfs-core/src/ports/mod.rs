//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! コーディネータは trait だけに依存し、HTTP やデータベースの詳細は
//! `impls` の実装に閉じ込めます。テストでは任意の実装に差し替えます。

pub mod local_api;
pub mod metadata_store;

pub use self::local_api::LocalFileApi;
pub use self::metadata_store::MetadataStore;
