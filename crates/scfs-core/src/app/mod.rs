//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **CoordinatorBuilder**: バックエンドのワイヤリングと起動時検証
//! - **AccessCoordinator**: 操作ごとのバックエンド選択とフォールバック
//! - **Attempt**: フォールバックの状態（値とエラーを運ぶ）

pub mod builder;
pub mod coordinator;
pub mod fallback;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, CoordinatorBuilder};
pub use self::coordinator::AccessCoordinator;
pub use self::fallback::Attempt;
