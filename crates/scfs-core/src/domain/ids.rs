//! Domain identifiers (strongly-typed IDs).
//!
//! バックエンドが発行する ID はどちらも不透明な文字列です（Supabase の UUID など）。
//! このクレートでは中身を解釈せず、Phantom type パターンで種類だけを区別します。
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時の型安全性を提供します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Debug / ログ用の種別名（例: "file", "owner"）
    fn kind() -> &'static str;
}

/// ジェネリック ID 型
///
/// ワイヤ上では素の文字列としてシリアライズされます。
///
/// # 例
/// ```ignore
/// let file: FileId = Id::new("f1");
/// let owner: OwnerId = Id::new("u1");
/// // file と owner は異なる型なので、混同できない
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::kind(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// File record のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum File {}

impl IdMarker for File {
    fn kind() -> &'static str {
        "file"
    }
}

/// Owner（ユーザー）のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {}

impl IdMarker for Owner {
    fn kind() -> &'static str {
        "owner"
    }
}

/// Identifier of a stored file's metadata row.
pub type FileId = Id<File>;

/// Identifier of the user owning a file (the hosted store's `user_id`).
pub type OwnerId = Id<Owner>;
