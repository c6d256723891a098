//! Strongly-typed identifiers.
//!
//! # ULID + Phantom Type
//! `Id<T>` は ULID を包むジェネリック ID 型です。`T` は実行時には使わない
//! マーカー型で、`DispatchId` とハンドラ側のエンティティ ID（例: `ProductId`）を
//! コンパイル時に区別します。
//!
//! - 時刻でソート可能（ULID の先頭は timestamp）
//! - 分散生成可能（調整不要）
//! - 128-bit（UUID 互換）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

use crate::ports::IdGenerator;

/// IdMarker は各 ID 型のマーカー trait
///
/// ハンドラ側でエンティティ用の ID を定義する場合:
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// pub enum Product {}
///
/// impl IdMarker for Product {
///     fn prefix() -> &'static str {
///         "product-"
///     }
/// }
///
/// pub type ProductId = Id<Product>;
/// ```
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "dispatch-"）
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// IdGenerator から新しい ID を払い出す
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self::from_ulid(ids.next_ulid())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Dispatch のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dispatch {}

impl IdMarker for Dispatch {
    fn prefix() -> &'static str {
        "dispatch-"
    }
}

/// Identifier of one dispatch (correlates the log events of a single call).
pub type DispatchId = Id<Dispatch>;
