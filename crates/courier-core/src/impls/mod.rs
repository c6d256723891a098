//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryDocumentStore**: 開発用のドキュメントストア
//! - **TracingEventSink**: デフォルトのログ出力先
//! - **MemoryEventSink**: テスト用のイベント記録
//!
//! 本番用のストア実装（PostgreSQL ドキュメントストアなど）は別クレートに置きます。

pub mod inmem_store;
pub mod sinks;

pub use self::inmem_store::InMemoryDocumentStore;
pub use self::sinks::{MemoryEventSink, TracingEventSink};
