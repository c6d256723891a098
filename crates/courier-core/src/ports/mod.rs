//! Ports - 外部とのインターフェース
//!
//! コアが前提とする外部コラボレーター（ドキュメントストア、ログの出力先、
//! 時刻、ID 生成）を trait として定義します。実装は `impls` に置きます。

pub mod clock;
pub mod document_store;
pub mod event_sink;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::document_store::{Document, DocumentSession, DocumentStore, Page, StoreError};
pub use self::event_sink::{EventSink, SinkError};
pub use self::id_generator::{IdGenerator, UlidGenerator};
