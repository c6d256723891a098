//! EventSink port - dispatch イベントの記録先
//!
//! LoggingBehavior はこの port にイベントを渡すだけです。
//! emit の失敗は LoggingBehavior 側で握りつぶされ、dispatch の結果には影響しません。
//!
//! # 実装
//! - TracingEventSink: tracing へ出力（デフォルト）
//! - MemoryEventSink: テスト用に記録

use crate::domain::DispatchEvent;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event sink failed: {0}")]
pub struct SinkError(pub String);

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DispatchEvent) -> Result<(), SinkError>;
}
