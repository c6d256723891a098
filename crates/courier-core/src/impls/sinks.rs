//! EventSink の実装
//!
//! - TracingEventSink: `courier::dispatch` target の tracing イベントとして出力
//! - MemoryEventSink: 受け取ったイベントを保持（テスト・デバッグ用）

use std::sync::Mutex;

use crate::domain::{DispatchEvent, DispatchOutcome};
use crate::ports::{EventSink, SinkError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &DispatchEvent) -> Result<(), SinkError> {
        match event {
            DispatchEvent::Started {
                dispatch_id,
                request_type,
                request_kind,
                request,
            } => {
                tracing::info!(
                    target: "courier::dispatch",
                    %dispatch_id,
                    request_type,
                    %request_kind,
                    %request,
                    "dispatch started"
                );
            }
            DispatchEvent::Completed {
                dispatch_id,
                request_type,
                outcome,
                elapsed_ms,
            } => match outcome {
                DispatchOutcome::Success => tracing::info!(
                    target: "courier::dispatch",
                    %dispatch_id,
                    request_type,
                    elapsed_ms,
                    "dispatch completed"
                ),
                DispatchOutcome::Failure { kind } => tracing::warn!(
                    target: "courier::dispatch",
                    %dispatch_id,
                    request_type,
                    elapsed_ms,
                    failure = ?kind,
                    "dispatch failed"
                ),
            },
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<DispatchEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &DispatchEvent) -> Result<(), SinkError> {
        self.events
            .lock()
            .map_err(|e| SinkError(format!("event buffer poisoned: {e}")))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DispatchId, RequestKind};
    use serde_json::json;
    use ulid::Ulid;

    fn started() -> DispatchEvent {
        DispatchEvent::Started {
            dispatch_id: DispatchId::from_ulid(Ulid::new()),
            request_type: "test.ping.v1",
            request_kind: RequestKind::Command,
            request: json!({ "n": 1 }),
        }
    }

    #[test]
    fn memory_sink_keeps_events_in_order() {
        let sink = MemoryEventSink::new();
        let first = started();
        let second = started();

        sink.emit(&first).unwrap();
        sink.emit(&second).unwrap();

        assert_eq!(sink.events(), vec![first, second]);
    }

    #[test]
    fn tracing_sink_never_fails() {
        assert!(TracingEventSink.emit(&started()).is_ok());
    }
}
