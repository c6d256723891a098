//! Events - dispatch の計測イベント
//!
//! LoggingBehavior が EventSink に渡す構造化イベントです。
//! ビジネス上の意味は持たず、開始・終了と所要時間だけを記録します。

use serde::Serialize;

use super::errors::{DispatchError, FailureKind};
use super::ids::DispatchId;
use super::request::RequestKind;

/// Outcome of one dispatch as seen by the logging stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Success,
    Failure { kind: FailureKind },
}

impl<T> From<&Result<T, DispatchError>> for DispatchOutcome {
    fn from(result: &Result<T, DispatchError>) -> Self {
        match result {
            Ok(_) => DispatchOutcome::Success,
            Err(err) => DispatchOutcome::Failure { kind: err.kind() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    Started {
        dispatch_id: DispatchId,
        request_type: &'static str,
        request_kind: RequestKind,
        /// Snapshot of the request's fields.
        request: serde_json::Value,
    },
    Completed {
        dispatch_id: DispatchId,
        request_type: &'static str,
        outcome: DispatchOutcome,
        elapsed_ms: u64,
    },
}

impl DispatchEvent {
    pub fn dispatch_id(&self) -> DispatchId {
        match self {
            DispatchEvent::Started { dispatch_id, .. } => *dispatch_id,
            DispatchEvent::Completed { dispatch_id, .. } => *dispatch_id,
        }
    }

    pub fn request_type(&self) -> &'static str {
        match self {
            DispatchEvent::Started { request_type, .. } => request_type,
            DispatchEvent::Completed { request_type, .. } => request_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ulid::Ulid;

    #[test]
    fn outcome_follows_result() {
        let ok: Result<u32, DispatchError> = Ok(1);
        let err: Result<u32, DispatchError> = Err(DispatchError::Cancelled);

        assert_eq!(DispatchOutcome::from(&ok), DispatchOutcome::Success);
        assert_eq!(
            DispatchOutcome::from(&err),
            DispatchOutcome::Failure {
                kind: FailureKind::Cancelled
            }
        );
    }

    #[test]
    fn completed_event_serializes_with_tags() {
        let event = DispatchEvent::Completed {
            dispatch_id: DispatchId::from_ulid(Ulid::nil()),
            request_type: "test.ping.v1",
            outcome: DispatchOutcome::Failure {
                kind: FailureKind::DomainFault,
            },
            elapsed_ms: 3,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], json!("completed"));
        assert_eq!(value["outcome"], json!({ "status": "failure", "kind": "domain_fault" }));
        assert_eq!(value["elapsed_ms"], json!(3));
    }
}
