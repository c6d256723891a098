//! LoggingBehavior - dispatch の開始・終了・所要時間を記録するステージ
//!
//! リクエストと結果には一切手を加えません。
//! EventSink の失敗（Err や panic）やスナップショットの失敗は `warn!` で報告するだけで、
//! dispatch の失敗にはなりません。

use async_trait::async_trait;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{DispatchError, DispatchEvent, DispatchOutcome, Request};
use crate::ports::EventSink;
use crate::typed::{DispatchContext, Next, PipelineBehavior};

#[derive(Clone)]
pub struct LoggingBehavior {
    sink: Arc<dyn EventSink>,
}

impl LoggingBehavior {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    fn emit(&self, event: &DispatchEvent) {
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.sink.emit(event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(
                request_type = event.request_type(),
                error = %err,
                "dispatch event dropped"
            ),
            Err(_) => tracing::warn!(
                request_type = event.request_type(),
                "event sink panicked; dispatch event dropped"
            ),
        }
    }
}

fn snapshot<R: Request>(request: &R) -> serde_json::Value {
    serde_json::to_value(request).unwrap_or_else(|err| {
        tracing::warn!(request_type = R::NAME, error = %err, "request snapshot failed");
        serde_json::Value::Null
    })
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for LoggingBehavior {
    async fn handle(
        &self,
        request: R,
        ctx: &DispatchContext,
        next: Next<'_, R>,
    ) -> Result<R::Response, DispatchError> {
        self.emit(&DispatchEvent::Started {
            dispatch_id: ctx.dispatch_id(),
            request_type: R::NAME,
            request_kind: R::KIND,
            request: snapshot(&request),
        });

        let started = Instant::now();
        let result = next.run(request, ctx).await;

        self.emit(&DispatchEvent::Completed {
            dispatch_id: ctx.dispatch_id(),
            request_type: R::NAME,
            outcome: DispatchOutcome::from(&result),
            elapsed_ms: elapsed_ms(started.elapsed()),
        });

        result
    }
}
