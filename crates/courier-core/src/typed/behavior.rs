//! PipelineBehavior - dispatch の周りに差し込む横断的関心事
//!
//! # 学習ポイント
//! - デコレータ（ミドルウェア）チェーン: 各 behavior は「残りのチェーン」を `Next` として受け取る
//! - `Next` はスライスの先頭を取り出して再帰的に進む（呼び出しごとのチェーン再構築なし）
//! - チェーンの最内側が Handler
//!
//! 実行順は外側から内側へ（入るとき）、内側から外側へ（戻るとき）で固定です。

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::context::DispatchContext;
use super::handler::RequestHandler;
use crate::domain::{DispatchError, Request};

/// Behavior は Request・継続（Next）・コンテキストを受け取り、応答か失敗を返す
///
/// `next.run(...)` を呼ばなければ、内側の behavior と Handler は実行されません。
///
/// # 使用例
/// ```ignore
/// struct Audit;
///
/// #[async_trait]
/// impl<R: Request> PipelineBehavior<R> for Audit {
///     async fn handle(&self, request: R, ctx: &DispatchContext, next: Next<'_, R>) -> Result<R::Response, DispatchError> {
///         audit_log(R::NAME);
///         next.run(request, ctx).await
///     }
/// }
/// ```
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync {
    async fn handle(
        &self,
        request: R,
        ctx: &DispatchContext,
        next: Next<'_, R>,
    ) -> Result<R::Response, DispatchError>;
}

/// The remainder of the chain: the next behavior, or the handler if none remain.
pub struct Next<'a, R: Request> {
    behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
    handler: &'a dyn RequestHandler<R>,
}

impl<'a, R: Request> Next<'a, R> {
    pub fn new(behaviors: &'a [Arc<dyn PipelineBehavior<R>>], handler: &'a dyn RequestHandler<R>) -> Self {
        Self { behaviors, handler }
    }

    /// Number of behaviors still ahead of the handler.
    pub fn remaining(&self) -> usize {
        self.behaviors.len()
    }

    pub async fn run(self, request: R, ctx: &DispatchContext) -> Result<R::Response, DispatchError> {
        match self.behaviors.split_first() {
            Some((behavior, rest)) => {
                let next = Next {
                    behaviors: rest,
                    handler: self.handler,
                };
                behavior.handle(request, ctx, next).await
            }
            None => {
                // Handler は I/O を待つことがあるので、キャンセルと競合させる
                let handled = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Err(DispatchError::Cancelled),
                    handled = AssertUnwindSafe(self.handler.handle(request, ctx)).catch_unwind() => handled,
                };
                handled.unwrap_or_else(|panic| {
                    let detail = panic_message(panic.as_ref());
                    tracing::error!(request_type = R::NAME, panic = %detail, "handler panicked");
                    Err(DispatchError::unexpected(format!("handler for {} panicked: {detail}", R::NAME)))
                })
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestKind;
    use serde::Serialize;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Serialize)]
    struct Trace;

    impl Request for Trace {
        type Response = Vec<String>;
        const NAME: &'static str = "test.trace.v1";
        const KIND: RequestKind = RequestKind::Query;
    }

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        label: &'static str,
        journal: Journal,
    }

    #[async_trait]
    impl PipelineBehavior<Trace> for Recording {
        async fn handle(
            &self,
            request: Trace,
            ctx: &DispatchContext,
            next: Next<'_, Trace>,
        ) -> Result<Vec<String>, DispatchError> {
            self.journal.lock().unwrap().push(format!("{} enter", self.label));
            let result = next.run(request, ctx).await;
            self.journal.lock().unwrap().push(format!("{} exit", self.label));
            result
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl PipelineBehavior<Trace> for ShortCircuit {
        async fn handle(
            &self,
            _request: Trace,
            _ctx: &DispatchContext,
            _next: Next<'_, Trace>,
        ) -> Result<Vec<String>, DispatchError> {
            Err(DispatchError::domain("blocked", "short circuit"))
        }
    }

    struct JournalHandler {
        journal: Journal,
    }

    #[async_trait]
    impl RequestHandler<Trace> for JournalHandler {
        async fn handle(&self, _request: Trace, _ctx: &DispatchContext) -> Result<Vec<String>, DispatchError> {
            self.journal.lock().unwrap().push("handler".to_string());
            Ok(self.journal.lock().unwrap().clone())
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl RequestHandler<Trace> for SlowHandler {
        async fn handle(&self, _request: Trace, _ctx: &DispatchContext) -> Result<Vec<String>, DispatchError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    struct CrashingHandler;

    #[async_trait]
    impl RequestHandler<Trace> for CrashingHandler {
        async fn handle(&self, _request: Trace, _ctx: &DispatchContext) -> Result<Vec<String>, DispatchError> {
            panic!("store driver crashed")
        }
    }

    fn recording(label: &'static str, journal: &Journal) -> Arc<dyn PipelineBehavior<Trace>> {
        Arc::new(Recording {
            label,
            journal: journal.clone(),
        })
    }

    #[tokio::test]
    async fn chain_runs_outside_in() {
        let journal = Journal::default();
        let behaviors = vec![recording("outer", &journal), recording("inner", &journal)];
        let handler = JournalHandler {
            journal: journal.clone(),
        };

        let seen = Next::new(&behaviors, &handler)
            .run(Trace, &DispatchContext::new())
            .await
            .unwrap();

        assert_eq!(seen, vec!["outer enter", "inner enter", "handler"]);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["outer enter", "inner enter", "handler", "inner exit", "outer exit"]
        );
    }

    #[tokio::test]
    async fn empty_chain_calls_handler_directly() {
        let journal = Journal::default();
        let handler = JournalHandler {
            journal: journal.clone(),
        };

        let next = Next::<Trace>::new(&[], &handler);
        assert_eq!(next.remaining(), 0);
        let seen = next.run(Trace, &DispatchContext::new()).await.unwrap();
        assert_eq!(seen, vec!["handler"]);
    }

    #[tokio::test]
    async fn behavior_can_skip_the_rest_of_the_chain() {
        let journal = Journal::default();
        let behaviors: Vec<Arc<dyn PipelineBehavior<Trace>>> =
            vec![recording("outer", &journal), Arc::new(ShortCircuit)];
        let handler = JournalHandler {
            journal: journal.clone(),
        };

        let result = Next::new(&behaviors, &handler)
            .run(Trace, &DispatchContext::new())
            .await;

        assert_eq!(result, Err(DispatchError::domain("blocked", "short circuit")));
        assert_eq!(*journal.lock().unwrap(), vec!["outer enter", "outer exit"]);
    }

    #[tokio::test]
    async fn cancellation_abandons_a_waiting_handler() {
        let (ctx, handle) = DispatchContext::cancellable();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            Next::<Trace>::new(&[], &SlowHandler).run(Trace, &ctx),
        )
        .await
        .unwrap();

        assert_eq!(result, Err(DispatchError::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn handler_panic_becomes_unexpected_fault() {
        let journal = Journal::default();
        let behaviors = vec![recording("outer", &journal)];

        let result = Next::new(&behaviors, &CrashingHandler)
            .run(Trace, &DispatchContext::new())
            .await;

        assert_eq!(
            result,
            Err(DispatchError::unexpected(
                "handler for test.trace.v1 panicked: store driver crashed"
            ))
        );
        assert_eq!(*journal.lock().unwrap(), vec!["outer enter", "outer exit"]);
    }
}
