//! DispatchContext - 1 回の dispatch に紐づく状態
//!
//! # 学習ポイント
//! - `tokio::sync::watch` によるキャンセル通知（Sender を drop しても誤ってキャンセルされない）
//! - deadline とキャンセルを同じ `cancelled()` で待てるようにする
//!
//! コンテキストは呼び出しごとに作られ、呼び出しが返ると破棄されます。
//! あるコンテキストのキャンセルは他の dispatch に影響しません。

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use ulid::Ulid;

use crate::domain::DispatchId;

/// Cancels the dispatch(es) running with the paired context.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        // send_replace: 受信側がいなくても値は更新される
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Per-call state threaded through the behavior chain.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    dispatch_id: DispatchId,
    signal: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl DispatchContext {
    /// A context that is never cancelled.
    pub fn new() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self::from_receiver(rx)
    }

    /// A context plus the handle that cancels it.
    pub fn cancellable() -> (Self, CancellationHandle) {
        let (tx, rx) = watch::channel(false);
        (Self::from_receiver(rx), CancellationHandle { tx })
    }

    fn from_receiver(signal: watch::Receiver<bool>) -> Self {
        Self {
            dispatch_id: DispatchId::from_ulid(Ulid::new()),
            signal,
            deadline: None,
        }
    }

    /// Reaching the deadline counts as cancellation. An earlier deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn dispatch_id(&self) -> DispatchId {
        self.dispatch_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Never resolves for a context without a live cancellation source.
    pub async fn cancelled(&self) {
        let mut signal = self.signal.clone();
        let fired = async move {
            if signal.wait_for(|cancelled| *cancelled).await.is_err() {
                // Sender dropped without cancelling
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = fired => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => fired.await,
        }
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_context_is_not_cancelled() {
        let ctx = DispatchContext::new();
        assert!(!ctx.is_cancelled());

        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let (ctx, handle) = DispatchContext::cancellable();

        let waiter = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.cancelled().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(ctx.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_handle_does_not_cancel() {
        let (ctx, handle) = DispatchContext::cancellable();
        drop(handle);

        assert!(!ctx.is_cancelled());
        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn deadline_counts_as_cancellation() {
        let ctx = DispatchContext::new().with_timeout(Duration::from_millis(30));
        assert!(!ctx.is_cancelled());

        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .unwrap();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = DispatchContext::new()
            .with_deadline(now + Duration::from_secs(10))
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(5));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn each_context_gets_its_own_dispatch_id() {
        assert_ne!(DispatchContext::new().dispatch_id(), DispatchContext::new().dispatch_id());
    }
}
