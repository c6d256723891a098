//! GlobalBehavior - リクエスト型を問わず差し込む behavior
//!
//! # 学習ポイント
//! - `PipelineBehavior<R>` は型ごとの trait なので、`dyn` で「全型向け」を保持できない
//! - そこで応答を `Box<dyn Any + Send>` に消去した object-safe な trait を用意する
//! - build 時に composer が型ごとに `GlobalStage<R>` で包み、通常の behavior として並べる
//!
//! GlobalBehavior が見られるのはリクエストの素性（型名・種別）とコンテキストだけです。
//! フィールドに触れたい場合は型ごとの `MediatorBuilder::wrap` を使います。

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use super::behavior::{Next, PipelineBehavior};
use super::context::DispatchContext;
use crate::domain::{DispatchError, Request, RequestDescriptor};

/// Response of the inner chain with its type erased.
pub type ErasedResponse = Box<dyn Any + Send>;

/// The rest of the chain as seen from a [`GlobalBehavior`].
pub struct ErasedNext<'a> {
    inner: BoxFuture<'a, Result<ErasedResponse, DispatchError>>,
}

impl ErasedNext<'_> {
    /// Runs the inner behaviors and the handler.
    ///
    /// Return the response as received; a replaced response is an `UnexpectedFault`.
    pub async fn run(self) -> Result<ErasedResponse, DispatchError> {
        self.inner.await
    }
}

/// Behavior registered once and applied to every matching request type
///
/// # 使用例
/// ```ignore
/// struct Metrics;
///
/// #[async_trait]
/// impl GlobalBehavior for Metrics {
///     async fn handle(&self, request: &RequestDescriptor, _ctx: &DispatchContext, next: ErasedNext<'_>)
///         -> Result<ErasedResponse, DispatchError> {
///         let started = Instant::now();
///         let result = next.run().await;
///         record(request.name, started.elapsed(), result.is_ok());
///         result
///     }
/// }
/// ```
#[async_trait]
pub trait GlobalBehavior: Send + Sync {
    /// Whether this behavior joins the chain of `request`. Every type by default.
    fn applies_to(&self, request: &RequestDescriptor) -> bool {
        let _ = request;
        true
    }

    async fn handle(
        &self,
        request: &RequestDescriptor,
        ctx: &DispatchContext,
        next: ErasedNext<'_>,
    ) -> Result<ErasedResponse, DispatchError>;
}

/// Adapts a [`GlobalBehavior`] to the chain of one request type.
pub(crate) struct GlobalStage<R> {
    name: String,
    behavior: Arc<dyn GlobalBehavior>,
    _request: PhantomData<fn(R)>,
}

impl<R: Request> GlobalStage<R> {
    pub(crate) fn new(name: impl Into<String>, behavior: Arc<dyn GlobalBehavior>) -> Self {
        Self {
            name: name.into(),
            behavior,
            _request: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for GlobalStage<R> {
    async fn handle(
        &self,
        request: R,
        ctx: &DispatchContext,
        next: Next<'_, R>,
    ) -> Result<R::Response, DispatchError> {
        let descriptor = RequestDescriptor::of::<R>();
        let inner = ErasedNext {
            inner: Box::pin(async move {
                next.run(request, ctx)
                    .await
                    .map(|response| Box::new(response) as ErasedResponse)
            }),
        };

        let response = self.behavior.handle(&descriptor, ctx, inner).await?;
        match response.downcast::<R::Response>() {
            Ok(response) => Ok(*response),
            Err(_) => {
                tracing::error!(request_type = R::NAME, behavior = %self.name, "behavior replaced the response");
                Err(DispatchError::unexpected(format!(
                    "behavior '{}' returned a foreign response for {}",
                    self.name,
                    R::NAME
                )))
            }
        }
    }
}
