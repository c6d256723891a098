//! Mediator - 型付きリクエストの dispatch 入口
//!
//! # フロー
//! 1. リクエスト型から組み立て済みの Pipeline を引く（なければ `HandlerNotFound`、behavior は走らない）
//! 2. 既にキャンセル済みなら `Cancelled`（何も走らない）
//! 3. behavior チェーン → Handler を実行し、結果をそのまま返す
//!
//! 構築後は参照のみなので、複数タスクから同時に dispatch できます。

use std::any::TypeId;
use std::collections::HashMap;
use std::time::Duration;

use crate::app::builder::MediatorBuilder;
use crate::app::pipeline::{ErasedPipeline, Pipeline};
use crate::domain::{DispatchError, Request, RequestDescriptor};
use crate::typed::DispatchContext;

pub struct Mediator {
    pipelines: HashMap<TypeId, ErasedPipeline>,
    /// 登録順
    descriptors: Vec<RequestDescriptor>,
    dispatch_timeout: Option<Duration>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    pub(crate) fn new(dispatch_timeout: Option<Duration>) -> Self {
        Self {
            pipelines: HashMap::new(),
            descriptors: Vec::new(),
            dispatch_timeout,
        }
    }

    pub(crate) fn insert(&mut self, descriptor: RequestDescriptor, pipeline: ErasedPipeline) {
        self.pipelines.insert(descriptor.type_id, pipeline);
        self.descriptors.push(descriptor);
    }

    pub fn handles<R: Request>(&self) -> bool {
        self.pipelines.contains_key(&TypeId::of::<R>())
    }

    /// Request types this mediator can dispatch, in registration order.
    pub fn request_types(&self) -> &[RequestDescriptor] {
        &self.descriptors
    }

    /// Dispatches `request` under the caller's context.
    pub async fn dispatch<R: Request>(&self, request: R, ctx: &DispatchContext) -> Result<R::Response, DispatchError> {
        let pipeline = self.pipeline::<R>()?;
        if ctx.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        pipeline.execute(request, ctx).await
    }

    /// Dispatches under a fresh context carrying the configured timeout, if any.
    pub async fn send<R: Request>(&self, request: R) -> Result<R::Response, DispatchError> {
        let ctx = match self.dispatch_timeout {
            Some(timeout) => DispatchContext::new().with_timeout(timeout),
            None => DispatchContext::new(),
        };
        self.dispatch(request, &ctx).await
    }

    fn pipeline<R: Request>(&self) -> Result<&Pipeline<R>, DispatchError> {
        match self
            .pipelines
            .get(&TypeId::of::<R>())
            .and_then(|erased| erased.downcast_ref::<Pipeline<R>>())
        {
            Some(pipeline) => Ok(pipeline),
            None => {
                tracing::error!(request_type = R::NAME, "no handler registered");
                Err(DispatchError::HandlerNotFound(R::NAME))
            }
        }
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("request_types", &self.descriptors)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .finish()
    }
}
