//! Pipeline - リクエスト型ごとに組み立て済みの behavior チェーン
//!
//! # 学習ポイント
//! - チェーンは起動時にリクエスト型ごとに 1 回だけ組み立てる（呼び出しごとの再構築なし）
//! - `fn` ポインタ（`assemble::<R>`）を登録時に保持して、型消去されたまま型付きの組み立てを行う
//! - behavior の適用可否（validation はコマンドのみ）は `RequestKind` で判定
//! - 名前付きスロットには GlobalBehavior を `GlobalStage<R>` で包んで差し込む

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::app::config::BehaviorKind;
use crate::behaviors::{LoggingBehavior, ValidationBehavior};
use crate::domain::{DispatchError, Request, RequestDescriptor};
use crate::typed::global::GlobalStage;
use crate::typed::{
    DispatchContext, GlobalBehavior, HandlerRegistry, Next, PipelineBehavior, RequestHandler, ValidatorSet,
};

/// Behaviors outermost first, then the handler.
pub struct Pipeline<R: Request> {
    behaviors: Vec<Arc<dyn PipelineBehavior<R>>>,
    handler: Arc<dyn RequestHandler<R>>,
}

impl<R: Request> Pipeline<R> {
    pub fn new(behaviors: Vec<Arc<dyn PipelineBehavior<R>>>, handler: Arc<dyn RequestHandler<R>>) -> Self {
        Self { behaviors, handler }
    }

    /// Number of behaviors wrapped around the handler.
    pub fn depth(&self) -> usize {
        self.behaviors.len()
    }

    pub async fn execute(&self, request: R, ctx: &DispatchContext) -> Result<R::Response, DispatchError> {
        Next::new(&self.behaviors, self.handler.as_ref())
            .run(request, ctx)
            .await
    }
}

/// Per-request-type behaviors added with `MediatorBuilder::wrap`.
#[derive(Default)]
pub(crate) struct ExtraBehaviors {
    lists: HashMap<TypeId, (RequestDescriptor, Box<dyn Any + Send + Sync>)>,
}

impl ExtraBehaviors {
    pub(crate) fn push<R: Request>(&mut self, behavior: Arc<dyn PipelineBehavior<R>>) {
        let descriptor = RequestDescriptor::of::<R>();
        let (_, list) = self.lists.entry(descriptor.type_id).or_insert_with(|| {
            (
                descriptor,
                Box::new(Vec::<Arc<dyn PipelineBehavior<R>>>::new()),
            )
        });
        if let Some(list) = list.downcast_mut::<Vec<Arc<dyn PipelineBehavior<R>>>>() {
            list.push(behavior);
        }
    }

    pub(crate) fn for_type<R: Request>(&self) -> Vec<Arc<dyn PipelineBehavior<R>>> {
        self.lists
            .get(&TypeId::of::<R>())
            .and_then(|(_, list)| list.downcast_ref::<Vec<Arc<dyn PipelineBehavior<R>>>>())
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn request_types(&self) -> Vec<RequestDescriptor> {
        self.lists.values().map(|(descriptor, _)| *descriptor).collect()
    }
}

/// Everything needed to compose the pipeline of any registered request type.
pub(crate) struct Composer<'a> {
    pub(crate) registry: &'a HandlerRegistry,
    pub(crate) validators: &'a ValidatorSet,
    pub(crate) extras: &'a ExtraBehaviors,
    pub(crate) order: &'a [BehaviorKind],
    pub(crate) logging: Arc<LoggingBehavior>,
    pub(crate) globals: &'a HashMap<String, Arc<dyn GlobalBehavior>>,
}

impl Composer<'_> {
    /// Configured behaviors that apply to `R`, then `R`'s extra behaviors.
    pub(crate) fn behaviors_for<R: Request>(&self) -> Vec<Arc<dyn PipelineBehavior<R>>> {
        let descriptor = RequestDescriptor::of::<R>();
        let mut behaviors: Vec<Arc<dyn PipelineBehavior<R>>> = Vec::new();
        for kind in self.order {
            match kind {
                BehaviorKind::Logging => behaviors.push(self.logging.clone()),
                BehaviorKind::Validation if R::KIND.is_validatable() => {
                    behaviors.push(Arc::new(ValidationBehavior::new(self.validators.validators_for::<R>())));
                }
                BehaviorKind::Validation => {}
                BehaviorKind::Named(name) => match self.globals.get(name) {
                    Some(global) if global.applies_to(&descriptor) => {
                        behaviors.push(Arc::new(GlobalStage::<R>::new(name.clone(), global.clone())));
                    }
                    Some(_) => {}
                    None => tracing::warn!(behavior = %name, "pipeline slot names no registered behavior"),
                },
            }
        }
        behaviors.extend(self.extras.for_type::<R>());
        behaviors
    }

    pub(crate) fn compose<R: Request>(&self) -> Result<Pipeline<R>, DispatchError> {
        let handler = self.registry.resolve::<R>()?;
        Ok(Pipeline::new(self.behaviors_for::<R>(), handler))
    }
}

pub(crate) type ErasedPipeline = Box<dyn Any + Send + Sync>;

/// Monomorphized per request type at registration, called once at build.
pub(crate) type AssembleFn = fn(&Composer<'_>) -> Result<(ErasedPipeline, usize), DispatchError>;

pub(crate) fn assemble<R: Request>(composer: &Composer<'_>) -> Result<(ErasedPipeline, usize), DispatchError> {
    let pipeline = composer.compose::<R>()?;
    let depth = pipeline.depth();
    Ok((Box::new(pipeline), depth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestKind;
    use crate::impls::MemoryEventSink;
    use crate::typed::{ErasedNext, ErasedResponse, RuleValidator};
    use async_trait::async_trait;
    use serde::Serialize;
    use std::sync::Mutex;

    #[derive(Debug, Serialize)]
    struct Store {
        key: String,
    }

    impl Request for Store {
        type Response = ();
        const NAME: &'static str = "test.store.v1";
        const KIND: RequestKind = RequestKind::Command;
    }

    #[derive(Debug, Serialize)]
    struct Fetch;

    impl Request for Fetch {
        type Response = u8;
        const NAME: &'static str = "test.fetch.v1";
        const KIND: RequestKind = RequestKind::Query;
    }

    struct StoreHandler;

    #[async_trait]
    impl RequestHandler<Store> for StoreHandler {
        async fn handle(&self, _request: Store, _ctx: &DispatchContext) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    struct FetchHandler;

    #[async_trait]
    impl RequestHandler<Fetch> for FetchHandler {
        async fn handle(&self, _request: Fetch, _ctx: &DispatchContext) -> Result<u8, DispatchError> {
            Ok(7)
        }
    }

    /// Journals every request type it wraps; optionally commands only.
    struct Tally {
        commands_only: bool,
        seen: Mutex<Vec<&'static str>>,
    }

    impl Tally {
        fn new(commands_only: bool) -> Arc<Self> {
            Arc::new(Self {
                commands_only,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GlobalBehavior for Tally {
        fn applies_to(&self, request: &RequestDescriptor) -> bool {
            !self.commands_only || request.kind.is_validatable()
        }

        async fn handle(
            &self,
            request: &RequestDescriptor,
            _ctx: &DispatchContext,
            next: ErasedNext<'_>,
        ) -> Result<ErasedResponse, DispatchError> {
            self.seen.lock().unwrap().push(request.name);
            next.run().await
        }
    }

    struct Fixture {
        registry: HandlerRegistry,
        validators: ValidatorSet,
        extras: ExtraBehaviors,
        globals: HashMap<String, Arc<dyn GlobalBehavior>>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = HandlerRegistry::new();
            registry.register::<Store, _>(StoreHandler).unwrap();
            registry.register::<Fetch, _>(FetchHandler).unwrap();

            let mut validators = ValidatorSet::new();
            validators.register::<Store, _>(RuleValidator::new().rule("key", "Key is required", |s: &Store| {
                !s.key.is_empty()
            }));

            Self {
                registry,
                validators,
                extras: ExtraBehaviors::default(),
                globals: HashMap::new(),
            }
        }

        fn composer<'a>(&'a self, order: &'a [BehaviorKind]) -> Composer<'a> {
            Composer {
                registry: &self.registry,
                validators: &self.validators,
                extras: &self.extras,
                order,
                logging: Arc::new(LoggingBehavior::new(Arc::new(MemoryEventSink::new()))),
                globals: &self.globals,
            }
        }
    }

    #[test]
    fn commands_get_validation_queries_do_not() {
        let fixture = Fixture::new();
        let order = [BehaviorKind::Logging, BehaviorKind::Validation];
        let composer = fixture.composer(&order);

        assert_eq!(composer.compose::<Store>().unwrap().depth(), 2);
        assert_eq!(composer.compose::<Fetch>().unwrap().depth(), 1);
    }

    #[test]
    fn empty_order_means_direct_handler_call() {
        let fixture = Fixture::new();
        let composer = fixture.composer(&[]);
        assert_eq!(composer.compose::<Store>().unwrap().depth(), 0);
    }

    #[tokio::test]
    async fn composed_command_pipeline_validates() {
        let fixture = Fixture::new();
        let order = [BehaviorKind::Validation];
        let pipeline = fixture.composer(&order).compose::<Store>().unwrap();

        let err = pipeline
            .execute(Store { key: String::new() }, &DispatchContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::domain::FailureKind::ValidationFailed);

        let ok = pipeline
            .execute(Store { key: "k".to_string() }, &DispatchContext::new())
            .await;
        assert_eq!(ok, Ok(()));
    }

    #[test]
    fn extras_append_innermost_for_their_type_only() {
        let mut fixture = Fixture::new();
        fixture
            .extras
            .push::<Fetch>(Arc::new(LoggingBehavior::new(Arc::new(MemoryEventSink::new()))));

        let order = [BehaviorKind::Logging];
        let composer = fixture.composer(&order);
        assert_eq!(composer.compose::<Fetch>().unwrap().depth(), 2);
        assert_eq!(composer.compose::<Store>().unwrap().depth(), 1);
        assert_eq!(fixture.extras.request_types()[0].name, "test.fetch.v1");
    }

    #[test]
    fn assemble_erases_to_the_typed_pipeline() {
        let fixture = Fixture::new();
        let order = [BehaviorKind::Logging, BehaviorKind::Validation];

        let (erased, depth) = assemble::<Store>(&fixture.composer(&order)).unwrap();
        assert_eq!(depth, 2);
        assert!(erased.downcast_ref::<Pipeline<Store>>().is_some());
        assert!(erased.downcast_ref::<Pipeline<Fetch>>().is_none());
    }

    #[tokio::test]
    async fn named_slot_wraps_every_type_it_applies_to() {
        let mut fixture = Fixture::new();
        let tally = Tally::new(false);
        fixture.globals.insert("tally".to_string(), tally.clone());

        let order = [BehaviorKind::named("tally"), BehaviorKind::Logging, BehaviorKind::Validation];
        let composer = fixture.composer(&order);
        let store = composer.compose::<Store>().unwrap();
        let fetch = composer.compose::<Fetch>().unwrap();
        assert_eq!(store.depth(), 3);
        assert_eq!(fetch.depth(), 2);

        let ctx = DispatchContext::new();
        store.execute(Store { key: "k".to_string() }, &ctx).await.unwrap();
        assert_eq!(fetch.execute(Fetch, &ctx).await, Ok(7));
        assert_eq!(*tally.seen.lock().unwrap(), vec!["test.store.v1", "test.fetch.v1"]);
    }

    #[test]
    fn named_slot_respects_applicability() {
        let mut fixture = Fixture::new();
        fixture.globals.insert("tally".to_string(), Tally::new(true));

        let order = [BehaviorKind::named("tally")];
        let composer = fixture.composer(&order);
        assert_eq!(composer.compose::<Store>().unwrap().depth(), 1);
        assert_eq!(composer.compose::<Fetch>().unwrap().depth(), 0);
    }
}
