//! MediatorBuilder - Mediator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::app::config::{BehaviorKind, MediatorConfig};
use crate::app::mediator::Mediator;
use crate::app::pipeline::{assemble, AssembleFn, Composer, ExtraBehaviors};
use crate::behaviors::LoggingBehavior;
use crate::domain::{DispatchError, Request, RequestDescriptor};
use crate::impls::TracingEventSink;
use crate::ports::EventSink;
use crate::typed::{
    GlobalBehavior, HandlerRegistry, PipelineBehavior, RegistryError, RequestHandler, Validator, ValidatorSet,
};

/// MediatorBuilder は Mediator を構築
///
/// # 使用例
/// ```ignore
/// let mediator = MediatorBuilder::new()
///     .config(MediatorConfig::with_pipeline([BehaviorKind::Logging, BehaviorKind::Validation]))
///     .register_handler::<CreateProduct, _>(CreateProductHandler::new(session))?
///     .register_validator::<CreateProduct, _>(CreateProductValidator)
///     .expect::<CreateProduct>()
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - `expect::<R>()` で Handler が必須のリクエスト型を宣言
/// - Handler のない型への Validator / behavior 登録も build() で検出
/// - パイプラインの名前付きスロットと GlobalBehavior の登録は 1 対 1
/// - build() 時に全リクエスト型のパイプラインを組み立てる
pub struct MediatorBuilder {
    registry: HandlerRegistry,
    assemblers: Vec<(RequestDescriptor, AssembleFn)>,
    validators: ValidatorSet,
    extras: ExtraBehaviors,
    globals: Vec<(String, Arc<dyn GlobalBehavior>)>,
    config: MediatorConfig,
    sink: Arc<dyn EventSink>,
    expected: Vec<RequestDescriptor>,
}

/// BuildError は Mediator 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing handlers for request types: {0:?}. These requests were expected but not registered.")]
    MissingHandlers(Vec<&'static str>),

    #[error("Validators registered for request types without a handler: {0:?}")]
    ValidatorsWithoutHandler(Vec<&'static str>),

    #[error("Behaviors registered for request types without a handler: {0:?}")]
    BehaviorsWithoutHandler(Vec<&'static str>),

    #[error("Behavior '{0}' appears more than once in the pipeline")]
    DuplicateBehavior(BehaviorKind),

    #[error("'{0}' is a built-in behavior and cannot name a global behavior")]
    ReservedBehaviorName(String),

    #[error("Pipeline slot '{0}' names no registered global behavior")]
    UnknownBehavior(String),

    #[error("Global behavior '{0}' has no slot in the pipeline")]
    UnplacedBehavior(String),

    #[error("Failed to compose pipeline for {request_type}: {source}")]
    Compose {
        request_type: &'static str,
        #[source]
        source: DispatchError,
    },
}

impl MediatorBuilder {
    /// 新しい MediatorBuilder を作成（behavior なし、イベントは tracing へ）
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            assemblers: Vec::new(),
            validators: ValidatorSet::new(),
            extras: ExtraBehaviors::default(),
            globals: Vec::new(),
            config: MediatorConfig::default(),
            sink: Arc::new(TracingEventSink),
            expected: Vec::new(),
        }
    }

    /// 設定を丸ごと差し替える
    ///
    /// それまでに置いたスロット（GlobalBehavior の分も含む）は消えるので、
    /// 登録済みの GlobalBehavior は新しい設定の `pipeline` に名前で並べます。
    pub fn config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// 組み込み behavior を末尾（内側）に追加
    ///
    /// 呼び出し順 = 外側から内側への順です。
    pub fn register_behavior(mut self, kind: BehaviorKind) -> Self {
        self.config.pipeline.push(kind);
        self
    }

    /// 全リクエスト型に適用する behavior を `name` で登録し、末尾（内側）にスロットを置く
    ///
    /// 適用範囲は `GlobalBehavior::applies_to` で絞れます。
    /// 設定ファイルの `pipeline` では同じ名前で位置を指定します。
    pub fn register_global_behavior<B: GlobalBehavior + 'static>(
        mut self,
        name: impl Into<String>,
        behavior: B,
    ) -> Self {
        let name = name.into();
        self.config.pipeline.push(BehaviorKind::named(name.clone()));
        self.globals.push((name, Arc::new(behavior)));
        self
    }

    /// LoggingBehavior の出力先
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Handler を登録
    ///
    /// 1 つのリクエスト型に 2 つ目の Handler を登録すると `AmbiguousHandler` です。
    pub fn register_handler<R: Request, H: RequestHandler<R> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<R, H>(handler)?;
        self.assemblers.push((RequestDescriptor::of::<R>(), assemble::<R> as AssembleFn));
        Ok(self)
    }

    /// Validator を登録（登録順に失敗が並ぶ）
    pub fn register_validator<R: Request, V: Validator<R> + 'static>(mut self, validator: V) -> Self {
        self.validators.register::<R, V>(validator);
        self
    }

    /// R 専用の behavior を組み込み behavior の内側に追加
    pub fn wrap<R: Request, B: PipelineBehavior<R> + 'static>(mut self, behavior: B) -> Self {
        self.extras.push::<R>(Arc::new(behavior));
        self
    }

    /// R の Handler が build() までに登録されていることを要求
    pub fn expect<R: Request>(mut self) -> Self {
        self.expected.push(RequestDescriptor::of::<R>());
        self
    }

    /// MediatorBuilder を構築して Mediator を生成
    ///
    /// # 検証
    /// - パイプライン設定に同じ behavior が 2 回現れない
    /// - 名前付きスロットと GlobalBehavior が過不足なく対応する
    /// - expect された型すべてに Handler がある
    /// - Validator / behavior の登録先すべてに Handler がある
    pub fn build(self) -> Result<Mediator, BuildError> {
        let globals = self.global_behaviors()?;

        let mut seen = HashSet::new();
        for kind in &self.config.pipeline {
            if !seen.insert(kind) {
                return Err(BuildError::DuplicateBehavior(kind.clone()));
            }
            if let BehaviorKind::Named(name) = kind {
                if !globals.contains_key(name) {
                    return Err(BuildError::UnknownBehavior(name.clone()));
                }
            }
        }
        for (name, _) in &self.globals {
            if !seen.contains(&BehaviorKind::named(name.clone())) {
                return Err(BuildError::UnplacedBehavior(name.clone()));
            }
        }

        let missing = self.unhandled(self.expected.iter().copied());
        if !missing.is_empty() {
            return Err(BuildError::MissingHandlers(missing));
        }

        let orphans = self.unhandled(self.validators.request_types());
        if !orphans.is_empty() {
            return Err(BuildError::ValidatorsWithoutHandler(orphans));
        }

        let orphans = self.unhandled(self.extras.request_types());
        if !orphans.is_empty() {
            return Err(BuildError::BehaviorsWithoutHandler(orphans));
        }

        if self.config.pipeline.contains(&BehaviorKind::Validation) {
            for descriptor in self.validators.request_types() {
                if !descriptor.kind.is_validatable() {
                    tracing::warn!(
                        request_type = descriptor.name,
                        "validators registered for a query are never run"
                    );
                }
            }
        }

        let composer = Composer {
            registry: &self.registry,
            validators: &self.validators,
            extras: &self.extras,
            order: &self.config.pipeline,
            logging: Arc::new(LoggingBehavior::new(self.sink.clone())),
            globals: &globals,
        };

        let mut mediator = Mediator::new(self.config.dispatch_timeout());
        for (descriptor, assemble) in &self.assemblers {
            let (pipeline, depth) = assemble(&composer).map_err(|source| BuildError::Compose {
                request_type: descriptor.name,
                source,
            })?;
            tracing::debug!(request = %descriptor, behaviors = depth, "pipeline composed");
            mediator.insert(*descriptor, pipeline);
        }

        tracing::info!(
            request_types = mediator.request_types().len(),
            pipeline = ?self.config.pipeline,
            "mediator ready"
        );
        Ok(mediator)
    }

    /// Registered global behaviors by name, rejecting built-in and repeated names.
    fn global_behaviors(&self) -> Result<HashMap<String, Arc<dyn GlobalBehavior>>, BuildError> {
        let mut globals = HashMap::new();
        for (name, behavior) in &self.globals {
            if BehaviorKind::named(name.clone()).is_built_in() {
                return Err(BuildError::ReservedBehaviorName(name.clone()));
            }
            if globals.insert(name.clone(), behavior.clone()).is_some() {
                return Err(BuildError::DuplicateBehavior(BehaviorKind::Named(name.clone())));
            }
        }
        Ok(globals)
    }

    /// Names of the given request types that have no handler, deduplicated.
    fn unhandled(&self, descriptors: impl IntoIterator<Item = RequestDescriptor>) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = descriptors
            .into_iter()
            .filter(|descriptor| !self.registry.contains(descriptor.type_id))
            .map(|descriptor| descriptor.name)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
