//! courier-core
//!
//! Core building blocks for in-process request dispatch.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（request, errors, ids, events）
//! - **ports**: 抽象化レイヤー（DocumentStore, EventSink, Clock, IdGenerator）
//! - **typed**: 型付き API（RequestHandler, Validator, PipelineBehavior, GlobalBehavior, HandlerRegistry, DispatchContext）
//! - **behaviors**: 組み込み behavior（ValidationBehavior, LoggingBehavior）
//! - **app**: アプリケーションロジック（config, builder, pipeline, mediator）
//! - **impls**: 実装（InMemoryDocumentStore, TracingEventSink など開発用）

pub mod domain;
pub mod ports;
pub mod typed;
pub mod behaviors;
pub mod app;
pub mod impls;

pub use app::{BehaviorKind, BuildError, Mediator, MediatorBuilder, MediatorConfig};
pub use domain::{DispatchError, Request, RequestKind, ValidationFailure};
pub use typed::{DispatchContext, GlobalBehavior, PipelineBehavior, RequestHandler, Validator};
