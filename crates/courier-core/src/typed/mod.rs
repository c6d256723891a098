//! Typed - 型付き dispatch API
//!
//! このモジュールはリクエスト型と Handler・Validator・Behavior の対応を
//! 型で保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `RequestHandler<R>`, `Validator<R>`, `PipelineBehavior<R>` - 型安全
//! - **全型共通**: `GlobalBehavior` - 応答を消去して全リクエスト型に差し込む
//! - **内部（Any）**: registry が `TypeId` をキーに型消去して保持し、取り出し時に downcast

pub mod behavior;
pub mod context;
pub mod global;
pub mod handler;
pub mod registry;
pub mod validator;

pub use self::behavior::{Next, PipelineBehavior};
pub use self::context::{CancellationHandle, DispatchContext};
pub use self::global::{ErasedNext, ErasedResponse, GlobalBehavior};
pub use self::handler::RequestHandler;
pub use self::registry::{HandlerRegistry, RegistryError};
pub use self::validator::{RuleValidator, Validator, ValidatorError, ValidatorSet};
