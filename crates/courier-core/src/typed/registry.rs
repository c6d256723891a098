//! HandlerRegistry - リクエスト型ごとに Handler を 1 つだけ登録・管理
//!
//! # 学習ポイント
//! - `TypeId` をキーにした HashMap での型消去された trait object の管理
//! - `dyn Any` からの downcast で型付きの `Arc<dyn RequestHandler<R>>` を取り出す
//! - 起動時に構築（mutable）、実行時は参照のみ（immutable）なのでロック不要
//!
//! 解決は純粋な map lookup です。継承的なフォールバックはありません。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::handler::RequestHandler;
use crate::domain::{DispatchError, Request, RequestDescriptor};

/// RegistryError は HandlerRegistry の登録エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("ambiguous handler: request type '{0}' already has a handler")]
    AmbiguousHandler(&'static str),
}

/// Type-erased registration: `Arc<dyn RequestHandler<R>>` behind `dyn Any`.
struct HandlerEntry {
    descriptor: RequestDescriptor,
    handler: Box<dyn Any + Send + Sync>,
}

/// HandlerRegistry は型付き Handler を登録・管理
///
/// # 使用例
/// ```ignore
/// let mut registry = HandlerRegistry::new();
/// registry.register::<CreateProduct, _>(CreateProductHandler::new(session))?;
///
/// let handler = registry.resolve::<CreateProduct>()?;
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TypeId, HandlerEntry>,
    /// 登録順（起動時ログと registered_types の順序を安定させる）
    order: Vec<TypeId>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let descriptor = RequestDescriptor::of::<R>();
        if self.handlers.contains_key(&descriptor.type_id) {
            return Err(RegistryError::AmbiguousHandler(descriptor.name));
        }
        let handler: Arc<dyn RequestHandler<R>> = Arc::new(handler);
        self.handlers.insert(
            descriptor.type_id,
            HandlerEntry {
                descriptor,
                handler: Box::new(handler),
            },
        );
        self.order.push(descriptor.type_id);
        Ok(())
    }

    pub fn resolve<R: Request>(&self) -> Result<Arc<dyn RequestHandler<R>>, DispatchError> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.handler.downcast_ref::<Arc<dyn RequestHandler<R>>>())
            .cloned()
            .ok_or(DispatchError::HandlerNotFound(R::NAME))
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.handlers.contains_key(&type_id)
    }

    /// Registered request types, in registration order.
    pub fn registered_types(&self) -> Vec<RequestDescriptor> {
        self.order
            .iter()
            .filter_map(|type_id| self.handlers.get(type_id))
            .map(|entry| entry.descriptor)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
