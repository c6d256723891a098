//! RequestHandler trait - リクエストを処理する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (`RequestHandler<R>`)
//! - Associated type による応答型の固定（`R::Response`）
//! - `Arc<dyn RequestHandler<R>>` を `dyn Any` に入れて型消去（registry 側）

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{DispatchError, Request};
use crate::typed::DispatchContext;

/// Handler は Request を処理して `R::Response` を返す
///
/// # 使用例
/// ```ignore
/// struct CreateProductHandler {
///     session: DocumentSession,
///     ids: Arc<dyn IdGenerator>,
/// }
///
/// #[async_trait]
/// impl RequestHandler<CreateProduct> for CreateProductHandler {
///     async fn handle(&self, command: CreateProduct, _ctx: &DispatchContext) -> Result<ProductId, DispatchError> {
///         let product = Product::from_command(ProductId::generate(&*self.ids), command);
///         self.session.store(&product).await?;
///         Ok(product.id)
///     }
/// }
/// ```
///
/// # 約束
/// - リクエストごとの状態は持たない（必要なものは引数で受け取る）
/// - ビジネスエラーは `DispatchError::DomainFault` で返す
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: R, ctx: &DispatchContext) -> Result<R::Response, DispatchError>;
}

#[async_trait]
impl<R, H> RequestHandler<R> for Arc<H>
where
    R: Request,
    H: RequestHandler<R> + ?Sized,
{
    async fn handle(&self, request: R, ctx: &DispatchContext) -> Result<R::Response, DispatchError> {
        (**self).handle(request, ctx).await
    }
}
