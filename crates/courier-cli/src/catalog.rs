//! Catalog - デモ用の商品カタログサービス
//!
//! コアの上に載る「薄い接着剤」層です。
//! コマンド・クエリ・Validator・Handler と開発用のシードデータだけを持ちます。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use courier_core::domain::{Id, IdMarker};
use courier_core::ports::{Document, DocumentSession, IdGenerator, Page, StoreError};
use courier_core::typed::{RegistryError, RuleValidator};
use courier_core::{DispatchContext, DispatchError, MediatorBuilder, Request, RequestHandler, RequestKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductMarker {}

impl IdMarker for ProductMarker {
    fn prefix() -> &'static str {
        "product-"
    }
}

pub type ProductId = Id<ProductMarker>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: Vec<String>,
    pub description: String,
    pub image_file: String,
    pub price: f64,
}

impl Document for Product {
    const COLLECTION: &'static str = "products";

    fn document_id(&self) -> String {
        self.id.clone()
    }
}

// ---------------------------------------------------------------------------
// requests

#[derive(Debug, Clone, Serialize)]
pub struct CreateProduct {
    pub name: String,
    pub category: Vec<String>,
    pub description: String,
    pub image_file: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateProductResult {
    pub id: String,
}

impl Request for CreateProduct {
    type Response = CreateProductResult;
    const NAME: &'static str = "catalog.product.create.v1";
    const KIND: RequestKind = RequestKind::Command;
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteProduct {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteProductResult {
    pub is_success: bool,
}

impl Request for DeleteProduct {
    type Response = DeleteProductResult;
    const NAME: &'static str = "catalog.product.delete.v1";
    const KIND: RequestKind = RequestKind::Command;
}

/// Paged listing, optionally narrowed to one category.
#[derive(Debug, Clone, Serialize)]
pub struct GetProducts {
    pub page: Page,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetProductsResult {
    pub products: Vec<Product>,
}

impl Request for GetProducts {
    type Response = GetProductsResult;
    const NAME: &'static str = "catalog.product.list.v1";
    const KIND: RequestKind = RequestKind::Query;
}

#[derive(Debug, Clone, Serialize)]
pub struct GetProductById {
    pub id: String,
}

impl Request for GetProductById {
    type Response = Product;
    const NAME: &'static str = "catalog.product.get.v1";
    const KIND: RequestKind = RequestKind::Query;
}

// ---------------------------------------------------------------------------
// validators

pub fn create_product_validator() -> RuleValidator<CreateProduct> {
    RuleValidator::new()
        .rule("name", "Name is required", |c: &CreateProduct| !c.name.trim().is_empty())
        .rule("category", "Category is required", |c: &CreateProduct| !c.category.is_empty())
        .rule("image_file", "ImageFile is required", |c: &CreateProduct| {
            !c.image_file.trim().is_empty()
        })
        .rule("price", "Price must be greater than 0", |c: &CreateProduct| c.price > 0.0)
}

pub fn delete_product_validator() -> RuleValidator<DeleteProduct> {
    RuleValidator::new().rule("id", "Product ID is required", |c: &DeleteProduct| !c.id.trim().is_empty())
}

// ---------------------------------------------------------------------------
// handlers

pub struct CreateProductHandler {
    session: DocumentSession,
    ids: Arc<dyn IdGenerator>,
}

#[async_trait]
impl RequestHandler<CreateProduct> for CreateProductHandler {
    async fn handle(&self, command: CreateProduct, _ctx: &DispatchContext) -> Result<CreateProductResult, DispatchError> {
        let product = Product {
            id: ProductId::generate(self.ids.as_ref()).to_string(),
            name: command.name,
            category: command.category,
            description: command.description,
            image_file: command.image_file,
            price: command.price,
        };
        self.session.store(&product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(CreateProductResult { id: product.id })
    }
}

pub struct DeleteProductHandler {
    session: DocumentSession,
}

#[async_trait]
impl RequestHandler<DeleteProduct> for DeleteProductHandler {
    async fn handle(&self, command: DeleteProduct, _ctx: &DispatchContext) -> Result<DeleteProductResult, DispatchError> {
        let removed = self.session.delete::<Product>(&command.id).await?;
        if !removed {
            tracing::debug!(product_id = %command.id, "delete of unknown product");
        }
        Ok(DeleteProductResult { is_success: true })
    }
}

pub struct GetProductsHandler {
    session: DocumentSession,
}

#[async_trait]
impl RequestHandler<GetProducts> for GetProductsHandler {
    async fn handle(&self, query: GetProducts, _ctx: &DispatchContext) -> Result<GetProductsResult, DispatchError> {
        let category = query.category;
        let products = self
            .session
            .query_page(
                |p: &Product| {
                    category
                        .as_deref()
                        .is_none_or(|wanted| p.category.iter().any(|c| c.eq_ignore_ascii_case(wanted)))
                },
                query.page,
            )
            .await?;
        Ok(GetProductsResult { products })
    }
}

pub struct GetProductByIdHandler {
    session: DocumentSession,
}

#[async_trait]
impl RequestHandler<GetProductById> for GetProductByIdHandler {
    async fn handle(&self, query: GetProductById, _ctx: &DispatchContext) -> Result<Product, DispatchError> {
        self.session
            .load::<Product>(&query.id)
            .await?
            .ok_or_else(|| DispatchError::not_found("Product", &query.id))
    }
}

/// Registers every catalog handler and validator, and declares them expected.
pub fn register(
    builder: MediatorBuilder,
    session: DocumentSession,
    ids: Arc<dyn IdGenerator>,
) -> Result<MediatorBuilder, RegistryError> {
    Ok(builder
        .register_handler::<CreateProduct, _>(CreateProductHandler {
            session: session.clone(),
            ids,
        })?
        .register_handler::<DeleteProduct, _>(DeleteProductHandler {
            session: session.clone(),
        })?
        .register_handler::<GetProducts, _>(GetProductsHandler {
            session: session.clone(),
        })?
        .register_handler::<GetProductById, _>(GetProductByIdHandler { session })?
        .register_validator::<CreateProduct, _>(create_product_validator())
        .register_validator::<DeleteProduct, _>(delete_product_validator())
        .expect::<CreateProduct>()
        .expect::<DeleteProduct>()
        .expect::<GetProducts>()
        .expect::<GetProductById>())
}

/// 開発用のシードデータ（コレクションが空のときだけ投入）
pub async fn seed(session: &DocumentSession, ids: &dyn IdGenerator) -> Result<usize, StoreError> {
    if !session.query::<Product, _>(|_| true).await?.is_empty() {
        return Ok(0);
    }

    let samples = [
        ("IPhone X", "Smart Phone", "iphonex.png", 950.0),
        ("Samsung 10", "Smart Phone", "samsung10.png", 840.0),
        ("Huawei Plus", "White Appliances", "huaweiplus.png", 650.0),
        ("Xiaomi Mi 9", "White Appliances", "xiaomimi9.png", 470.0),
        ("HTC U11+ Plus", "Smart Phone", "htcu11plus.png", 380.0),
        ("LG G7 ThinQ", "Home Kitchen", "lgg7thinq.png", 240.0),
        ("Panasonic Lumix", "Camera", "panasoniclumix.png", 240.0),
    ];

    for (name, category, image_file, price) in samples {
        session
            .store(&Product {
                id: ProductId::generate(ids).to_string(),
                name: name.to_string(),
                category: vec![category.to_string()],
                description: format!("{name} sample product"),
                image_file: image_file.to_string(),
                price,
            })
            .await?;
    }
    tracing::info!(count = samples.len(), "catalog seeded");
    Ok(samples.len())
}
