//! DocumentStore port - ハンドラが使うドキュメントストア
//!
//! コアはストアを実装しません。ハンドラが永続化に使う契約だけを定義します。
//!
//! # 二層構造
//! - **内部（Dyn）**: `DocumentStore` - object-safe, JSON ベース
//! - **表層（Typed）**: `DocumentSession` - `Document` 型で store/load/delete/query
//!
//! ストアの失敗は `StoreError` として返り、dispatch では UnexpectedFault になります。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::domain::DispatchError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document codec failed for collection={collection}: {source}")]
    Codec {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "document store call failed");
        DispatchError::unexpected(err)
    }
}

/// A persistable entity.
///
/// ```ignore
/// impl Document for Product {
///     const COLLECTION: &'static str = "products";
///
///     fn document_id(&self) -> String {
///         self.id.to_string()
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn document_id(&self) -> String;
}

/// Object-safe store keyed by `(collection, id)`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace.
    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Returns whether a document was removed.
    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// All documents of a collection, in id order.
    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
}

/// 1-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn new(number: usize, size: usize) -> Self {
        Self { number, size }
    }

    /// Page number or size 0 is treated as 1.
    fn bounds(&self) -> (usize, usize) {
        let size = self.size.max(1);
        let skip = (self.number.max(1) - 1).saturating_mul(size);
        (skip, size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 1, size: 10 }
    }
}

/// DocumentSession は DocumentStore を型付きで使うためのラッパー
///
/// # 使用例
/// ```ignore
/// let session = DocumentSession::new(store.clone());
/// session.store(&product).await?;
/// let cheap: Vec<Product> = session.query(|p: &Product| p.price < 10.0).await?;
/// ```
#[derive(Clone)]
pub struct DocumentSession {
    store: Arc<dyn DocumentStore>,
}

impl DocumentSession {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn store<D: Document>(&self, document: &D) -> Result<(), StoreError> {
        let value = serde_json::to_value(document).map_err(|source| StoreError::Codec {
            collection: D::COLLECTION,
            source,
        })?;
        self.store
            .put(D::COLLECTION, &document.document_id(), value)
            .await
    }

    pub async fn load<D: Document>(&self, id: &str) -> Result<Option<D>, StoreError> {
        match self.store.get(D::COLLECTION, id).await? {
            Some(value) => decode(value).map(Some),
            None => Ok(None),
        }
    }

    pub async fn delete<D: Document>(&self, id: &str) -> Result<bool, StoreError> {
        self.store.remove(D::COLLECTION, id).await
    }

    pub async fn query<D, P>(&self, predicate: P) -> Result<Vec<D>, StoreError>
    where
        D: Document,
        P: Fn(&D) -> bool + Send,
    {
        let mut matched = Vec::new();
        for value in self.store.scan(D::COLLECTION).await? {
            let document: D = decode(value)?;
            if predicate(&document) {
                matched.push(document);
            }
        }
        Ok(matched)
    }

    pub async fn query_page<D, P>(&self, predicate: P, page: Page) -> Result<Vec<D>, StoreError>
    where
        D: Document,
        P: Fn(&D) -> bool + Send,
    {
        let (skip, take) = page.bounds();
        let matched = self.query(predicate).await?;
        Ok(matched.into_iter().skip(skip).take(take).collect())
    }
}

fn decode<D: Document>(value: Value) -> Result<D, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Codec {
        collection: D::COLLECTION,
        source,
    })
}
