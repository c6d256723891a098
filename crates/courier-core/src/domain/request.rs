//! Request model: commands and queries.
//!
//! Every request type declares its response type, a stable name used in logs
//! and error messages, and whether it is a command or a query. The kind is the
//! capability tag the pipeline composer checks when deciding which behaviors
//! apply (validation runs for commands only).

use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;

/// Whether a request changes state or only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// State-changing request. May answer with `()` or a concrete value.
    Command,
    /// Read-only request. Always answers with a concrete value.
    Query,
}

impl RequestKind {
    /// Commands go through the validation stage, queries bypass it.
    pub fn is_validatable(self) -> bool {
        matches!(self, RequestKind::Command)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Command => f.write_str("command"),
            RequestKind::Query => f.write_str("query"),
        }
    }
}

/// A request routed to exactly one handler.
///
/// # Example
/// ```ignore
/// #[derive(Debug, Serialize)]
/// struct CreateProduct {
///     name: String,
///     price: f64,
/// }
///
/// impl Request for CreateProduct {
///     type Response = ProductId;
///     const NAME: &'static str = "catalog.product.create.v1";
///     const KIND: RequestKind = RequestKind::Command;
/// }
/// ```
///
/// `Serialize` lets the logging stage snapshot the request's fields; the
/// request itself is never mutated by any stage.
pub trait Request: Serialize + Send + Sync + 'static {
    type Response: Send + 'static;

    /// Stable name, `{namespace}.{entity}.{action}.v{major}` by convention.
    const NAME: &'static str;

    const KIND: RequestKind;

    fn descriptor() -> RequestDescriptor
    where
        Self: Sized,
    {
        RequestDescriptor::of::<Self>()
    }
}

/// Type-erased identity of a request type, as stored by the registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    pub type_id: TypeId,
    pub name: &'static str,
    pub kind: RequestKind,
}

impl RequestDescriptor {
    pub fn of<R: Request>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            name: R::NAME,
            kind: R::KIND,
        }
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}
