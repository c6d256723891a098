//! Domain model (requests, failures, ids, dispatch events).

pub mod errors;
pub mod events;
pub mod ids;
pub mod request;

pub use self::errors::{DispatchError, FailureKind, ValidationFailure, ValidationFailures};
pub use self::events::{DispatchEvent, DispatchOutcome};
pub use self::ids::{DispatchId, Id, IdMarker};
pub use self::request::{Request, RequestDescriptor, RequestKind};
