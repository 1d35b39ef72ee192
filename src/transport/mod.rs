//! Transport Module
//!
//! Moves an encoded `HttpRequest` to the service and hands back the status
//! and a streaming body. Everything protocol-specific stays in `protocol`.
//!
//! ## Implementations
//! - `HttpTransport`: blocking HTTP via reqwest
//! - `LoopbackTransport`: in-process reference engine for tests and demos

mod http;
mod loopback;

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::{HttpRequest, HttpResponse};

pub use http::HttpTransport;
pub use loopback::{Fault, LoopbackTransport, MemoryEngine};

/// A request/response exchange with the service
///
/// Implementations enforce `request.timeouts` and report a missed deadline
/// as `RochefortError::Timeout`. Non-2xx statuses are returned as responses,
/// not errors.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}
