//! The transport seam.
//!
//! [`HttpClient`] is the only interface the request pipeline needs from the
//! transport: send one already-built request, get back one buffered response.
//! The production implementation lives in the `downstream` crate; tests may
//! implement it with canned responses.

use std::future::Future;

use crate::{Request, Response, Result};

/// Low-level HTTP execution.
///
/// Implementations should be async-first and reuse connections across calls;
/// per-call timeouts belong to the caller, not the transport.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the buffered response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Invalid request construction
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}
