//! Per-call request options.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use downstream_core::Serializer;

/// Options applied to a single call: header overrides, a deadline, and an
/// optional serializer override.
///
/// Explicit headers always win over forwarded headers with the same name.
/// When both a timeout and a cancellation token are set, the token is used;
/// when neither is set, the client's default timeout applies. The deadline is
/// always scoped to the one call, never shared between calls.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) serializer: Option<Arc<dyn Serializer>>,
}

impl RequestOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header to set on the outgoing request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the call deadline as a duration from the start of the call.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the call deadline as an explicit cancellation token.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Override the serializer for this call only.
    #[must_use]
    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use downstream_core::PrettyJsonSerializer;

    #[test]
    fn options_accumulate() {
        let options = RequestOptions::new()
            .header("X-Trace-Id", "abc")
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(5))
            .serializer(Arc::new(PrettyJsonSerializer));

        assert_eq!(options.headers.len(), 2);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert!(options.cancellation.is_none());
        assert!(options.serializer.is_some());
    }
}
