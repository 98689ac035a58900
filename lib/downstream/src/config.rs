//! Client configuration types.

use std::time::Duration;

/// Default per-call timeout when neither the builder nor the call sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration shared read-only by all requests made through one client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    forwarded_headers: Vec<String>,
    log_forwarded_header_values: bool,
    default_timeout: Duration,
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Names of inbound headers forwarded to downstream services, in the
    /// order they were configured.
    #[must_use]
    pub fn forwarded_headers(&self) -> &[String] {
        &self.forwarded_headers
    }

    /// Whether forwarded header values appear in log events. When `false`
    /// the headers are still forwarded, only the log rendering is suppressed.
    #[must_use]
    pub const fn log_forwarded_header_values(&self) -> bool {
        self.log_forwarded_header_values
    }

    /// Timeout applied to calls that specify neither a timeout nor a
    /// cancellation token.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            forwarded_headers: Vec::new(),
            log_forwarded_header_values: true,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    forwarded_headers: Vec<String>,
    log_forwarded_header_values: Option<bool>,
    default_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Add a header name to forward from the inbound call; duplicates are
    /// ignored, insertion order is kept.
    #[must_use]
    pub fn add_forwarded_header(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.forwarded_headers.contains(&name) {
            self.forwarded_headers.push(name);
        }
        self
    }

    /// Add several forwarded header names at once.
    #[must_use]
    pub fn forwarded_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self = self.add_forwarded_header(name);
        }
        self
    }

    /// Set whether forwarded header values appear in log events.
    #[must_use]
    pub const fn log_forwarded_header_values(mut self, log: bool) -> Self {
        self.log_forwarded_header_values = Some(log);
        self
    }

    /// Set the default per-call timeout.
    #[must_use]
    pub const fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            forwarded_headers: self.forwarded_headers,
            log_forwarded_header_values: self.log_forwarded_header_values.unwrap_or(true),
            default_timeout: self.default_timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}
