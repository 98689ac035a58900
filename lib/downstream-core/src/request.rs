//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers and an
//! optional text body.
//!
//! # Example
//!
//! ```
//! use downstream_core::{Method, Request};
//!
//! let request = Request::builder(Method::Get, "https://api.example.com/items".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .build();
//! ```

use std::collections::HashMap;

use crate::Method;

/// An HTTP request with method, absolute URL, headers, and optional body text.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<String>,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Request body text.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HashMap<String, String>, Option<String>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<String>,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any existing value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets a header only if no header with that name is present yet.
    /// Names are compared case-insensitively.
    ///
    /// Forwarded headers use this so they never clobber an explicit
    /// per-call override.
    #[must_use]
    pub fn header_if_absent(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if !self.has_header(&name) {
            self.headers.insert(name, value.into());
        }
        self
    }

    /// Whether a header with the given name is already set.
    /// Names are compared case-insensitively.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .keys()
            .any(|existing| existing.eq_ignore_ascii_case(name))
    }

    /// Sets the request body text.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}
