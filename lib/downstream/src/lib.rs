//! Outbound REST client for service-to-service calls.
//!
//! A [`RestClient`] wraps a pooled hyper transport and adds the pieces a
//! downstream call needs: JSON serialization, structured request logging,
//! forwarding of selected inbound headers, base-URL resolution, a per-call
//! deadline, and bearer authentication with a process-wide token cache.
//!
//! # Example
//!
//! ```ignore
//! use downstream::{ClientConfig, RestClient};
//!
//! #[derive(Debug, serde::Deserialize)]
//! pub struct Item {
//!     id: u64,
//!     name: String,
//! }
//!
//! let client = RestClient::builder()
//!     .base_url("http://inventory.api")
//!     .config(
//!         ClientConfig::builder()
//!             .add_forwarded_header("X-Trace-Id")
//!             .build(),
//!     )
//!     .build()?;
//!
//! let items = client.get::<Vec<Item>>("v1/items").await?;
//! ```

mod client;
mod config;
mod headers;
mod options;
mod token;
mod transport;

pub use client::{RestClient, RestClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_TIMEOUT};
pub use headers::InboundHeaders;
pub use options::RequestOptions;
pub use token::{TokenCache, TokenFuture, TokenHandler, TokenResponse};
pub use transport::HyperTransport;

// Re-export core types
pub use downstream_core::{
    Envelope, Error, HttpClient, JsonSerializer, Method, PrettyJsonSerializer, Request,
    RequestBuilder, Response, Result, Serializer,
};

// Re-export for handler signatures and deadline tokens
pub use tokio_util::sync::CancellationToken;
pub use url;
