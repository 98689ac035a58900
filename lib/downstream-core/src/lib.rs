//! Core types for the downstream REST client.
//!
//! This crate provides the foundational types used by `downstream`:
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] and [`Envelope`] - HTTP response and result pairing
//! - [`Error`] and [`Result`] - Error handling
//! - [`Serializer`] - Pluggable body serialization strategy
//! - [`HttpClient`] - Transport trait for HTTP execution

mod client;
mod error;
mod method;
mod request;
mod response;
pub mod serializer;

pub use client::HttpClient;
pub use error::{Error, Result};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::{Envelope, Response};
pub use serializer::{JsonSerializer, PrettyJsonSerializer, Serializer};
