//! HTTP transport implementation using hyper-util.
//!
//! One [`HyperTransport`] owns one connection pool and is shared by every
//! request a client issues; it is never rebuilt per call. Timeouts are the
//! caller's concern (see the request pipeline), so the transport itself sends
//! without a deadline.

use std::collections::HashMap;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};

use downstream_core::{Error, HttpClient, Request, Response, Result};

/// HTTP transport with connection pooling and rustls TLS.
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport with its own connection pool.
    #[must_use]
    pub fn new() -> Self {
        let inner = Client::builder(TokioExecutor::new()).build(https_connector());
        Self { inner }
    }

    /// Build a hyper request from a downstream request.
    fn build_hyper_request(request: Request) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = body.map_or_else(Full::default, |text| Full::new(Bytes::from(text)));
        builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for HyperTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let hyper_request = Self::build_hyper_request(request)?;

        let response = self
            .inner
            .request(hyper_request)
            .await
            .map_err(Self::map_hyper_error)?;

        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();
        let body = String::from_utf8_lossy(&body).into_owned();

        Ok(Response::new(status, headers, body))
    }
}

/// HTTPS connector with rustls, HTTP/1.1 and HTTP/2, Mozilla roots.
fn https_connector() -> HttpsConnector<HttpConnector> {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build()
}
