//! The REST client: URI resolution, the token-aware request pipeline, and
//! the public verb surface.
//!
//! Every verb funnels through one pipeline: resolve the absolute URL, attach
//! forwarded and explicit headers plus a bearer credential, send, replay
//! exactly once after a token refresh when the first response is 401, then
//! classify the outcome and log it.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

use downstream_core::{
    Envelope, Error, HttpClient, JsonSerializer, Method, Request, Response, Result, Serializer,
    serializer,
};

use crate::config::ClientConfig;
use crate::headers::{InboundHeaders, forwarded_snapshot, loggable_headers};
use crate::options::RequestOptions;
use crate::token::TokenCache;
use crate::transport::HyperTransport;

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";

/// Outbound REST client for one downstream service.
///
/// Cloning is cheap and shares the transport pool, the token cache, and the
/// configuration.
///
/// # Example
///
/// ```ignore
/// use downstream::{ClientConfig, RestClient};
///
/// let client = RestClient::builder()
///     .base_url("http://inventory.api")
///     .config(ClientConfig::builder().add_forwarded_header("X-Trace-Id").build())
///     .build()?;
///
/// let items = client.get::<Vec<Item>>("v1/items").await?;
/// ```
#[derive(Clone)]
pub struct RestClient {
    transport: HyperTransport,
    base_url: Option<Url>,
    config: Arc<ClientConfig>,
    tokens: Arc<TokenCache>,
    inbound: Option<Arc<dyn InboundHeaders>>,
    serializer: Arc<dyn Serializer>,
    bearer: Option<String>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::default()
    }

    /// The shared transport.
    #[must_use]
    pub fn transport(&self) -> &HyperTransport {
        &self.transport
    }

    /// The token cache this client consults.
    #[must_use]
    pub fn token_cache(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Pre-seed a bearer credential; token acquisition is skipped while one
    /// is set (a 401 still forces a refresh attempt).
    pub fn set_bearer_token(&mut self, token: impl Into<String>) {
        self.bearer = Some(token.into());
    }

    // ========================================================================
    // Verb surface
    // ========================================================================

    /// Execute a GET request and deserialize the result to `T`.
    pub async fn get<T: DeserializeOwned>(&self, uri: &str) -> Result<Envelope<T>> {
        self.get_with(uri, RequestOptions::default()).await
    }

    /// Execute a GET request with per-call options.
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        uri: &str,
        options: RequestOptions,
    ) -> Result<Envelope<T>> {
        self.request(Method::Get, uri, None, options).await
    }

    /// Execute a POST request with a JSON body and deserialize the result.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        uri: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        self.post_with(uri, body, RequestOptions::default()).await
    }

    /// Execute a POST request with a JSON body and per-call options.
    pub async fn post_with<B: Serialize, T: DeserializeOwned>(
        &self,
        uri: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Envelope<T>> {
        let body = serializer::serialize(self.call_serializer(&options), body)?;
        self.request(Method::Post, uri, Some(body), options).await
    }

    /// Execute a POST request with a JSON body, discarding the result.
    pub async fn post_unit<B: Serialize>(&self, uri: &str, body: &B) -> Result<()> {
        self.post_unit_with(uri, body, RequestOptions::default())
            .await
    }

    /// Execute a POST request with a JSON body and per-call options,
    /// discarding the result.
    pub async fn post_unit_with<B: Serialize>(
        &self,
        uri: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<()> {
        let body = serializer::serialize(self.call_serializer(&options), body)?;
        self.request_unit(Method::Post, uri, Some(body), options)
            .await
    }

    /// Execute a PUT request with a JSON body and deserialize the result.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        uri: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        self.put_with(uri, body, RequestOptions::default()).await
    }

    /// Execute a PUT request with a JSON body and per-call options.
    pub async fn put_with<B: Serialize, T: DeserializeOwned>(
        &self,
        uri: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Envelope<T>> {
        let body = serializer::serialize(self.call_serializer(&options), body)?;
        self.request(Method::Put, uri, Some(body), options).await
    }

    /// Execute a PUT request with a JSON body, discarding the result.
    pub async fn put_unit<B: Serialize>(&self, uri: &str, body: &B) -> Result<()> {
        self.put_unit_with(uri, body, RequestOptions::default())
            .await
    }

    /// Execute a PUT request with a JSON body and per-call options,
    /// discarding the result.
    pub async fn put_unit_with<B: Serialize>(
        &self,
        uri: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<()> {
        let body = serializer::serialize(self.call_serializer(&options), body)?;
        self.request_unit(Method::Put, uri, Some(body), options)
            .await
    }

    /// Execute a PATCH request with a JSON body and deserialize the result.
    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        uri: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        self.patch_with(uri, body, RequestOptions::default()).await
    }

    /// Execute a PATCH request with a JSON body and per-call options.
    pub async fn patch_with<B: Serialize, T: DeserializeOwned>(
        &self,
        uri: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Envelope<T>> {
        let body = serializer::serialize(self.call_serializer(&options), body)?;
        self.request(Method::Patch, uri, Some(body), options).await
    }

    /// Execute a PATCH request with a JSON body, discarding the result.
    pub async fn patch_unit<B: Serialize>(&self, uri: &str, body: &B) -> Result<()> {
        self.patch_unit_with(uri, body, RequestOptions::default())
            .await
    }

    /// Execute a PATCH request with a JSON body and per-call options,
    /// discarding the result.
    pub async fn patch_unit_with<B: Serialize>(
        &self,
        uri: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<()> {
        let body = serializer::serialize(self.call_serializer(&options), body)?;
        self.request_unit(Method::Patch, uri, Some(body), options)
            .await
    }

    /// Execute a DELETE request and deserialize the result to `T`.
    pub async fn delete<T: DeserializeOwned>(&self, uri: &str) -> Result<Envelope<T>> {
        self.delete_with(uri, RequestOptions::default()).await
    }

    /// Execute a DELETE request with per-call options.
    pub async fn delete_with<T: DeserializeOwned>(
        &self,
        uri: &str,
        options: RequestOptions,
    ) -> Result<Envelope<T>> {
        self.request(Method::Delete, uri, None, options).await
    }

    /// Execute a DELETE request, discarding the result.
    pub async fn delete_unit(&self, uri: &str) -> Result<()> {
        self.delete_unit_with(uri, RequestOptions::default()).await
    }

    /// Execute a DELETE request with per-call options, discarding the result.
    pub async fn delete_unit_with(&self, uri: &str, options: RequestOptions) -> Result<()> {
        self.request_unit(Method::Delete, uri, None, options).await
    }

    /// Execute a DELETE request with a JSON body, discarding the result.
    pub async fn delete_body_unit<B: Serialize>(&self, uri: &str, body: &B) -> Result<()> {
        self.delete_body_unit_with(uri, body, RequestOptions::default())
            .await
    }

    /// Execute a DELETE request with a JSON body and per-call options,
    /// discarding the result.
    pub async fn delete_body_unit_with<B: Serialize>(
        &self,
        uri: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<()> {
        let body = serializer::serialize(self.call_serializer(&options), body)?;
        self.request_unit(Method::Delete, uri, Some(body), options)
            .await
    }

    // ========================================================================
    // Request pipeline
    // ========================================================================

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<Envelope<T>> {
        let response = self.dispatch(method, uri, body, &options).await?;
        let result = serializer::deserialize(self.call_serializer(&options), response.body())?;
        Ok(Envelope::new(response, result))
    }

    async fn request_unit(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<()> {
        self.dispatch(method, uri, body, &options).await.map(|_| ())
    }

    /// Execute one logical call: start log, send with at most one
    /// refresh-retry, classify, end/error log.
    async fn dispatch(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        options: &RequestOptions,
    ) -> Result<Response> {
        let url = self.resolve_url(uri)?;
        let forwarded = forwarded_snapshot(&self.config, self.inbound.as_deref());
        let log_headers = loggable_headers(&self.config, &forwarded);

        info!(
            method = %method,
            url = %url,
            forwarded_headers = ?log_headers,
            "start downstream request"
        );
        let start = Instant::now();
        let deadline = Deadline::new(options, self.config.default_timeout());

        let outcome = self
            .send_with_refresh(method, &url, &forwarded, body.as_deref(), options, &deadline)
            .await;
        let elapsed_ms = elapsed_ms(start);
        let request_body = body.as_deref().unwrap_or("");

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                error!(
                    method = %method,
                    url = %url,
                    forwarded_headers = ?log_headers,
                    elapsed_ms,
                    request_body,
                    error = %e,
                    "downstream request failed with exception"
                );
                // Transport failures are re-raised unchanged.
                return Err(e);
            }
        };

        if !response.is_success() {
            let status = response.status();
            error!(
                method = %method,
                url = %url,
                forwarded_headers = ?log_headers,
                status,
                elapsed_ms,
                request_body,
                response_body = response.body(),
                "downstream request failed"
            );
            let message = format!(
                "downstream request failed with status code {status} at {elapsed_ms} ms. \
                 Request body: {request_body}. Response body: {}.",
                response.body()
            );
            return Err(Error::response(status, message, response.into_body()));
        }

        info!(
            method = %method,
            url = %url,
            forwarded_headers = ?log_headers,
            status = response.status(),
            elapsed_ms,
            "downstream request finished"
        );
        Ok(response)
    }

    /// Send once; on 401, force a token refresh, rebuild the request, and
    /// send exactly once more.
    async fn send_with_refresh(
        &self,
        method: Method,
        url: &Url,
        forwarded: &[(String, String)],
        body: Option<&str>,
        options: &RequestOptions,
        deadline: &Deadline,
    ) -> Result<Response> {
        let preset = options
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION));
        let mut credential = if preset {
            None
        } else if let Some(bearer) = &self.bearer {
            Some(bearer.clone())
        } else {
            self.tokens.get(&self.transport, false).await?
        };

        let response = deadline
            .run(self.send_once(method, url, forwarded, body, options, credential.as_deref()))
            .await?;
        if response.status() != http::StatusCode::UNAUTHORIZED.as_u16() {
            return Ok(response);
        }

        // A sent request cannot be replayed in place; rebuild it with the
        // refreshed credential. No further retries after the second send.
        if let Some(refreshed) = self.tokens.get(&self.transport, true).await? {
            credential = Some(refreshed);
        }
        deadline
            .run(self.send_once(method, url, forwarded, body, options, credential.as_deref()))
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        forwarded: &[(String, String)],
        body: Option<&str>,
        options: &RequestOptions,
        credential: Option<&str>,
    ) -> Result<Response> {
        let mut builder = Request::builder(method, url.clone());
        for (name, value) in &options.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        for (name, value) in forwarded {
            builder = builder.header_if_absent(name.clone(), value.clone());
        }
        if let Some(credential) = credential {
            builder = builder.header_if_absent(AUTHORIZATION, format!("Bearer {credential}"));
        }
        if let Some(body) = body {
            builder = builder
                .header_if_absent(CONTENT_TYPE, "application/json; charset=utf-8")
                .body(body);
        }

        self.transport.execute(builder.build()).await
    }

    /// Resolve a request URI against the configured base address.
    ///
    /// Absolute URIs pass through untouched; relative ones are joined onto
    /// the normalized base.
    fn resolve_url(&self, uri: &str) -> Result<Url> {
        match Url::parse(uri) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(uri).map_err(Error::from),
                None => Err(Error::invalid_request(format!(
                    "relative uri {uri:?} requires a base url"
                ))),
            },
            Err(e) => Err(e.into()),
        }
    }

    fn call_serializer<'a>(&'a self, options: &'a RequestOptions) -> &'a dyn Serializer {
        options
            .serializer
            .as_deref()
            .unwrap_or_else(|| self.serializer.as_ref())
    }
}

/// Per-call deadline: a wall-clock budget spanning both sends of a call, or
/// an externally-owned cancellation token.
enum Deadline {
    At(tokio::time::Instant),
    Token(CancellationToken),
}

impl Deadline {
    fn new(options: &RequestOptions, default_timeout: Duration) -> Self {
        if let Some(token) = &options.cancellation {
            return Self::Token(token.clone());
        }
        let timeout = options.timeout.unwrap_or(default_timeout);
        Self::At(tokio::time::Instant::now() + timeout)
    }

    async fn run<F>(&self, future: F) -> Result<Response>
    where
        F: Future<Output = Result<Response>>,
    {
        match self {
            Self::At(deadline) => tokio::time::timeout_at(*deadline, future)
                .await
                .map_err(|_| Error::Timeout)?,
            Self::Token(token) => tokio::select! {
                () = token.cancelled() => Err(Error::Cancelled),
                result = future => result,
            },
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`RestClient`].
#[derive(Default)]
pub struct RestClientBuilder {
    transport: Option<HyperTransport>,
    base_url: Option<String>,
    config: Option<ClientConfig>,
    tokens: Option<Arc<TokenCache>>,
    inbound: Option<Arc<dyn InboundHeaders>>,
    serializer: Option<Arc<dyn Serializer>>,
    bearer: Option<String>,
}

impl std::fmt::Debug for RestClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClientBuilder")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RestClientBuilder {
    /// Set the base address of the downstream service. Relative request URIs
    /// are resolved against it; a blank value fails at [`build`](Self::build).
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the client configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share a token cache between clients; by default each client gets its
    /// own empty cache with no refresh handler.
    #[must_use]
    pub fn token_cache(mut self, tokens: Arc<TokenCache>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Attach the inbound call's headers, enabling header forwarding and
    /// bearer pre-seeding from the inbound Authorization header.
    #[must_use]
    pub fn inbound_headers(mut self, inbound: Arc<dyn InboundHeaders>) -> Self {
        self.inbound = Some(inbound);
        self
    }

    /// Set the process-wide default serializer for this client.
    #[must_use]
    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Reuse an existing transport (and its connection pool).
    #[must_use]
    pub fn transport(mut self, transport: HyperTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Pre-seed a bearer credential explicitly.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the base URL is blank, or
    /// [`Error::InvalidUrl`] when it does not parse.
    pub fn build(self) -> Result<RestClient> {
        let base_url = match self.base_url {
            Some(raw) => {
                if raw.trim().is_empty() {
                    return Err(Error::configuration("the base uri is not set"));
                }
                Some(normalize_base_url(&raw)?)
            }
            None => None,
        };

        let inbound = self.inbound;
        let bearer = self.bearer.or_else(|| {
            inbound
                .as_ref()
                .and_then(|source| source.get(AUTHORIZATION))
                .and_then(|value| strip_bearer(&value))
        });

        Ok(RestClient {
            transport: self.transport.unwrap_or_default(),
            base_url,
            config: Arc::new(self.config.unwrap_or_default()),
            tokens: self.tokens.unwrap_or_default(),
            inbound,
            serializer: self
                .serializer
                .unwrap_or_else(|| Arc::new(JsonSerializer)),
            bearer,
        })
    }
}

/// Parse the base address and guarantee a trailing path separator so that
/// relative combination is unambiguous. Idempotent.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Extract the credential from a `Bearer <value>` authorization header.
fn strip_bearer(value: &str) -> Option<String> {
    let (scheme, token) = value.split_at_checked(6)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim_start();
    (!token.is_empty()).then(|| token.to_string())
}
