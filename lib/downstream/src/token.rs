//! Process-wide bearer token cache with single-flight refresh.
//!
//! Any number of concurrent calls may ask for a token; at most one refresh
//! request is in flight at a time. The refresh lock is held only around the
//! check-then-refresh critical section, never around an outer HTTP request.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::{error, info};

use downstream_core::{Error, Result};

use crate::transport::HyperTransport;

/// Successful result of a token refresh handler.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    /// The opaque bearer credential.
    pub access_token: String,
    /// Lifetime of the credential in seconds, as reported by the issuer.
    pub expires_in_secs: u64,
}

/// Future returned by a token refresh handler.
pub type TokenFuture = Pin<Box<dyn Future<Output = Result<TokenResponse>> + Send>>;

/// Async function that obtains a fresh token, e.g. via an OAuth2
/// client-credentials request over the shared transport.
pub type TokenHandler = Arc<dyn Fn(HyperTransport) -> TokenFuture + Send + Sync>;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Cached bearer token plus the registered refresh handler.
///
/// Shared by every executor in the process via `Arc`; see
/// [`crate::RestClientBuilder::token_cache`].
#[derive(Default)]
pub struct TokenCache {
    cached: RwLock<Option<CachedToken>>,
    handler: RwLock<Option<TokenHandler>>,
    // Serializes refreshes; concurrent callers park here while one refreshes.
    refresh: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache").finish_non_exhaustive()
    }
}

impl TokenCache {
    /// Create an empty cache with no handler registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the refresh handler; a previous handler is replaced.
    pub fn set_handler(&self, handler: TokenHandler) {
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Unregister the refresh handler; token acquisition becomes a no-op.
    pub fn reset_handler(&self) {
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Clear the cached token unconditionally.
    pub fn reset(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Get a usable token, refreshing it when needed.
    ///
    /// Returns `None` when no handler is registered. With `force_refresh`
    /// the handler is always invoked, which is how a 401 response demands a
    /// new credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] when the handler reports an explicit error.
    pub async fn get(
        &self,
        transport: &HyperTransport,
        force_refresh: bool,
    ) -> Result<Option<String>> {
        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(handler) = handler else {
            return Ok(None);
        };

        // Fast path: a fresh token needs no synchronization.
        if !force_refresh {
            if let Some(value) = self.fresh_token() {
                return Ok(Some(value));
            }
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if !force_refresh {
            if let Some(value) = self.fresh_token() {
                return Ok(Some(value));
            }
        }

        info!("requesting authentication token");
        let start = Instant::now();

        let response = match handler(transport.clone()).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "authentication token request failed");
                return Err(Error::token(format!("could not retrieve token: {e}")));
            }
        };

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(elapsed_ms, "authentication token request finished");

        let value = response.access_token.clone();
        let expires_at = Instant::now() + Duration::from_secs(response.expires_in_secs);
        // Value and expiry are replaced together under one write lock, so
        // readers never observe a partial update.
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(CachedToken {
            value: response.access_token,
            expires_at,
        });

        Ok(Some(value))
    }

    fn fresh_token(&self) -> Option<String> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.value.clone())
    }
}
