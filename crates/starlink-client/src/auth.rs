//! Credentials and OAuth2 client-credentials token management

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

pub const CLIENT_ID_ENV: &str = "STARLINK_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "STARLINK_CLIENT_SECRET";

/// Safety margin subtracted from the token lifetime; covers clock skew and
/// in-flight request latency.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Default token lifetime when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Client id/secret pair for the Enterprise API, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into() }
    }

    /// Read credentials from the environment, defaulting to empty strings.
    /// Missing values are not fatal here; authenticated calls fail fast later.
    pub fn from_env() -> Self {
        Self {
            client_id: std::env::var(CLIENT_ID_ENV).unwrap_or_default(),
            client_secret: std::env::var(CLIENT_SECRET_ENV).unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Token endpoint response shape
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Cache for the current bearer token
///
/// Holds the access token together with its effective expiry (real expiry
/// minus the safety margin) and refreshes it through the client-credentials
/// grant when absent or stale. The state lock is held across the refresh, so
/// concurrent callers never issue duplicate token requests; they wait and
/// reuse the freshly stored token.
pub struct TokenCache {
    token_url: String,
    state: Mutex<Option<CachedToken>>,
    clock: Clock,
}

impl TokenCache {
    pub fn new(token_url: impl Into<String>) -> Self {
        Self::with_clock(token_url, Box::new(Utc::now))
    }

    /// Construct with an explicit clock (tests inject a controllable one)
    pub fn with_clock(token_url: impl Into<String>, clock: Clock) -> Self {
        Self { token_url: token_url.into(), state: Mutex::new(None), clock }
    }

    /// Return a valid access token, refreshing it if absent or near expiry.
    ///
    /// The common case (cached token still fresh) performs no I/O.
    pub async fn acquire_token(
        &self,
        http: &reqwest::Client,
        credentials: &Credentials,
    ) -> ClientResult<String> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.as_ref() {
            if (self.clock)() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!("access token absent or near expiry, requesting a new one");

        let response = http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                *state = None;
                ClientError::Authentication(format!("token endpoint unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "token endpoint rejected the request");
            *state = None;
            return Err(ClientError::Authentication(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            *state = None;
            ClientError::Authentication(format!("invalid token response: {}", e))
        })?;

        // A lifetime shorter than the margin yields an already-expired token,
        // forcing re-auth on the next call instead of a negative margin.
        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = (self.clock)() + Duration::seconds(expires_in - EXPIRY_MARGIN_SECS);
        debug!(%expires_at, "obtained new access token");

        let access_token = token.access_token.clone();
        *state = Some(CachedToken { access_token: token.access_token, expires_at });

        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn fixed_clock(now: Arc<StdMutex<DateTime<Utc>>>) -> Clock {
        Box::new(move || *now.lock().unwrap())
    }

    fn advance(now: &Arc<StdMutex<DateTime<Utc>>>, by: Duration) {
        let mut guard = now.lock().unwrap();
        *guard = *guard + by;
    }

    fn test_credentials() -> Credentials {
        Credentials::new("client-1", "secret-1")
    }

    #[tokio::test]
    async fn cached_token_is_reused_without_network_io() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/auth/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "tok-1", "expires_in": 3600}));
        });

        let cache = TokenCache::new(server.url("/auth/token"));
        let http = reqwest::Client::new();

        let first = cache.acquire_token(&http, &test_credentials()).await.unwrap();
        let second = cache.acquire_token(&http, &test_credentials()).await.unwrap();

        assert_eq!(first, "tok-1");
        assert_eq!(second, "tok-1");
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn token_is_refreshed_once_the_margin_has_passed() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/auth/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "tok", "expires_in": 3600}));
        });

        let now = Arc::new(StdMutex::new(Utc::now()));
        let cache = TokenCache::with_clock(server.url("/auth/token"), fixed_clock(now.clone()));
        let http = reqwest::Client::new();
        let creds = test_credentials();

        cache.acquire_token(&http, &creds).await.unwrap();
        mock.assert_hits(1);

        // Still inside the effective lifetime (3600 - 300 seconds): no refresh.
        advance(&now, Duration::seconds(3299));
        cache.acquire_token(&http, &creds).await.unwrap();
        mock.assert_hits(1);

        // Past the effective expiry: exactly one refresh call.
        advance(&now, Duration::seconds(2));
        cache.acquire_token(&http, &creds).await.unwrap();
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn short_lifetime_forces_reauth_on_every_call() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/auth/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "tok", "expires_in": 60}));
        });

        let cache = TokenCache::new(server.url("/auth/token"));
        let http = reqwest::Client::new();
        let creds = test_credentials();

        cache.acquire_token(&http, &creds).await.unwrap();
        cache.acquire_token(&http, &creds).await.unwrap();
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn rejected_grant_surfaces_authentication_error_with_detail() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/token");
            then.status(401).body("invalid_client");
        });

        let cache = TokenCache::new(server.url("/auth/token"));
        let http = reqwest::Client::new();

        let err = cache.acquire_token(&http, &test_credentials()).await.unwrap_err();
        match err {
            ClientError::Authentication(msg) => {
                assert!(msg.contains("401"), "missing status in: {}", msg);
                assert!(msg.contains("invalid_client"), "missing detail in: {}", msg);
            }
            other => panic!("expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn grant_request_sends_client_credentials_form() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/token")
                .x_www_form_urlencoded_tuple("grant_type", "client_credentials")
                .x_www_form_urlencoded_tuple("client_id", "client-1")
                .x_www_form_urlencoded_tuple("client_secret", "secret-1");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "tok", "expires_in": 3600}));
        });

        let cache = TokenCache::new(server.url("/auth/token"));
        let http = reqwest::Client::new();
        cache.acquire_token(&http, &test_credentials()).await.unwrap();
        mock.assert();
    }
}
