//! Authenticated request executor for the Starlink Enterprise API

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::auth::{Credentials, TokenCache};
use crate::error::{ClientError, ClientResult};

pub const DEFAULT_API_BASE: &str = "https://web-api.starlink.com/enterprise/v1";

/// Fixed per-call timeout, applied at the client level
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Starlink Enterprise API
///
/// Owns the shared HTTP client, the credentials, and the token cache. Safe to
/// share across concurrent tasks; the token cache is the only mutable state.
pub struct StarlinkClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token_cache: TokenCache,
}

impl StarlinkClient {
    pub fn new(credentials: Credentials) -> ClientResult<Self> {
        Self::with_base_url(credentials, DEFAULT_API_BASE)
    }

    /// Construct against an alternate API origin (tests point this at a mock)
    pub fn with_base_url(
        credentials: Credentials,
        base_url: impl Into<String>,
    ) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let token_cache = TokenCache::new(format!("{}/auth/token", base_url));
        Ok(Self { http, base_url, credentials, token_cache })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Execute an authenticated request against the Enterprise API.
    ///
    /// Fails with `Config` before any network I/O when credentials are
    /// missing, `Authentication` when the token grant fails, `Api` on a
    /// non-2xx response (carrying status and body text), and `Transport` on
    /// network-level failures including the 30-second timeout.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(String, String)]>,
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        self.execute_with_headers(method, path, query, body, &[]).await
    }

    /// Like [`execute`](Self::execute), with extra request headers.
    ///
    /// `Authorization` and `Content-Type` are applied after the caller's
    /// headers and cannot be overridden.
    pub async fn execute_with_headers(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(String, String)]>,
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> ClientResult<Value> {
        if !self.credentials.is_configured() {
            return Err(ClientError::not_configured());
        }

        let token = self.token_cache.acquire_token(&self.http, &self.credentials).await?;

        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "issuing Starlink API request");

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::Config(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::Config(format!("invalid value for header '{}': {}", name, e)))?;
            header_map.append(name, value);
        }

        // The fixed headers are inserted last and replace any caller-supplied
        // values under the same names.
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ClientError::Authentication(format!("token is not header-safe: {}", e)))?;
        header_map.insert(AUTHORIZATION, bearer);
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut request = self.http.request(method, &url).headers(header_map);

        if let Some(pairs) = query {
            request = request.query(pairs);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api { status: status.as_u16(), body: text });
        }

        // Some endpoints legitimately return no content; report a canonical
        // success sentinel instead of failing to parse an empty body.
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(json!({"status": "success", "message": "Operation completed"}));
        }

        serde_json::from_str(&text).map_err(|e| ClientError::Api {
            status: status.as_u16(),
            body: format!("unparseable response body ({}): {}", e, text),
        })
    }
}
