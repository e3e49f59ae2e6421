//! Authenticated JSON client for the Lark/Feishu open platform.
//!
//! Every endpoint answers with a `{code, msg, data}` envelope. A non-zero
//! `code` is mapped to [`BookingError::Api`], carrying the request log id
//! from the `x-tt-logid` header so failures can be traced on the platform
//! side.

use std::time::{Duration, Instant};

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{BookingError, Result};

const TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";

/// Refresh the tenant token this long before the platform expires it.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Business codes meaning the tenant token is missing, invalid or expired.
const TOKEN_INVALID_CODES: &[i64] = &[99_991_661, 99_991_663, 99_991_668];

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    #[serde(default)]
    expire: u64,
}

/// One page of a listing.
///
/// Room listings name their item array `rooms`; everything else uses `items`.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    page_token: Option<String>,
    #[serde(alias = "rooms")]
    items: Option<Vec<T>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Open-platform client holding app credentials and a cached tenant token.
pub struct LarkClient {
    config: AppConfig,
    http: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for LarkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LarkClient")
            .field("app_id", &self.config.app_id)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl LarkClient {
    /// Build a client for the given app.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BookingError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            http,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Current tenant access token, fetching a new one when close to expiry.
    async fn tenant_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        debug!("requesting tenant access token");
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .json(&serde_json::json!({
                "app_id": self.config.app_id,
                "app_secret": self.config.app_secret,
            }))
            .send()
            .await
            .map_err(|e| BookingError::Http(format!("tenant token request failed: {e}")))?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| BookingError::Http(format!("tenant token response unreadable: {e}")))?;

        if body.code != 0 || body.tenant_access_token.is_empty() {
            return Err(BookingError::Auth(format!(
                "tenant token rejected, code: {}, msg: {}",
                body.code, body.msg
            )));
        }

        let lifetime = Duration::from_secs(body.expire).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: body.tenant_access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(body.tenant_access_token)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    /// Send an authenticated request and unwrap the envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>> {
        let token = self.tenant_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BookingError::Http(format!("{operation}: request failed: {e}")))?;

        let status = response.status();
        let log_id = response
            .headers()
            .get("x-tt-logid")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response
            .text()
            .await
            .map_err(|e| BookingError::Http(format!("{operation}: body unreadable: {e}")))?;

        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(BookingError::Record(format!(
                    "{operation}: unexpected response shape: {e}"
                )));
            }
            Err(_) => {
                return Err(BookingError::Http(format!(
                    "{operation}: HTTP {}: {text}",
                    status.as_u16()
                )));
            }
        };

        if envelope.code != 0 {
            if TOKEN_INVALID_CODES.contains(&envelope.code) {
                self.forget_token().await;
            }
            return Err(BookingError::Api {
                operation: operation.to_owned(),
                code: envelope.code,
                msg: envelope.msg,
                log_id,
            });
        }

        debug!("{operation} succeeded");
        Ok(envelope.data)
    }

    fn require<T>(operation: &str, data: Option<T>) -> Result<T> {
        data.ok_or_else(|| BookingError::Record(format!("{operation}: response has no data")))
    }

    /// `GET` an endpoint and return its `data`.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.http.get(self.url(path)).query(query);
        let data = self.send(operation, request).await?;
        Self::require(operation, data)
    }

    /// `POST` a JSON body and return the response `data`.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T> {
        let request = self.http.post(self.url(path)).query(query).json(body);
        let data = self.send(operation, request).await?;
        Self::require(operation, data)
    }

    /// `POST` a JSON body, discarding any response `data`.
    pub(crate) async fn post_unit<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<()> {
        let request = self.http.post(self.url(path)).query(query).json(body);
        self.send::<serde_json::Value>(operation, request).await?;
        Ok(())
    }

    /// Fetch every page of a `GET` listing.
    ///
    /// Stops when the platform reports no more pages or hands back an empty
    /// page token.
    pub(crate) async fn get_all_pages<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut all = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut page_query = query.to_vec();
            if let Some(token) = &page_token {
                page_query.push(("page_token", token.clone()));
            }

            let page: Page<T> = self.get(operation, path, &page_query).await?;
            all.extend(page.items.unwrap_or_default());

            match page.page_token {
                Some(token) if page.has_more && !token.is_empty() => {
                    debug!("{operation}: fetching next page");
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(all)
    }
}
