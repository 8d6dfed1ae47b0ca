//! Authenticated JSON client for the destination control API.

use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use restream_types::DeviceInfo;

use crate::error::ApiError;
use crate::store::{TokenPair, TokenStore};
use crate::{ApiResult, DEFAULT_REQUEST_TIMEOUT_MS, REFRESH_ENDPOINT};

/// Token pair plus a counter bumped on every successful refresh.
///
/// The counter is what makes refresh single-flight: a caller that saw
/// generation N only performs the network refresh if the generation is
/// still N once it holds the lock; otherwise another caller already
/// refreshed and the fresh pair is reused.
struct AuthState {
    pair: TokenPair,
    generation: u64,
}

/// JSON-over-HTTP client that attaches the bearer credential and
/// refreshes it transparently, exactly once per expiry.
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: TokenStore,
    device: DeviceInfo,
    auth: Mutex<AuthState>,
}

impl ApiClient {
    /// Build a client around an already-loaded token pair, with the
    /// default request deadline.
    pub fn new(
        base_url: impl Into<String>,
        store: TokenStore,
        pair: TokenPair,
        device: DeviceInfo,
    ) -> ApiResult<Self> {
        Self::with_timeout(
            base_url,
            store,
            pair,
            device,
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    /// Build a client with an explicit per-request deadline.
    pub fn with_timeout(
        base_url: impl Into<String>,
        store: TokenStore,
        pair: TokenPair,
        device: DeviceInfo,
        request_timeout: Duration,
    ) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ApiError::Http)?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            store,
            device,
            auth: Mutex::new(AuthState {
                pair,
                generation: 0,
            }),
        })
    }

    /// Issue an authorized JSON request against `path`.
    ///
    /// On a 401 the token pair is refreshed and the request retried
    /// exactly once; a second 401 is fatal.
    #[instrument(name = "api_request", skip(self, body), fields(%method, path))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let (token, generation) = self.credential().await;

        let response = self
            .send(method.clone(), path, body.as_ref(), &token)
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::into_json(response).await;
        }

        debug!(path, "access token rejected, refreshing");
        let pair = self.refresh(generation).await?;

        let retry = self
            .send(method, path, body.as_ref(), &pair.access_token)
            .await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthExpired);
        }
        Self::into_json(retry).await
    }

    /// Refresh the token pair unless another caller already has.
    ///
    /// `seen_generation` is the generation of the pair that was rejected.
    /// The refreshed pair is persisted before it is returned.
    pub async fn refresh(&self, seen_generation: u64) -> ApiResult<TokenPair> {
        let mut auth = self.auth.lock().await;
        if auth.generation != seen_generation {
            debug!("token already refreshed by a concurrent caller");
            return Ok(auth.pair.clone());
        }

        let pair = self.refresh_call(&auth.pair).await?;
        self.store.save(&pair)?;
        auth.pair = pair.clone();
        auth.generation += 1;
        info!("access token refreshed");
        Ok(pair)
    }

    /// Current access token and its generation.
    async fn credential(&self) -> (String, u64) {
        let auth = self.auth.lock().await;
        (auth.pair.access_token.clone(), auth.generation)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> ApiResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn into_json(response: Response) -> ApiResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// POST the stored refresh token plus device metadata.
    async fn refresh_call(&self, current: &TokenPair) -> ApiResult<TokenPair> {
        #[derive(Deserialize)]
        struct RefreshData {
            access_token: String,
            refresh_token: String,
        }

        #[derive(Deserialize)]
        struct RefreshResponse {
            data: RefreshData,
        }

        let payload = json!({
            "refresh_token": current.refresh_token,
            "device_id": self.device.device_id,
            "device_type": self.device.device_type,
            "os": self.device.os,
            "device_name": self.device.device_name,
        });

        let url = format!("{}{}", self.base_url, REFRESH_ENDPOINT);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&current.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::RefreshFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RefreshFailed(format!("status {status}: {body}")));
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::RefreshFailed(e.to_string()))?;
        Ok(TokenPair {
            access_token: parsed.data.access_token,
            refresh_token: parsed.data.refresh_token,
        })
    }
}
