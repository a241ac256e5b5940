use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{constants::USER_AGENT, error::ApiError};

pub(crate) const NO_QUERY: &[(&str, &str)] = &[];

/// Thin wrapper over a shared `reqwest::Client` that knows the backend origin
/// and the bearer token of the current session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> reqwest::Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(http, base_url, token))
    }

    pub fn with_client(http: Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub(crate) async fn get_json<T, Q>(&self, path: &str, query: &Q, fallback: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let request = self.authorize(self.http.get(&url).query(query));
        let response = send(request, &url, fallback).await?;
        decode_json(response, &url).await
    }

    pub(crate) async fn get_bytes<Q>(&self, path: &str, query: &Q, fallback: &str) -> Result<Vec<u8>, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let request = self.authorize(self.http.get(&url).query(query));
        let response = send(request, &url, fallback).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::Decode { url, source })?;
        Ok(bytes.to_vec())
    }

    pub(crate) async fn post_json<T, B>(&self, path: &str, body: &B, fallback: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let request = self.authorize(self.http.post(&url).json(body));
        let response = send(request, &url, fallback).await?;
        decode_json(response, &url).await
    }

    /// POST whose success body is optional; unreadable or empty bodies decode
    /// to `T::default()`.
    pub(crate) async fn post_lenient<T, B>(&self, path: &str, body: &B, fallback: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let request = self.authorize(self.http.post(&url).json(body));
        let response = send(request, &url, fallback).await?;
        Ok(decode_lenient(response).await)
    }

    pub(crate) async fn patch_lenient<T, Q>(&self, path: &str, query: &Q, fallback: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let request = self.authorize(self.http.patch(&url).query(query));
        let response = send(request, &url, fallback).await?;
        Ok(decode_lenient(response).await)
    }
}

async fn send(request: RequestBuilder, url: &str, fallback: &str) -> Result<Response, ApiError> {
    tracing::debug!("request {url}");
    let response = request.send().await.map_err(|source| ApiError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!("{url} returned {status}: {}", truncate_for_log(&body));
    Err(ApiError::Status {
        status,
        message: error_message(status, &body, fallback),
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
    response.json().await.map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

async fn decode_lenient<T: DeserializeOwned + Default>(response: Response) -> T {
    let text = response.text().await.unwrap_or_default();
    if text.trim().is_empty() {
        return T::default();
    }
    serde_json::from_str(&text).unwrap_or_default()
}

/// Picks the backend's explanation out of an error body: `message`, then
/// `msg`, then `error`. Falls back to `fallback`, then the status reason.
pub fn error_message(status: StatusCode, body: &str, fallback: &str) -> String {
    let from_body = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["message", "msg", "error"].iter().find_map(|key| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToOwned::to_owned)
        })
    });

    from_body
        .or_else(|| (!fallback.is_empty()).then(|| fallback.to_string()))
        .or_else(|| status.canonical_reason().map(ToOwned::to_owned))
        .unwrap_or_else(|| "Request failed".to_string())
}

pub fn truncate_for_log(text: &str) -> String {
    let trimmed = text.trim();
    let max_len = 300usize;
    if trimmed.len() <= max_len {
        return trimmed.to_string();
    }
    let mut end = max_len;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
