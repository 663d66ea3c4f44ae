// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// HTTP boundary
//
// Responsibilities:
// - Sender trait over the HTTP client (swappable in tests)
// - POST the message history as {"messages":[...]}
// - Map start failures: 429, 402, other non-2xx, missing body
// - Hand the response byte stream to the stream processor

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::config::EndpointConfig;
use crate::error::ChatError;
use crate::message::Message;

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

/// Response body as an ordered stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout_ms: Option<u64>,
}

pub struct HttpResponse {
    pub status: StatusCode,
    /// `None` when the response carries no body at all.
    pub body: Option<ByteStream>,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("invalid request header: {0}")]
    InvalidHeader(String),
}

/// Sends HTTP requests to the chat endpoint.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ---------------------------------------------------------------------------
// Reqwest HTTP sender
// ---------------------------------------------------------------------------

pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpSender {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut req = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body);

        if let Some(timeout_ms) = request.timeout_ms {
            req = req.timeout(Duration::from_millis(timeout_ms));
        }

        let resp = req.send().await.map_err(classify_reqwest_error)?;

        let status = resp.status();

        let empty = matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT)
            || resp.content_length() == Some(0);
        let body = if empty {
            None
        } else {
            let stream = resp.bytes_stream().map_err(classify_reqwest_error);
            Some(Box::pin(stream) as ByteStream)
        };

        Ok(HttpResponse { status, body })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout(e.to_string())
    } else {
        HttpError::Transport(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Chat client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

/// Opens chat completion streams against one endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: Arc<dyn HttpSender>,
    url: String,
    api_key: Option<String>,
    timeout_ms: Option<u64>,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl ChatClient {
    pub fn new(http: Arc<dyn HttpSender>, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            api_key: None,
            timeout_ms: None,
        }
    }

    /// Client for the configured endpoint.
    pub fn from_config(http: Arc<dyn HttpSender>, endpoint: &EndpointConfig) -> Self {
        let mut client = Self::new(http, endpoint.url.clone());
        client.api_key = endpoint.api_key.clone();
        client.timeout_ms = endpoint.timeout_ms;
        client
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the history and return the response byte stream.
    ///
    /// Every failure here happens before any stream content is seen.
    pub async fn open_stream(&self, messages: &[Message]) -> Result<ByteStream, ChatError> {
        let body = serde_json::to_vec(&ChatRequest { messages })?;
        let headers = self.headers().map_err(ChatError::Request)?;

        let request = HttpRequest {
            method: Method::POST,
            url: self.url.clone(),
            headers,
            body: Bytes::from(body),
            timeout_ms: self.timeout_ms,
        };

        let response = self.http.send(request).await.map_err(ChatError::Request)?;

        match response.status {
            StatusCode::TOO_MANY_REQUESTS => return Err(ChatError::RateLimited),
            StatusCode::PAYMENT_REQUIRED => return Err(ChatError::QuotaExceeded),
            status if !status.is_success() => {
                return Err(ChatError::StreamStart {
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        response.body.ok_or(ChatError::MissingBody)
    }

    fn headers(&self) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| HttpError::InvalidHeader("authorization".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}
