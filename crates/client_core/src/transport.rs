//! One HTTP request in, one normalized outcome out.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use shared::error::ApiErrorBody;
use tracing::debug;

use crate::{config::Settings, error::ApiFailure};

/// `Ok(None)` is a no-content success; `Ok(Some(_))` carries the parsed JSON
/// payload, which may itself be an empty array or object.
pub type ApiResult = Result<Option<Value>, ApiFailure>;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn post_json<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self, ApiFailure> {
        Self::new(Method::POST, url).with_json(body)
    }

    pub fn put_json<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self, ApiFailure> {
        Self::new(Method::PUT, url).with_json(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiFailure> {
        let body = serde_json::to_value(body)
            .map_err(|err| ApiFailure::UnexpectedPayload(format!("failed to encode body: {err}")))?;
        self.body = Some(body);
        Ok(self.with_header(CONTENT_TYPE.as_str(), "application/json"))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ApiResult;
}

pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build users api http client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }

    fn connection_failure(&self, err: &reqwest::Error) -> ApiFailure {
        ApiFailure::Connection {
            base_url: self.base_url.clone(),
            detail: error_chain(err),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult {
        debug!(method = %request.method, url = %request.url, "sending users api request");

        let mut builder = self.http.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.connection_failure(&err))?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %request.url, "users api responded");

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|err| self.connection_failure(&err))?;

        classify_response(status.as_u16(), content_type.as_deref(), &body)
    }
}

/// Turns a raw response into the normalized outcome.
///
/// Order matters: no-content first, then the content type, then the body,
/// and only then the status code.
pub fn classify_response(status: u16, content_type: Option<&str>, body: &[u8]) -> ApiResult {
    if status == StatusCode::NO_CONTENT.as_u16() {
        return Ok(None);
    }

    let is_json = content_type
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"));
    if !is_json {
        let detail = match content_type {
            Some(value) => format!("content type '{value}'"),
            None => "missing content type".to_string(),
        };
        return Err(ApiFailure::NonJsonResponse { status, detail });
    }

    let payload: Value =
        serde_json::from_slice(body).map_err(|err| ApiFailure::NonJsonResponse {
            status,
            detail: format!("body is not valid JSON ({err})"),
        })?;

    if !(200..300).contains(&status) {
        let message = serde_json::from_value::<ApiErrorBody>(payload)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.is_empty());
        return Err(match message {
            Some(message) => ApiFailure::Http { status, message },
            None => ApiFailure::http_status(status),
        });
    }

    Ok(Some(payload))
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
