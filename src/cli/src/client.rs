//! HTTP client for the Tollbooth API.

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Success envelope returned by the server.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
}

/// Failure envelope returned by the server.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    details: Option<ErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    #[serde(default)]
    reason: Option<String>,
}

/// A request the server answered with an error body.
#[derive(Debug, thiserror::Error)]
#[error("{message} ({code}, HTTP {status})")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub reason: Option<String>,
}

impl ApiError {
    fn from_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self {
                status,
                code: envelope.error.code,
                message: envelope.error.message,
                reason: envelope.error.details.and_then(|d| d.reason),
            },
            Err(_) => Self {
                status,
                code: "UNKNOWN".to_string(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body.to_string()
                },
                reason: None,
            },
        }
    }
}

/// Token returned by `POST /token`.
#[derive(Debug, Deserialize, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// HTTP client for the Tollbooth API.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url`, sending `token` as a bearer credential when set.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange credentials for a token. Sent as a form, like an OAuth2 password grant.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken> {
        let url = self.url("/token");
        let resp = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        unwrap_envelope(resp, &url).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::POST, path, Some(body)).await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::POST, path, None::<&()>).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::DELETE, path, None::<&()>).await
    }

    /// GET that returns the raw JSON body (the health endpoint has no envelope).
    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        let url = self.url(path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        // A degraded server answers 503 with a useful body.
        let status = resp.status();
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_body(status, &body).into());
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.url(path);
        let mut request = self.authorize(self.client.request(method.clone(), &url));
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))?;
        unwrap_envelope(resp, &url).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(resp: Response, url: &str) -> Result<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .with_context(|| format!("Failed to read response from {}", url))?;

    if !status.is_success() {
        return Err(ApiError::from_body(status, &body).into());
    }

    let envelope: Envelope<T> = serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse response from {}", url))?;

    match (envelope.success, envelope.data) {
        (true, Some(data)) => Ok(data),
        (true, None) => anyhow::bail!("API returned success but no data"),
        (false, _) => Err(ApiError::from_body(status, &body).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_is_parsed() {
        let body = r#"{
            "success": false,
            "error": {
                "code": "ACCESS_DENIED",
                "numeric_code": 3001,
                "message": "Access denied: usage limit reached",
                "details": {"reason": "usage limit reached"},
                "timestamp": "2026-01-01T00:00:00Z"
            }
        }"#;

        let err = ApiError::from_body(StatusCode::FORBIDDEN, body);
        assert_eq!(err.code, "ACCESS_DENIED");
        assert_eq!(err.reason.as_deref(), Some("usage limit reached"));
        assert!(err.to_string().contains("HTTP 403"));
    }

    #[test]
    fn test_non_json_error_keeps_text() {
        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.code, "UNKNOWN");
        assert_eq!(err.message, "upstream down");

        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, "");
        assert!(err.message.contains("502"));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8080/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/plans"), "http://localhost:8080/plans");
    }
}
