//! Shared HTTP plumbing for the InfluxDB sinks

use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

use tsload_core::SinkError;

/// Thin wrapper around a pooled reqwest client
///
/// One instance is shared by every worker; reqwest's connection pool does
/// the synchronization.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(usize::MAX)
            .build()
            .map_err(|e| SinkError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a GET request
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    /// Start a POST request
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    /// Send a request and turn transport failures and non-success statuses into errors
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, SinkError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        check_status(response).await
    }

    /// Check that the server answers `/ping`
    pub async fn ping(&self) -> Result<(), SinkError> {
        self.send(self.get("/ping")).await.map(|_| ())
    }

    /// Read a successful response body
    pub async fn text(&self, response: Response) -> Result<String, SinkError> {
        response
            .text()
            .await
            .map_err(|e| SinkError::InvalidResponse(format!("failed to read body: {}", e)))
    }

    fn map_error(&self, e: reqwest::Error) -> SinkError {
        if e.is_timeout() {
            SinkError::Timeout(self.timeout)
        } else if e.is_connect() {
            SinkError::Connection(format!("{}: {}", self.base_url, e))
        } else {
            SinkError::Connection(e.to_string())
        }
    }
}

async fn check_status(response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Rejected {
        status: status.as_u16(),
        message: rejection_message(status.canonical_reason(), &body),
    })
}

/// Human readable reason for a rejected request
///
/// InfluxDB answers errors as `{"error": "..."}` (v1) or
/// `{"code": "...", "message": "..."}` (v2); anything else is passed through.
pub fn rejection_message(reason: Option<&str>, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }

    let body = body.trim();
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.error) {
            return message;
        }
    }

    if body.is_empty() {
        reason.unwrap_or("unknown error").to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("http://localhost:8086/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/ping"), "http://localhost:8086/ping");
    }

    #[test]
    fn test_rejection_message_v1() {
        let message = rejection_message(
            Some("Bad Request"),
            r#"{"error":"unable to parse 'x': missing fields"}"#,
        );
        assert_eq!(message, "unable to parse 'x': missing fields");
    }

    #[test]
    fn test_rejection_message_v2() {
        let message = rejection_message(
            Some("Unauthorized"),
            r#"{"code":"unauthorized","message":"unauthorized access"}"#,
        );
        assert_eq!(message, "unauthorized access");
    }

    #[test]
    fn test_rejection_message_fallbacks() {
        assert_eq!(rejection_message(Some("Service Unavailable"), ""), "Service Unavailable");
        assert_eq!(rejection_message(None, "  "), "unknown error");
        assert_eq!(rejection_message(None, "plain text"), "plain text");
    }

    #[tokio::test]
    async fn test_ping_unreachable() {
        // Port 9 (discard) on localhost is closed on test machines
        let client = HttpClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.ping().await.unwrap_err();
        assert!(matches!(
            err,
            SinkError::Connection(_) | SinkError::Timeout(_)
        ));
    }
}
