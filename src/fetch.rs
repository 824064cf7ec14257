//! HTTP fetch gateway.
//!
//! Every network request in the crate goes through [`fetch_page`]: a GET with
//! a per-call timeout and a browser-like header set. Network failure (timeout,
//! DNS, refused connection) is a normal outcome: callers get `None`, never an
//! error. HTTP 4xx/5xx responses are returned as-is; deciding what a bad
//! status means is the caller's business.

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::classify::FeedInfo;

/// Response bodies larger than this are treated as unavailable.
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Desktop-browser User-Agent. Bare library UAs get blocked outright by
/// Cloudflare-fronted sites, which would make every strategy come up empty.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Outcome of fetching a candidate URL and sniffing its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The URL serves a recognizable feed.
    Feed(FeedInfo),
    /// The URL was reachable but is not a feed (includes HTTP error statuses).
    NotFeed,
    /// Timeout, DNS/connection failure, or an oversized body.
    Unavailable,
}

/// Builds the shared HTTP client with browser-like default headers.
///
/// # Errors
///
/// Returns the underlying [`reqwest::Error`] if the TLS backend cannot be
/// initialized.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
}

/// Fetches a URL with a per-call timeout.
///
/// Returns `None` on timeout or any transport-level failure. HTTP error
/// statuses still yield `Some(response)`; classification of "not a feed"
/// happens one layer up.
pub async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Option<reqwest::Response> {
    match tokio::time::timeout(timeout, client.get(url).send()).await {
        Ok(Ok(response)) => Some(response),
        Ok(Err(e)) => {
            tracing::debug!(url = %url, error = %e, "Fetch failed");
            None
        }
        Err(_) => {
            tracing::debug!(url = %url, timeout_ms = timeout.as_millis() as u64, "Fetch timed out");
            None
        }
    }
}

/// Reads a response body with a size cap, using stream-based reading so an
/// unbounded body never lands in memory whole.
///
/// Returns `None` when the body exceeds [`MAX_BODY_SIZE`] or the connection
/// drops mid-read.
pub async fn read_limited_text(response: reqwest::Response) -> Option<String> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > MAX_BODY_SIZE {
            tracing::debug!(len = len, "Response body over size cap");
            return None;
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "Body read failed");
                return None;
            }
        };
        if bytes.len().saturating_add(chunk.len()) > MAX_BODY_SIZE {
            tracing::debug!("Response body over size cap");
            return None;
        }
        bytes.extend_from_slice(&chunk);
    }

    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_response_for_http_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = build_client().unwrap();
        let response = fetch_page(&client, &mock_server.uri(), Duration::from_secs(5))
            .await
            .expect("HTTP errors are normal responses");
        assert_eq!(response.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn fetch_returns_none_on_connection_failure() {
        // Nothing listens on this port; connection is refused immediately.
        let client = build_client().unwrap();
        let result = fetch_page(&client, "http://127.0.0.1:9/", Duration::from_secs(5)).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn fetch_returns_none_on_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&mock_server)
            .await;

        let client = build_client().unwrap();
        let result = fetch_page(&client, &mock_server.uri(), Duration::from_millis(100)).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn body_is_read_in_full() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello body"))
            .mount(&mock_server)
            .await;

        let client = build_client().unwrap();
        let response = fetch_page(&client, &mock_server.uri(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(read_limited_text(response).await.as_deref(), Some("hello body"));
    }

    #[tokio::test]
    async fn oversized_body_is_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; MAX_BODY_SIZE + 1]))
            .mount(&mock_server)
            .await;

        let client = build_client().unwrap();
        let response = fetch_page(&client, &mock_server.uri(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(read_limited_text(response).await, None);
    }
}
