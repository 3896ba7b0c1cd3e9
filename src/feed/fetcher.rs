use futures::stream::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MAX_RETRIES: u32 = 3;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Errors that can occur while downloading a feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Server answered 2xx with no body
    #[error("Empty response body")]
    EmptyBody,
}

/// Builds the HTTP client shared by all feed fetches.
///
/// Identifies as `planet/<version>`, follows redirects (reqwest's default
/// policy of up to 10 hops) and gives up on connecting after 10 seconds.
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("planet/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Downloads one feed document.
///
/// # Behavior
///
/// - Each attempt has a 30-second deadline covering the request and the body
/// - HTTP 429 and 5xx trigger exponential backoff (1s, 2s, 4s) with up to 3 retries
/// - Truncated bodies (shorter than Content-Length) are retried the same way
/// - Other non-2xx statuses fail immediately
/// - Bodies are limited to 10MB; an empty body is an error
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    fetch_with_backoff(client, url, BACKOFF_BASE, REQUEST_TIMEOUT).await
}

async fn fetch_with_backoff(
    client: &reqwest::Client,
    url: &str,
    backoff_base: Duration,
    attempt_timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    let mut retry_count = 0;

    let bytes = loop {
        let deadline = tokio::time::Instant::now() + attempt_timeout;
        let response = tokio::time::timeout_at(deadline, client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            if retry_count >= MAX_RETRIES {
                return Err(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    FetchError::RateLimited(MAX_RETRIES)
                } else {
                    FetchError::HttpStatus(status.as_u16())
                });
            }

            let delay = backoff_base * 2u32.pow(retry_count);
            tracing::warn!(
                feed = %url,
                status = %status,
                retry = retry_count,
                delay_ms = delay.as_millis() as u64,
                "Server refused feed request, retrying after delay"
            );

            tokio::time::sleep(delay).await;
            retry_count += 1;
            continue;
        }

        // 4xx errors fail immediately
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = tokio::time::timeout_at(deadline, read_limited_bytes(response, MAX_FEED_SIZE))
            .await
            .map_err(|_| FetchError::Timeout)?;
        match body {
            Ok(bytes) => break bytes,
            Err(FetchError::IncompleteResponse { expected, received }) => {
                if retry_count >= MAX_RETRIES {
                    return Err(FetchError::IncompleteResponse { expected, received });
                }

                let delay = backoff_base * 2u32.pow(retry_count);
                tracing::debug!(
                    feed = %url,
                    expected = expected,
                    received = received,
                    attempt = retry_count + 1,
                    "Retrying incomplete download"
                );

                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
    };

    if bytes.is_empty() {
        return Err(FetchError::EmptyBody);
    }

    tracing::debug!(feed = %url, bytes = bytes.len(), "Fetched feed");
    Ok(bytes)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
