//! Shared HTTP client for all source adapters.
//!
//! One [`FetchClient`] is built per run and reused across sources. Non-2xx
//! responses are mapped to typed errors; 429 and 5xx are retried with
//! exponential backoff, 404 and other 4xx surface immediately.

use std::time::Duration;

use reqwest::Client;

use crate::error::IngestError;
use crate::retry::retry_with_backoff;

/// Fallback when a 429 response carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

pub struct FetchClient {
    client: Client,
    /// Retry attempts after the first failure. Zero disables retries.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `base * 2^attempt`.
    backoff_base_secs: u64,
}

impl FetchClient {
    /// Creates a client with configured timeout, `User-Agent`, and retry
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches `url` and returns the response body as text, retrying
    /// transient failures.
    ///
    /// # Errors
    ///
    /// - [`IngestError::RateLimited`] — HTTP 429 after all retries exhausted.
    /// - [`IngestError::NotFound`] — HTTP 404 (not retried).
    /// - [`IngestError::UnexpectedStatus`] — other non-2xx (5xx retried, 4xx not).
    /// - [`IngestError::Http`] — network or TLS failure after all retries.
    pub async fn get_text(&self, url: &str) -> Result<String, IngestError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async {
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                return Err(IngestError::RateLimited {
                    domain: host_of(url),
                    retry_after_secs,
                });
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(IngestError::NotFound {
                    url: url.to_owned(),
                });
            }
            if !status.is_success() {
                return Err(IngestError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            Ok(response.text().await?)
        })
        .await
    }
}

/// Host portion of a URL, for rate-limit bookkeeping. Falls back to the full
/// string when the URL has no scheme separator.
fn host_of(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    stripped
        .split(['/', '?'])
        .next()
        .unwrap_or(stripped)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(max_retries: u32) -> FetchClient {
        FetchClient::new(5, "livepulse-test/0.1", max_retries, 0).unwrap()
    }

    #[test]
    fn host_of_strips_scheme_and_path() {
        assert_eq!(host_of("https://news.example.org/rss/world"), "news.example.org");
        assert_eq!(host_of("http://example.org?q=1"), "example.org");
        assert_eq!(host_of("example.org"), "example.org");
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .mount(&server)
            .await;

        let body = client(0)
            .get_text(&format!("{}/feed", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<rss/>");
    }

    #[tokio::test]
    async fn maps_404_to_not_found_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(3).get_text(&format!("{}/feed", server.uri())).await;
        assert!(matches!(result, Err(IngestError::NotFound { .. })));
    }

    #[tokio::test]
    async fn retries_500_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(3)
            .get_text(&format!("{}/feed", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn exhausts_retries_on_persistent_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let result = client(2).get_text(&format!("{}/feed", server.uri())).await;
        assert!(matches!(
            result,
            Err(IngestError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn maps_429_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let result = client(0).get_text(&format!("{}/feed", server.uri())).await;
        match result {
            Err(IngestError::RateLimited {
                retry_after_secs, ..
            }) => assert_eq!(retry_after_secs, 7),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn does_not_retry_403() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(3).get_text(&format!("{}/feed", server.uri())).await;
        assert!(matches!(
            result,
            Err(IngestError::UnexpectedStatus { status: 403, .. })
        ));
    }
}
