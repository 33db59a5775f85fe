//! HTTP collaborator used to retrieve XML documents.
//!
//! [`DocumentHandle`](crate::document::DocumentHandle) only sees the
//! [`HttpFetcher`] trait: one blocking call that either returns the response
//! body or fails after its own retries. [`BlockingFetcher`] is the reqwest
//! implementation.

use std::thread;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;

use crate::error::FetchError;

/// User agent string identifying this crate.
const USER_AGENT: &str = concat!("remote-xml/", env!("CARGO_PKG_VERSION"));

/// Everything a fetcher needs for one logical request.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// Timeout for each attempt.
    pub timeout: Duration,
    /// Full `Authorization` header value, if any.
    pub authorization: Option<&'a str>,
    /// Extra headers in `Name: value` form.
    pub extra_headers: &'a [String],
    /// Request body. Empty means GET.
    pub body: &'a str,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

/// Blocking HTTP retrieval with retries handled by the implementation.
pub trait HttpFetcher {
    /// Fetch the response body as text.
    ///
    /// Implementations retry transient failures themselves; callers never
    /// retry an error returned from here.
    fn get(&self, request: &FetchRequest<'_>) -> Result<String, FetchError>;
}

/// Build an HTTP Basic `Authorization` header value.
///
/// Returns `None` when both user and password are empty.
///
/// # Examples
/// ```
/// use remote_xml::http::basic_authorization;
///
/// assert_eq!(basic_authorization("user", "pass").as_deref(), Some("Basic dXNlcjpwYXNz"));
/// assert_eq!(basic_authorization("", ""), None);
/// ```
pub fn basic_authorization(user: &str, password: &str) -> Option<String> {
    if user.is_empty() && password.is_empty() {
        return None;
    }
    Some(format!(
        "Basic {}",
        STANDARD.encode(format!("{user}:{password}"))
    ))
}

/// Split `Name: value` header strings into name/value pairs.
fn parse_headers(headers: &[String]) -> Result<Vec<(&str, &str)>, FetchError> {
    headers
        .iter()
        .map(|header| {
            header
                .split_once(':')
                .map(|(name, value)| (name.trim(), value.trim()))
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| FetchError::InvalidHeader(header.clone()))
        })
        .collect()
}

/// [`HttpFetcher`] backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct BlockingFetcher {
    client: Client,
}

impl BlockingFetcher {
    /// Create a fetcher with a freshly configured client.
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one with custom TLS settings.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpFetcher for BlockingFetcher {
    /// Retries connection errors, timeouts and 5xx responses, waiting
    /// `retry_delay` between attempts. Client errors (4xx) fail immediately.
    fn get(&self, request: &FetchRequest<'_>) -> Result<String, FetchError> {
        let headers = parse_headers(request.extra_headers)?;
        let attempts = request.max_retries.max(1);
        let mut last_error: Option<String> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tracing::debug!(
                    attempt,
                    delay_secs = request.retry_delay.as_secs(),
                    "Retrying after delay"
                );
                thread::sleep(request.retry_delay);
            }

            let mut builder = if request.body.is_empty() {
                self.client.get(request.url)
            } else {
                self.client.post(request.url).body(request.body.to_string())
            };
            builder = builder.timeout(request.timeout);
            if let Some(authorization) = request.authorization {
                builder = builder.header(AUTHORIZATION, authorization);
            }
            for (name, value) in &headers {
                builder = builder.header(*name, *value);
            }

            match builder.send() {
                Ok(response) => {
                    let status = response.status();

                    if status.is_server_error() {
                        tracing::warn!(
                            url = request.url,
                            status = %status,
                            attempt = attempt + 1,
                            max_retries = attempts,
                            "Server error, will retry"
                        );
                        last_error = Some(format!("Server error: {status}"));
                        continue;
                    }

                    // 4xx won't succeed on retry
                    if status.is_client_error() {
                        return Err(FetchError::Status {
                            status: status.as_u16(),
                        });
                    }

                    return Ok(response.text()?);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        tracing::warn!(
                            url = request.url,
                            error = %e,
                            attempt = attempt + 1,
                            max_retries = attempts,
                            "Connection error, will retry"
                        );
                        last_error = Some(e.to_string());
                        continue;
                    }
                    return Err(FetchError::Http(e));
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            attempts,
            message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fetcher() {
        assert!(BlockingFetcher::new().is_ok());
    }

    #[test]
    fn test_basic_authorization() {
        assert_eq!(
            basic_authorization("user", "pass"),
            Some("Basic dXNlcjpwYXNz".to_string())
        );
        // A lone user still gets a header
        assert_eq!(
            basic_authorization("user", ""),
            Some("Basic dXNlcjo=".to_string())
        );
        assert_eq!(basic_authorization("", ""), None);
    }

    #[test]
    fn test_parse_headers() {
        let headers = vec![
            "Accept: application/xml".to_string(),
            "X-Token:abc:def".to_string(),
        ];
        let parsed = parse_headers(&headers).unwrap();
        assert_eq!(
            parsed,
            vec![("Accept", "application/xml"), ("X-Token", "abc:def")]
        );
    }

    #[test]
    fn test_parse_headers_rejects_missing_colon() {
        let headers = vec!["NoColonHere".to_string()];
        assert!(matches!(
            parse_headers(&headers),
            Err(FetchError::InvalidHeader(h)) if h == "NoColonHere"
        ));
    }

    #[test]
    fn test_invalid_header_fails_before_network() {
        let fetcher = BlockingFetcher::new().unwrap();
        let headers = vec![": empty name".to_string()];
        let request = FetchRequest {
            url: "http://127.0.0.1:9/unused.xml",
            timeout: Duration::from_secs(1),
            authorization: None,
            extra_headers: &headers,
            body: "",
            max_retries: 1,
            retry_delay: Duration::ZERO,
        };
        assert!(matches!(
            fetcher.get(&request),
            Err(FetchError::InvalidHeader(_))
        ));
    }
}
