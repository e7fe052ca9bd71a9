//! Shared HTTP execution for provider requests.
//!
//! Translators produce inert [`RequestSpec`] values; the [`HttpExecutor`]
//! turns them into paced, retried GET requests and classifies failures
//! into the crate's error taxonomy. API keys are masked before any URL
//! reaches a log line.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SearchError};
use crate::rate_limit::RateLimiter;
use crate::retry::{with_retry, RetryPolicy};

/// Query parameters whose values are credentials and must never be
/// logged in full. IEEE carries its key in the URL.
const MASKED_PARAMS: &[&str] = &["apikey"];

/// A fully described, credential-complete GET request. Pure data: built
/// by a translator plus the client's credential, executed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Endpoint URL without query string.
    pub base_url: String,
    /// Query parameters, in append order.
    pub query: Vec<(String, String)>,
    /// Extra request headers (auth, accept).
    pub headers: Vec<(String, String)>,
}

impl RequestSpec {
    /// The request URL with credential parameter values masked, safe for
    /// logs and error messages.
    pub fn display_url(&self) -> String {
        let mut url = match url::Url::parse(&self.base_url) {
            Ok(url) => url,
            Err(_) => return self.base_url.clone(),
        };
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                if MASKED_PARAMS.contains(&key.as_str()) {
                    pairs.append_pair(key, &mask_key(value));
                } else {
                    pairs.append_pair(key, value);
                }
            }
        }
        url.to_string()
    }
}

/// Shorten a credential to `prefix…suffix` for display.
fn mask_key(key: &str) -> String {
    if key.len() > 12 {
        format!("{}...{}", &key[..8], &key[key.len() - 4..])
    } else {
        "***".to_owned()
    }
}

/// Build the `reqwest` client used by one provider for one run.
pub fn build_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("terna/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Executes [`RequestSpec`]s for one provider: rate-limiter permit,
/// GET, retry on transient failure, JSON body.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl HttpExecutor {
    /// Create an executor around an already-built client and limiter.
    pub fn new(client: reqwest::Client, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            client,
            limiter,
            retry,
        }
    }

    /// Execute the request and parse the body as JSON.
    ///
    /// Each attempt (including retries) acquires its own rate-limiter
    /// permit, so backoff never compresses provider pacing. Transient
    /// failures (timeout, 429, 503) are retried per the policy;
    /// 401/403 surface as auth errors immediately.
    pub async fn get_json(&self, spec: &RequestSpec) -> Result<serde_json::Value> {
        let display = spec.display_url();
        with_retry(&self.retry, &display, || self.attempt(spec, &display)).await
    }

    async fn attempt(&self, spec: &RequestSpec, masked_url: &str) -> Result<serde_json::Value> {
        self.limiter.acquire().await;
        tracing::trace!(url = %masked_url, "request");

        let mut request = self.client.get(&spec.base_url).query(&spec.query);
        for (key, value) in &spec.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        if let Err(err) = classify_status(status) {
            tracing::trace!(url = %masked_url, status = status.as_u16(), "request failed");
            return Err(err);
        }

        tracing::trace!(url = %masked_url, status = status.as_u16(), "response");
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| SearchError::Provider(format!("response body is not JSON: {e}")))
    }
}

/// Map a transport-level failure into the error taxonomy.
fn classify_reqwest_error(err: reqwest::Error) -> SearchError {
    if err.is_timeout() || err.is_connect() {
        SearchError::Transient(format!("request failed: {err}"))
    } else {
        SearchError::Http(format!("request failed: {err}"))
    }
}

/// Map a non-success status into the error taxonomy.
fn classify_status(status: reqwest::StatusCode) -> Result<()> {
    use reqwest::StatusCode;
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SearchError::Auth(format!(
            "provider rejected the API key (HTTP {})",
            status.as_u16()
        ))),
        StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => Err(SearchError::Transient(format!(
            "HTTP {}",
            status.as_u16()
        ))),
        _ => Err(SearchError::Http(format!("HTTP {}", status.as_u16()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_url_masks_apikey_parameter() {
        let spec = RequestSpec {
            base_url: "https://ieeexploreapi.ieee.org/api/v1/search/articles".into(),
            query: vec![
                ("apikey".into(), "abcdefgh0123456789wxyz".into()),
                ("querytext".into(), "\"CSIRT\"".into()),
            ],
            headers: vec![],
        };
        let display = spec.display_url();
        assert!(!display.contains("abcdefgh0123456789wxyz"));
        assert!(display.contains("abcdefgh...wxyz"));
        assert!(display.contains("querytext"));
    }

    #[test]
    fn display_url_masks_short_keys_entirely() {
        let spec = RequestSpec {
            base_url: "https://example.com/api".into(),
            query: vec![("apikey".into(), "short".into())],
            headers: vec![],
        };
        assert!(!spec.display_url().contains("short"));
    }

    #[test]
    fn display_url_keeps_ordinary_parameters() {
        let spec = RequestSpec {
            base_url: "https://api.elsevier.com/content/search/scopus".into(),
            query: vec![("query".into(), "\"SOC\"".into()), ("count".into(), "1".into())],
            headers: vec![],
        };
        let display = spec.display_url();
        assert!(display.contains("count=1"));
    }

    #[test]
    fn status_classification() {
        use reqwest::StatusCode;
        assert!(classify_status(StatusCode::OK).is_ok());
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED),
            Err(SearchError::Auth(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            Err(SearchError::Auth(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Err(SearchError::Transient(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Err(SearchError::Transient(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            Err(SearchError::Http(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Err(SearchError::Http(_))
        ));
    }

    #[test]
    fn build_client_succeeds() {
        assert!(build_client(30).is_ok());
    }
}
