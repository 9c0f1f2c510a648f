//! Remote effect fetching over HTTP(S).
//!
//! Used when the effects base URL is absolute. Server errors and rate
//! limiting are retried with backoff; any other status goes straight back to
//! the caller.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use core_async::time::sleep;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Reqwest-backed [`HttpClient`].
pub struct ReqwestHttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent(concat!("overlay-audio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    /// Retry policy used by [`HttpClient::execute`].
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn is_retryable_status(status: u16) -> bool {
        status >= 500 || status == 429
    }

    /// One round trip. A retryable failure is returned as `Attempt::Retry`
    /// unless this is the final attempt, which always yields the response.
    async fn send_once(&self, request: &HttpRequest, final_attempt: bool) -> Result<Attempt> {
        let response = match self.build_request(request).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(Attempt::Retry(BridgeError::OperationFailed(format!(
                    "{} timed out",
                    request.url
                ))))
            }
            Err(e) => return Ok(Attempt::Retry(BridgeError::OperationFailed(e.to_string()))),
        };

        let status = response.status().as_u16();
        if Self::is_retryable_status(status) && !final_attempt {
            return Ok(Attempt::Retry(BridgeError::HttpStatus {
                status,
                url: request.url.clone(),
            }));
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(Attempt::Done(HttpResponse {
            status,
            headers,
            body,
        }))
    }

    async fn send_with_policy(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!(attempt, max_attempts, url = %request.url, "Fetching");
            match self.send_once(&request, attempt == max_attempts).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(err) if attempt == max_attempts => return Err(err),
                Attempt::Retry(err) => {
                    let delay = policy.delay_after(attempt);
                    warn!(error = %err, attempt, delay_ms = delay.as_millis() as u64, "Retrying fetch");
                    sleep(delay).await;
                }
            }
        }

        Err(BridgeError::OperationFailed(format!(
            "{}: no attempt was made",
            request.url
        )))
    }
}

enum Attempt {
    Done(HttpResponse),
    Retry(BridgeError),
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send_with_policy(request, self.policy.clone()).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.send_with_policy(request, policy).await
    }
}
