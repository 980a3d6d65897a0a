use crate::types::{FetchConfig, PipelineError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Response};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Bounded retry with exponential backoff: the delay after attempt `n`
/// (counted from 0) is `base_delay * 2^n`, and there is no wait after the
/// final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.max_retries, config.base_delay())
    }

    fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        let ceiling = 1u32 << self.max_attempts.min(16);
        ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.base_delay.saturating_mul(ceiling),
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// The waits a persistently failing call goes through, in order.
    pub fn delays(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        (1..self.max_attempts)
            .filter_map(|_| backoff.next_backoff())
            .collect()
    }

    /// Runs `attempt` until it succeeds or the attempts are exhausted.
    ///
    /// Failures are logged and swallowed; exhaustion yields `None`.
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut backoff = self.backoff();

        for attempt_no in 0..self.max_attempts {
            match attempt().await {
                Ok(value) => {
                    if attempt_no > 0 {
                        info!("{} succeeded on attempt {}/{}", label, attempt_no + 1, self.max_attempts);
                    }
                    return Some(value);
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed for {}: {}", attempt_no + 1, self.max_attempts, label, e);

                    if attempt_no + 1 < self.max_attempts {
                        if let Some(delay) = backoff.next_backoff() {
                            debug!("Retrying {} in {:?}", label, delay);
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        error!(
            "Giving up on {} after {} attempts ({} ms)",
            label,
            self.max_attempts,
            started.elapsed().as_millis()
        );
        None
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// HTTP client shared by the sources and the lesson composer.
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET with retries. `None` means every attempt failed.
    pub async fn get(&self, url: &Url) -> Option<Response> {
        let label = log_label(url);
        self.retry
            .run(&label, || {
                let request = self.client.get(url.clone());
                async move { ensure_success(request.send().await?) }
            })
            .await
    }

    /// GET with retries, returning the body text.
    pub async fn get_text(&self, url: &Url) -> Option<String> {
        let response = self.get(url).await?;
        match response.text().await {
            Ok(body) => {
                debug!("Fetched {} ({} bytes)", log_label(url), body.len());
                Some(body)
            }
            Err(e) => {
                warn!("Failed to read body from {}: {}", log_label(url), e);
                None
            }
        }
    }

    /// POST a JSON body with retries, optionally with a bearer token.
    pub async fn post_json<B>(&self, url: &Url, bearer: Option<&str>, body: &B) -> Option<Response>
    where
        B: Serialize + ?Sized,
    {
        let label = log_label(url);
        self.retry
            .run(&label, || {
                let mut request = self.client.post(url.clone()).json(body);
                if let Some(token) = bearer {
                    request = request.bearer_auth(token);
                }
                async move { ensure_success(request.send().await?) }
            })
            .await
    }
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PipelineError::HttpStatus {
            status: status.as_u16(),
            url: log_label(response.url()),
        })
    }
}

/// URL without its query string, so API keys never reach the logs.
pub fn log_label(url: &Url) -> String {
    let mut label = url.clone();
    label.set_query(None);
    label.to_string()
}
