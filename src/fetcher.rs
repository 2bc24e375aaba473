use crate::constants::*;
use crate::errors::{AppError, AppResult, FetchError};
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

/// Bounded retry with linear backoff: the wait after failed attempt `n`
/// (1-indexed) is `backoff_base * n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            backoff_base: Duration::from_millis(BACKOFF_BASE_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the next try, or `None` once `attempt` was the last one.
    pub fn backoff_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(self.backoff_base * attempt)
        }
    }
}

/// Fetches JSON resources relative to a base URL. Knows nothing about
/// hierarchy or files.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(base_url: &str, retry: RetryPolicy) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT))
            .build()
            .map_err(AppError::Client)?;
        // Url::join drops the last segment unless the base ends in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(FetchError::from)?;
        Ok(Fetcher {
            client,
            base_url,
            retry,
        })
    }

    /// URL of `{resource}.json` under the base.
    pub fn resource_url(&self, resource: &str) -> Result<Url, FetchError> {
        let file = if resource.ends_with(".json") {
            resource.to_string()
        } else {
            format!("{}.{}", resource, JSON_EXT)
        };
        Ok(self.base_url.join(&file)?)
    }

    pub async fn fetch_resource(&self, resource: &str) -> Result<Value, FetchError> {
        let url = self.resource_url(resource)?;
        self.fetch(url.as_str()).await
    }

    /// GETs `url` and decodes it as JSON, retrying any failure up to the
    /// policy's attempt budget. The last failure is returned as-is.
    pub async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let mut attempt = 1;
        loop {
            let err = match self.try_once(url).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            match self.retry.backoff_after(attempt) {
                Some(delay) => {
                    warn!(
                        url,
                        attempt,
                        max = self.retry.max_attempts(),
                        kind = err.kind(),
                        error = %err,
                        "fetch failed, retrying in {:?}",
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    debug!(url, attempt, error = %err, "retry budget exhausted");
                    return Err(err);
                }
            }
        }
    }

    async fn try_once(&self, url: &str) -> Result<Value, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            // Drain so the connection goes back to the pool.
            let _ = resp.bytes().await;
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.bytes().await?;
        decode_json(url, body)
    }
}

fn decode_json(url: &str, body: Bytes) -> Result<Value, FetchError> {
    let mut buf = body.to_vec();
    simd_json::from_slice::<Value>(&mut buf).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear_and_bounded() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.backoff_after(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.backoff_after(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.backoff_after(3), None);
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(1));
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.backoff_after(1), None);
    }

    #[test]
    fn resource_url_joins_under_base() {
        let f = Fetcher::new("https://example.com/areas_v3/bound", RetryPolicy::default()).unwrap();
        assert_eq!(
            f.resource_url("110000_full").unwrap().as_str(),
            "https://example.com/areas_v3/bound/110000_full.json"
        );
        assert_eq!(
            f.resource_url("infos.json").unwrap().as_str(),
            "https://example.com/areas_v3/bound/infos.json"
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_json("u", Bytes::from_static(b"<html>")).unwrap_err();
        assert_eq!(err.kind(), "decode");
        let ok = decode_json("u", Bytes::from_static(br#"{"type":"FeatureCollection"}"#)).unwrap();
        assert_eq!(ok["type"], "FeatureCollection");
    }
}
