use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use analysis_core::{AnalysisError, LineItem, StatementRequest, StatementSource};
use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod cache;
pub mod config;
pub mod response;

pub use cache::CachingSource;
pub use config::DartConfig;
pub use response::{parse_statements, StatementResponse, StatementRow};

const STATEMENTS_ENDPOINT: &str = "fnlttSinglAcntAll.json";

/// Sliding-window rate limiter: at most `max_requests` per `window`.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
                None => Duration::ZERO,
            } + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for a DART request slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// OpenDART client for the full financial statements endpoint.
///
/// Requests are not retried; a transport failure or non-success status is returned to the
/// caller, which decides whether to try another combination.
#[derive(Clone)]
pub struct DartClient {
    config: DartConfig,
    client: Client,
    rate_limiter: RateLimiter,
}

impl DartClient {
    pub fn new(config: DartConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            rate_limiter: RateLimiter::new(config.rate_limit_per_minute, Duration::from_secs(60)),
            config,
            client,
        })
    }

    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::new(DartConfig::from_env()?)
    }

    pub fn config(&self) -> &DartConfig {
        &self.config
    }

    /// Line items of one (company, year, report, consolidation) filing. An empty list
    /// means DART has nothing for that combination.
    pub async fn get_financial_statements(
        &self,
        request: &StatementRequest,
    ) -> Result<Vec<LineItem>, AnalysisError> {
        let url = format!("{}/{}", self.config.base_url, STATEMENTS_ENDPOINT);
        let year = request.year.to_string();

        self.rate_limiter.acquire().await;
        tracing::debug!(%request, "Fetching DART statements");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("crtfc_key", self.config.api_key.as_str()),
                ("corp_code", request.corp_code.as_str()),
                ("bsns_year", year.as_str()),
                ("reprt_code", request.report.code()),
                ("fs_div", request.consolidation.code()),
            ])
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        match parse_statements(&body) {
            Ok(items) => {
                tracing::debug!(%request, rows = items.len(), "DART statements received");
                Ok(items)
            }
            Err(e) => {
                tracing::warn!(corp_code = %request.corp_code, %request, "DART request failed: {}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl StatementSource for DartClient {
    async fn fetch_statements(
        &self,
        request: &StatementRequest,
    ) -> Result<Vec<LineItem>, AnalysisError> {
        self.get_financial_statements(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_waits_for_window() {
        let window = Duration::from_millis(200);
        let limiter = RateLimiter::new(2, window);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < window);

        limiter.acquire().await;
        assert!(start.elapsed() >= window);
    }

    #[test]
    fn test_client_keeps_config() {
        let client = DartClient::new(DartConfig::new("key")).unwrap();
        assert_eq!(client.config().api_key, "key");
    }
}
