use std::env;
use std::str::FromStr;
use std::time::Duration;

use analysis_core::AnalysisError;

pub const DEFAULT_BASE_URL: &str = "https://opendart.fss.or.kr/api";

#[derive(Debug, Clone)]
pub struct DartConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    /// `None` keeps cached statements until the process exits
    pub cache_ttl: Option<Duration>,
    /// Requests per minute, shared by every clone of the client
    pub rate_limit_per_minute: usize,
}

impl DartConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            cache_ttl: None,
            rate_limit_per_minute: 600,
        }
    }

    /// Read `DART_*` variables from the process environment
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AnalysisError> {
        let api_key = lookup("DART_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnalysisError::Config("DART_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key.trim());
        if let Some(url) = lookup("DART_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "DART_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "DART_CACHE_TTL_SECS")? {
            config.cache_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(limit) = parse_var::<usize>(&lookup, "DART_RATE_LIMIT")? {
            config.rate_limit_per_minute = limit.max(1);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AnalysisError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AnalysisError::Config(format!("{key} has an invalid value: {raw:?}"))),
    }
}
