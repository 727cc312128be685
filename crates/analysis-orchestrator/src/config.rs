use std::env;
use std::str::FromStr;

use analysis_core::{AnalysisError, ReportType};
use serde::{Deserialize, Serialize};

/// How far the orchestrator walks the (consolidation × year × report) fallback grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Number of business years tried, starting at the requested one
    pub max_years_back: u32,
    /// Report types tried within each year, in order
    pub report_priority: Vec<ReportType>,
    /// Retry with parent-only statements when consolidated ones are missing
    pub fallback_to_separate: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_years_back: 6,
            report_priority: vec![ReportType::Annual, ReportType::SemiAnnual],
            fallback_to_separate: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AnalysisError> {
        let mut config = Self::default();

        if let Some(years) = parse_var::<u32>(&lookup, "ANALYZER_MAX_YEARS")? {
            if years == 0 {
                return Err(AnalysisError::Config(
                    "ANALYZER_MAX_YEARS must be at least 1".to_string(),
                ));
            }
            config.max_years_back = years;
        }

        if let Some(raw) = lookup("ANALYZER_REPORT_TYPES") {
            let reports = raw
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(|code| {
                    ReportType::from_code(code).ok_or_else(|| {
                        AnalysisError::Config(format!("unknown report code in ANALYZER_REPORT_TYPES: {code}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if reports.is_empty() {
                return Err(AnalysisError::Config(
                    "ANALYZER_REPORT_TYPES is empty".to_string(),
                ));
            }
            config.report_priority = reports;
        }

        if let Some(flag) = parse_var::<bool>(&lookup, "ANALYZER_FALLBACK_SEPARATE")? {
            config.fallback_to_separate = flag;
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Companies analyzed at the same time
    pub max_concurrency: usize,
    /// Companies screened per run
    pub limit: usize,
    pub top_pick_min_score: f64,
    pub filtered_out_preview: usize,
    pub no_data_preview: usize,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 50,
            limit: 100,
            top_pick_min_score: 70.0,
            filtered_out_preview: 20,
            no_data_preview: 30,
        }
    }
}

impl ScreenerConfig {
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AnalysisError> {
        let mut config = Self::default();
        if let Some(n) = parse_var::<usize>(&lookup, "SCREENER_CONCURRENCY")? {
            config.max_concurrency = n.max(1);
        }
        if let Some(n) = parse_var::<usize>(&lookup, "SCREENER_LIMIT")? {
            config.limit = n;
        }
        if let Some(score) = parse_var::<f64>(&lookup, "SCREENER_TOP_PICK_MIN_SCORE")? {
            config.top_pick_min_score = score;
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
