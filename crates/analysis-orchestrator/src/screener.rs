use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use analysis_core::{AnalysisResult, Consolidation, Signal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{is_excluded_listing, AnalysisOrchestrator, AnalysisOutcome, ScreenerConfig};

/// One listed company in the screening universe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub corp_code: String,
    pub corp_name: String,
    #[serde(default)]
    pub stock_code: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Passed,
    /// Failed the disqualification filters
    Filtered,
    /// Skipped by the listing pre-filter without fetching
    PreFiltered,
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub value: f64,
    pub score: f64,
    pub max_score: f64,
    pub grade: String,
}

/// Flattened row for ranked tables and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenEntry {
    /// 1-based position among passed entries
    pub rank: Option<usize>,
    pub corp_code: String,
    pub corp_name: String,
    pub stock_code: Option<String>,
    pub sector: Option<String>,
    pub status: EntryStatus,
    pub total_score: f64,
    pub signal: Option<Signal>,
    pub recommendation: Option<String>,
    pub filter_reasons: Vec<String>,
    pub indicators: BTreeMap<String, IndicatorSummary>,
    pub data_source: Option<String>,
}

impl ScreenEntry {
    fn blank(company: &Company, status: EntryStatus) -> Self {
        Self {
            rank: None,
            corp_code: company.corp_code.clone(),
            corp_name: company.corp_name.clone(),
            stock_code: company.stock_code.clone(),
            sector: company.sector.clone(),
            status,
            total_score: 0.0,
            signal: None,
            recommendation: None,
            filter_reasons: Vec::new(),
            indicators: BTreeMap::new(),
            data_source: None,
        }
    }

    fn from_result(company: &Company, result: AnalysisResult) -> Self {
        let status = if result.signal.is_disqualified() {
            EntryStatus::Filtered
        } else {
            EntryStatus::Passed
        };

        let indicators = result
            .indicators
            .into_iter()
            .map(|i| {
                (
                    i.name,
                    IndicatorSummary {
                        value: i.value,
                        score: i.score,
                        max_score: i.max_score,
                        grade: i.grade,
                    },
                )
            })
            .collect();

        Self {
            total_score: result.total_score,
            signal: Some(result.signal),
            recommendation: Some(result.recommendation),
            filter_reasons: result.filter_result.failed_reasons().to_vec(),
            indicators,
            data_source: Some(result.data_source),
            ..Self::blank(company, status)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    pub year: i32,
    pub consolidation: Consolidation,
    pub total_analyzed: usize,
    pub passed_count: usize,
    pub filtered_count: usize,
    pub no_data_count: usize,
    /// Analysis tasks that panicked or were cancelled
    pub errors: usize,
    /// Passed entries, best first
    pub stocks: Vec<ScreenEntry>,
    pub filtered_out: Vec<ScreenEntry>,
    pub no_data: Vec<ScreenEntry>,
    pub generated_at: DateTime<Utc>,
}

pub struct Screener {
    orchestrator: Arc<AnalysisOrchestrator>,
    config: ScreenerConfig,
}

impl Screener {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, config: ScreenerConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Analyze the first `limit` companies and rank the ones that pass the filters.
    pub async fn screen(
        &self,
        companies: &[Company],
        year: i32,
        consolidation: Consolidation,
    ) -> ScreenReport {
        let universe = &companies[..companies.len().min(self.config.limit)];
        let total_analyzed = universe.len();

        tracing::info!(
            "Starting screen of {} companies ({} {}, concurrency {})",
            total_analyzed,
            consolidation,
            year,
            self.config.max_concurrency
        );

        let mut passed = Vec::new();
        let mut filtered_out = Vec::new();
        let mut no_data = Vec::new();
        let mut errors = 0;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for company in universe {
            if let Some(reason) =
                is_excluded_listing(&company.corp_name, company.stock_code.as_deref())
            {
                tracing::debug!("Skipping {} ({}): {}", company.corp_code, company.corp_name, reason);
                let mut entry = ScreenEntry::blank(company, EntryStatus::PreFiltered);
                entry.filter_reasons.push(reason);
                filtered_out.push(entry);
                continue;
            }

            let orchestrator = Arc::clone(&self.orchestrator);
            let semaphore = Arc::clone(&semaphore);
            let company = company.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = orchestrator
                    .analyze(&company.corp_code, &company.corp_name, year, consolidation)
                    .await;
                (company, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((company, AnalysisOutcome::Analyzed(result))) => {
                    let entry = ScreenEntry::from_result(&company, *result);
                    match entry.status {
                        EntryStatus::Passed => passed.push(entry),
                        _ => filtered_out.push(entry),
                    }
                }
                Ok((company, AnalysisOutcome::NotFound(_))) => {
                    no_data.push(ScreenEntry::blank(&company, EntryStatus::NoData));
                }
                Err(e) => {
                    tracing::error!("Screen task error: {}", e);
                    errors += 1;
                }
            }
        }

        passed.sort_by(by_score_then_code);
        for (i, entry) in passed.iter_mut().enumerate() {
            entry.rank = Some(i + 1);
        }
        filtered_out.sort_by(by_score_then_code);
        no_data.sort_by(|a, b| a.corp_code.cmp(&b.corp_code));

        let passed_count = passed.len();
        let filtered_count = filtered_out.len();
        let no_data_count = no_data.len();

        filtered_out.truncate(self.config.filtered_out_preview);
        no_data.truncate(self.config.no_data_preview);

        tracing::info!(
            "Screen complete: {}/{} passed, {} filtered, {} without data, {} errors",
            passed_count,
            total_analyzed,
            filtered_count,
            no_data_count,
            errors
        );

        ScreenReport {
            year,
            consolidation,
            total_analyzed,
            passed_count,
            filtered_count,
            no_data_count,
            errors,
            stocks: passed,
            filtered_out,
            no_data,
            generated_at: Utc::now(),
        }
    }

    /// Passed entries scoring at least `top_pick_min_score`, in rank order
    pub fn top_picks<'a>(&self, report: &'a ScreenReport) -> Vec<&'a ScreenEntry> {
        report
            .stocks
            .iter()
            .filter(|e| e.total_score >= self.config.top_pick_min_score)
            .collect()
    }
}

fn by_score_then_code(a: &ScreenEntry, b: &ScreenEntry) -> Ordering {
    b.total_score
        .partial_cmp(&a.total_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.corp_code.cmp(&b.corp_code))
}
