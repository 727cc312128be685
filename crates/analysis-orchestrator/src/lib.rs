use std::fmt;
use std::sync::Arc;

use analysis_core::{
    AnalysisResult, Consolidation, LineItem, ReportType, StatementRequest, StatementSource,
};
use chrono::Utc;
use fundamental_analysis::{analyze_trend, FundamentalAnalysisEngine, TrendAnalysis};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod prefilter;
pub mod screener;

#[cfg(test)]
mod tests;

pub use config::{AnalyzerConfig, ScreenerConfig};
pub use prefilter::is_excluded_listing;
pub use screener::{
    Company, EntryStatus, IndicatorSummary, ScreenEntry, ScreenReport, Screener,
};

/// Every combination was tried and none returned statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotFound {
    pub corp_code: String,
    pub requested_year: i32,
    pub requested_consolidation: Consolidation,
    pub tried: Vec<StatementRequest>,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no financial statements for {} ({} {}) after {} combinations",
            self.corp_code,
            self.requested_consolidation,
            self.requested_year,
            self.tried.len()
        )
    }
}

#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Analyzed(Box<AnalysisResult>),
    NotFound(NotFound),
}

impl AnalysisOutcome {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisOutcome::Analyzed(result) => Some(result),
            AnalysisOutcome::NotFound(_) => None,
        }
    }

    pub fn into_result(self) -> Result<AnalysisResult, NotFound> {
        match self {
            AnalysisOutcome::Analyzed(result) => Ok(*result),
            AnalysisOutcome::NotFound(not_found) => Err(not_found),
        }
    }
}

/// Drives statement fetching with fallback and hands the first usable statement set to the
/// scoring engine.
///
/// Holds no mutable state, so one instance behind an `Arc` serves any number of concurrent
/// analyses.
pub struct AnalysisOrchestrator {
    source: Arc<dyn StatementSource>,
    engine: FundamentalAnalysisEngine,
    config: AnalyzerConfig,
}

impl AnalysisOrchestrator {
    pub fn new(source: Arc<dyn StatementSource>, config: AnalyzerConfig) -> Self {
        Self {
            source,
            engine: FundamentalAnalysisEngine::new(),
            config,
        }
    }

    /// Replace the default engine, e.g. one built with extra extraction rules
    pub fn with_engine(mut self, engine: FundamentalAnalysisEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn engine(&self) -> &FundamentalAnalysisEngine {
        &self.engine
    }

    /// Combinations in the order they are tried: consolidation first, then year going
    /// backwards, then report type.
    pub fn fallback_plan(
        &self,
        corp_code: &str,
        year: i32,
        consolidation: Consolidation,
    ) -> Vec<StatementRequest> {
        let mut consolidations = vec![consolidation];
        if consolidation == Consolidation::Consolidated && self.config.fallback_to_separate {
            consolidations.push(Consolidation::Separate);
        }

        let mut plan = Vec::new();
        for fs in consolidations {
            for offset in 0..self.config.max_years_back as i32 {
                for report in &self.config.report_priority {
                    plan.push(StatementRequest::new(corp_code, year - offset, *report, fs));
                }
            }
        }
        plan
    }

    /// First non-empty statement set along the plan. Fetch failures count as empty.
    async fn find_statements(
        &self,
        plan: &[StatementRequest],
    ) -> Option<(StatementRequest, Vec<LineItem>)> {
        for request in plan {
            tracing::debug!(%request, "Trying statement combination");
            match self.source.fetch_statements(request).await {
                Ok(items) if !items.is_empty() => return Some((request.clone(), items)),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        corp_code = %request.corp_code,
                        %request,
                        "Statement fetch failed, trying next combination: {}",
                        e
                    );
                }
            }
        }
        None
    }

    pub async fn analyze(
        &self,
        corp_code: &str,
        corp_name: &str,
        year: i32,
        consolidation: Consolidation,
    ) -> AnalysisOutcome {
        let plan = self.fallback_plan(corp_code, year, consolidation);

        let Some((used, items)) = self.find_statements(&plan).await else {
            tracing::info!(
                "No statements for {} ({}) after {} combinations",
                corp_code,
                corp_name,
                plan.len()
            );
            return AnalysisOutcome::NotFound(NotFound {
                corp_code: corp_code.to_string(),
                requested_year: year,
                requested_consolidation: consolidation,
                tried: plan,
            });
        };

        let data_source = describe_source(year, consolidation, &used);
        if used.year != year || used.consolidation != consolidation || used.report != ReportType::Annual {
            tracing::info!("{} ({}): using {}", corp_code, corp_name, data_source);
        }

        let evaluation = self.engine.evaluate(&items);
        let scorecard = evaluation.scorecard;

        let mut recommendation = scorecard.recommendation;
        if used.year != year || used.consolidation != consolidation {
            recommendation = format!(
                "[using {}, {} statements] {}",
                used.year,
                used.consolidation.label(),
                recommendation
            );
        }

        let result = AnalysisResult {
            corp_code: corp_code.to_string(),
            corp_name: corp_name.to_string(),
            requested_year: year,
            requested_consolidation: consolidation,
            year: used.year,
            consolidation: used.consolidation,
            report: used.report,
            indicators: scorecard.indicators,
            total_score: scorecard.total_score,
            signal: scorecard.signal,
            recommendation,
            filter_result: evaluation.filter_result,
            current: evaluation.metrics.current,
            prior: evaluation.metrics.prior,
            before_prior: evaluation.metrics.before_prior,
            substitutions: evaluation.metrics.substitutions,
            data_source,
            analyzed_at: Utc::now(),
        };

        tracing::debug!(
            "{}: score {:.1} ({})",
            corp_code,
            result.total_score,
            result.signal
        );

        AnalysisOutcome::Analyzed(Box::new(result))
    }

    /// Multi-year trend from the three term columns of the first statement set found.
    ///
    /// Uses the columns as reported; a blank current column adds no point.
    pub async fn trend(
        &self,
        corp_code: &str,
        year: i32,
        consolidation: Consolidation,
    ) -> Result<TrendAnalysis, NotFound> {
        let plan = self.fallback_plan(corp_code, year, consolidation);
        match self.find_statements(&plan).await {
            Some((used, items)) => Ok(analyze_trend(used.year, &self.engine.raw_terms(&items))),
            None => Err(NotFound {
                corp_code: corp_code.to_string(),
                requested_year: year,
                requested_consolidation: consolidation,
                tried: plan,
            }),
        }
    }
}

/// `"CFS/2023"`, with a parenthesised note list when the combination differs from the request
pub fn describe_source(
    requested_year: i32,
    requested_consolidation: Consolidation,
    used: &StatementRequest,
) -> String {
    let mut notes = Vec::new();

    if requested_consolidation == Consolidation::Consolidated
        && used.consolidation == Consolidation::Separate
    {
        notes.push("CFS unavailable".to_string());
    }

    match requested_year - used.year {
        n if n <= 0 => {}
        1 => notes.push("1 year earlier".to_string()),
        n => notes.push(format!("{n} years earlier")),
    }

    if used.report != ReportType::Annual {
        notes.push(used.report.label().to_string());
    }

    let base = format!("{}/{}", used.consolidation, used.year);
    if notes.is_empty() {
        base
    } else {
        format!("{} ({})", base, notes.join(", "))
    }
}
