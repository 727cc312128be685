pub mod extractor;
pub mod filters;
pub mod grade;
pub mod resolver;
pub mod scoring;
pub mod trend;


use analysis_core::{FilterResult, LineItem};
use serde::{Deserialize, Serialize};

pub use extractor::{extract, MetricExtractor, RuleSet};
pub use filters::apply_filters;
pub use grade::score_to_grade;
pub use resolver::{resolve_current, resolve_terms, TermMetrics};
pub use scoring::{score, Scorecard};
pub use trend::{analyze_trend, TrendAnalysis, TrendSignal};

/// Result of running extraction, fallback, filters and scoring over one statement set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub metrics: TermMetrics,
    pub filter_result: FilterResult,
    pub scorecard: Scorecard,
}

/// Synchronous value-scoring pipeline. Holds no state besides its rule tables, so one
/// instance can be shared across any number of concurrent analyses.
#[derive(Debug, Clone, Default)]
pub struct FundamentalAnalysisEngine {
    extractor: MetricExtractor,
}

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            extractor: MetricExtractor::with_rules(rules),
        }
    }

    pub fn extractor(&self) -> &MetricExtractor {
        &self.extractor
    }

    pub fn resolve(&self, items: &[LineItem]) -> TermMetrics {
        resolver::resolve_with(&self.extractor, items)
    }

    /// Terms as reported, for history views that must not repeat a year
    pub fn raw_terms(&self, items: &[LineItem]) -> TermMetrics {
        resolver::extract_terms_with(&self.extractor, items)
    }

    pub fn evaluate(&self, items: &[LineItem]) -> Evaluation {
        let metrics = self.resolve(items);
        let filter_result = apply_filters(&metrics.current, &metrics.prior);
        let scorecard = score(
            &metrics.current,
            &metrics.prior,
            &metrics.before_prior,
            &filter_result,
        );

        Evaluation {
            metrics,
            filter_result,
            scorecard,
        }
    }
}
