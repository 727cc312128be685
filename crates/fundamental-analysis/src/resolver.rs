use analysis_core::{FinancialMetrics, LineItem, MetricField, Substitution, Term};
use serde::{Deserialize, Serialize};

use crate::extractor::MetricExtractor;

/// Current-term fields that fall back to an earlier column when the filer left them blank.
///
/// Small filers regularly omit these lines from the current period while still reporting
/// them for the comparative periods.
pub const FALLBACK_FIELDS: [MetricField; 5] = [
    MetricField::NetIncome,
    MetricField::TotalEquity,
    MetricField::TotalAssets,
    MetricField::TotalLiabilities,
    MetricField::OperatingIncome,
];

/// Metrics for the three reported terms of one statement set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermMetrics {
    /// Current term after fallback substitution
    pub current: FinancialMetrics,
    pub prior: FinancialMetrics,
    pub before_prior: FinancialMetrics,
    pub substitutions: Vec<Substitution>,
}

impl TermMetrics {
    pub fn get(&self, term: Term) -> &FinancialMetrics {
        match term {
            Term::Current => &self.current,
            Term::Prior => &self.prior,
            Term::BeforePrior => &self.before_prior,
        }
    }
}

/// Fill zero current-term fallback fields from prior, then before-prior.
///
/// A field is only replaced by a non-zero value; a zero in every column stays zero.
pub fn fill_missing(
    current: &FinancialMetrics,
    prior: &FinancialMetrics,
    before_prior: &FinancialMetrics,
) -> (FinancialMetrics, Vec<Substitution>) {
    let mut resolved = *current;
    let mut substitutions = Vec::new();

    for field in FALLBACK_FIELDS {
        if resolved.get(field) != 0.0 {
            continue;
        }
        let replacement = [(Term::Prior, prior), (Term::BeforePrior, before_prior)]
            .into_iter()
            .map(|(term, metrics)| (term, metrics.get(field)))
            .find(|(_, value)| *value != 0.0);

        if let Some((source, value)) = replacement {
            resolved.set(field, value);
            substitutions.push(Substitution {
                field,
                source,
                value,
            });
        }
    }

    (resolved, substitutions)
}

/// Each term exactly as reported, with no substitution
pub fn extract_terms_with(extractor: &MetricExtractor, items: &[LineItem]) -> TermMetrics {
    TermMetrics {
        current: extractor.extract(items, Term::Current),
        prior: extractor.extract(items, Term::Prior),
        before_prior: extractor.extract(items, Term::BeforePrior),
        substitutions: Vec::new(),
    }
}

/// Extract all three terms with `extractor` and resolve the current one
pub fn resolve_with(extractor: &MetricExtractor, items: &[LineItem]) -> TermMetrics {
    let raw = extract_terms_with(extractor, items);
    let (current, substitutions) = fill_missing(&raw.current, &raw.prior, &raw.before_prior);

    TermMetrics {
        current,
        substitutions,
        ..raw
    }
}

pub fn resolve_terms(items: &[LineItem]) -> TermMetrics {
    resolve_with(&MetricExtractor::default(), items)
}

/// Current-term metrics with fallback applied
pub fn resolve_current(items: &[LineItem]) -> FinancialMetrics {
    resolve_terms(items).current
}
