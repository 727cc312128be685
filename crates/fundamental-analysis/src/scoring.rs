use analysis_core::stats::{mean, population_std_dev, round_to};
use analysis_core::{FilterResult, FinancialMetrics, Indicator, IndicatorCategory, Signal};
use serde::{Deserialize, Serialize};

use crate::grade::{
    margin_stability_score, score_to_grade, BandTable, CASH_GENERATION_BANDS, DEBT_RATIO_BANDS,
    GROWTH_BANDS, INTEREST_COVERAGE_BANDS, MARGIN_STABILITY_MAX, OPERATING_MARGIN_BANDS,
    RETENTION_BANDS, ROE_BANDS, ROIC_BANDS,
};

/// Indicator names as they appear in results and screener tables
pub mod names {
    pub const ROE: &str = "ROE";
    pub const CASH_GENERATION: &str = "Cash Generation (OCF/NI)";
    pub const OPERATING_GROWTH: &str = "Operating Income Growth";
    pub const INTEREST_COVERAGE: &str = "Interest Coverage";
    pub const DEBT_RATIO: &str = "Debt Ratio";
    pub const ROIC: &str = "ROIC";
    pub const OPERATING_MARGIN: &str = "Operating Margin";
    pub const RETENTION_RATIO: &str = "Retention Ratio";
    pub const MARGIN_STABILITY: &str = "Margin Stability";
}

/// Weight applied to the auxiliary indicator sum
pub const AUXILIARY_WEIGHT: f64 = 0.3;

/// Value reported for ratios whose denominator vanished in the company's favour
pub const UNBOUNDED: f64 = 999.0;

const PRIMARY_COUNT: usize = 5;

/// Everything the scoring stage produces for one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    /// Five primary indicators followed by the four auxiliary ones
    pub indicators: Vec<Indicator>,
    pub primary_score: f64,
    pub auxiliary_score: f64,
    pub total_score: f64,
    pub signal: Signal,
    pub recommendation: String,
}

impl Scorecard {
    pub fn primary(&self) -> &[Indicator] {
        &self.indicators[..PRIMARY_COUNT.min(self.indicators.len())]
    }

    pub fn auxiliary(&self) -> &[Indicator] {
        &self.indicators[PRIMARY_COUNT.min(self.indicators.len())..]
    }
}

fn indicator(
    name: &str,
    value: f64,
    score: f64,
    max_score: f64,
    description: String,
    good_criteria: &str,
    category: IndicatorCategory,
) -> Indicator {
    Indicator {
        name: name.to_string(),
        value,
        score,
        max_score,
        grade: score_to_grade(score, max_score),
        description,
        good_criteria: good_criteria.to_string(),
        category,
    }
}

fn banded(table: &BandTable, value: f64) -> (f64, f64) {
    (table.score(value), table.max_score)
}

pub fn roe_indicator(current: &FinancialMetrics) -> Indicator {
    let criteria = "15% or higher, sustained";
    if current.total_equity <= 0.0 {
        return indicator(
            names::ROE,
            0.0,
            0.0,
            ROE_BANDS.max_score,
            "Capital impaired".to_string(),
            criteria,
            IndicatorCategory::Profitability,
        );
    }

    let roe = current.roe();
    let (score, max) = banded(&ROE_BANDS, roe);
    let description = if roe > 0.0 {
        format!("Earns {:.1}% on equity", roe)
    } else {
        "Loss-making".to_string()
    };
    indicator(
        names::ROE,
        round_to(roe, 1),
        score,
        max,
        description,
        criteria,
        IndicatorCategory::Profitability,
    )
}

pub fn cash_generation_indicator(current: &FinancialMetrics) -> Indicator {
    let criteria = "1.2 or higher (cash exceeds reported profit)";
    let max = CASH_GENERATION_BANDS.max_score;

    if current.net_income <= 0.0 {
        return if current.operating_cash_flow > 0.0 {
            indicator(
                names::CASH_GENERATION,
                UNBOUNDED,
                max,
                max,
                "Generates cash despite a net loss".to_string(),
                criteria,
                IndicatorCategory::CashGeneration,
            )
        } else {
            indicator(
                names::CASH_GENERATION,
                0.0,
                0.0,
                max,
                "Net loss with no operating cash inflow".to_string(),
                criteria,
                IndicatorCategory::CashGeneration,
            )
        };
    }

    let ratio = current.operating_cash_flow / current.net_income;
    let (score, max) = banded(&CASH_GENERATION_BANDS, ratio);
    indicator(
        names::CASH_GENERATION,
        round_to(ratio, 2),
        score,
        max,
        format!("Operating cash flow is {:.2}x net income", ratio),
        criteria,
        IndicatorCategory::CashGeneration,
    )
}

pub fn operating_growth_indicator(current: &FinancialMetrics, prior: &FinancialMetrics) -> Indicator {
    let criteria = "15% or higher";
    let max = GROWTH_BANDS.max_score;

    if prior.operating_income <= 0.0 {
        return if current.operating_income > 0.0 {
            indicator(
                names::OPERATING_GROWTH,
                100.0,
                max,
                max,
                "Turned to an operating profit".to_string(),
                criteria,
                IndicatorCategory::Growth,
            )
        } else {
            indicator(
                names::OPERATING_GROWTH,
                0.0,
                0.0,
                max,
                "Operating loss continues".to_string(),
                criteria,
                IndicatorCategory::Growth,
            )
        };
    }

    let growth = (current.operating_income - prior.operating_income)
        / prior.operating_income.abs()
        * 100.0;
    let (score, max) = banded(&GROWTH_BANDS, growth);
    let trend = if growth > 0.0 {
        "growth"
    } else if growth < 0.0 {
        "decline"
    } else {
        "flat"
    };
    indicator(
        names::OPERATING_GROWTH,
        round_to(growth, 1),
        score,
        max,
        format!("{:+.1}% year over year ({})", growth, trend),
        criteria,
        IndicatorCategory::Growth,
    )
}

pub fn interest_coverage_indicator(current: &FinancialMetrics) -> Indicator {
    let criteria = "3x or higher is safe, below 1x is distressed";
    let max = INTEREST_COVERAGE_BANDS.max_score;

    let Some(coverage) = current.interest_coverage() else {
        return if current.operating_income > 0.0 {
            indicator(
                names::INTEREST_COVERAGE,
                UNBOUNDED,
                max,
                max,
                "No borrowings or no interest expense".to_string(),
                criteria,
                IndicatorCategory::Stability,
            )
        } else {
            indicator(
                names::INTEREST_COVERAGE,
                0.0,
                8.0,
                max,
                "No operating profit but no interest burden either".to_string(),
                criteria,
                IndicatorCategory::Stability,
            )
        };
    };

    let (score, max) = banded(&INTEREST_COVERAGE_BANDS, coverage);
    indicator(
        names::INTEREST_COVERAGE,
        round_to(coverage, 1),
        score,
        max,
        format!("Operating income covers interest {:.1}x", coverage),
        criteria,
        IndicatorCategory::Stability,
    )
}

pub fn debt_ratio_indicator(current: &FinancialMetrics) -> Indicator {
    let criteria = "100% or lower is sound, 50% or lower is excellent";
    if current.total_equity <= 0.0 {
        return indicator(
            names::DEBT_RATIO,
            UNBOUNDED,
            0.0,
            DEBT_RATIO_BANDS.max_score,
            "Capital impaired".to_string(),
            criteria,
            IndicatorCategory::Stability,
        );
    }

    let ratio = current.debt_ratio();
    let (score, max) = banded(&DEBT_RATIO_BANDS, ratio);
    indicator(
        names::DEBT_RATIO,
        round_to(ratio, 1),
        score,
        max,
        format!("Liabilities are {:.1}% of equity", ratio),
        criteria,
        IndicatorCategory::Stability,
    )
}

pub fn roic_indicator(current: &FinancialMetrics) -> Indicator {
    let roic = current.roic();
    let (score, max) = banded(&ROIC_BANDS, roic);
    let description = if roic > 0.0 {
        format!("Earns {:.1}% on invested capital", roic)
    } else {
        "Weak return on invested capital".to_string()
    };
    indicator(
        names::ROIC,
        round_to(roic, 1),
        score,
        max,
        description,
        "15% or higher",
        IndicatorCategory::Profitability,
    )
}

pub fn operating_margin_indicator(current: &FinancialMetrics) -> Indicator {
    let margin = current.operating_margin();
    let (score, max) = banded(&OPERATING_MARGIN_BANDS, margin);
    let description = if margin > 0.0 {
        format!("{:.1}% of revenue reaches operating income", margin)
    } else {
        "No operating profit".to_string()
    };
    indicator(
        names::OPERATING_MARGIN,
        round_to(margin, 1),
        score,
        max,
        description,
        "15% or higher (pricing power)",
        IndicatorCategory::Profitability,
    )
}

pub fn retention_indicator(current: &FinancialMetrics) -> Indicator {
    let ratio = current.retention_ratio();
    let (score, max) = banded(&RETENTION_BANDS, ratio);
    let description = if ratio > 0.0 {
        format!("Retained earnings are {:.0}% of capital stock", ratio)
    } else {
        "No retained earnings".to_string()
    };
    indicator(
        names::RETENTION_RATIO,
        round_to(ratio, 1),
        score,
        max,
        description,
        "500% or higher",
        IndicatorCategory::Stability,
    )
}

/// Mean and spread of the operating margin over the terms that reported revenue
pub fn margin_stability_indicator(
    current: &FinancialMetrics,
    prior: &FinancialMetrics,
    before_prior: &FinancialMetrics,
) -> Indicator {
    let criteria = "10% or higher for three years with low volatility";
    let margins: Vec<f64> = [current, prior, before_prior]
        .into_iter()
        .filter(|m| m.revenue > 0.0)
        .map(|m| m.operating_margin())
        .collect();

    if margins.len() < 2 {
        return indicator(
            names::MARGIN_STABILITY,
            0.0,
            5.0,
            MARGIN_STABILITY_MAX,
            "Not enough history".to_string(),
            criteria,
            IndicatorCategory::Moat,
        );
    }

    let avg = mean(&margins);
    let std_dev = population_std_dev(&margins);
    indicator(
        names::MARGIN_STABILITY,
        round_to(avg, 1),
        margin_stability_score(avg, std_dev),
        MARGIN_STABILITY_MAX,
        format!(
            "{}-year average {:.1}% (volatility {:.1}%p)",
            margins.len(),
            avg,
            std_dev
        ),
        criteria,
        IndicatorCategory::Moat,
    )
}

/// Score one company.
///
/// Indicators are always computed so a disqualified company still shows its figures, but
/// the total is forced to zero and the signal to [`Signal::Disqualified`] whenever the
/// filter stage failed.
pub fn score(
    current: &FinancialMetrics,
    prior: &FinancialMetrics,
    before_prior: &FinancialMetrics,
    filter_result: &FilterResult,
) -> Scorecard {
    let indicators = vec![
        roe_indicator(current),
        cash_generation_indicator(current),
        operating_growth_indicator(current, prior),
        interest_coverage_indicator(current),
        debt_ratio_indicator(current),
        roic_indicator(current),
        operating_margin_indicator(current),
        retention_indicator(current),
        margin_stability_indicator(current, prior, before_prior),
    ];

    let primary_score: f64 = indicators[..PRIMARY_COUNT].iter().map(|i| i.score).sum();
    let auxiliary_score: f64 = indicators[PRIMARY_COUNT..].iter().map(|i| i.score).sum();

    if !filter_result.passed() {
        let reasons: Vec<&str> = filter_result
            .failed_reasons()
            .iter()
            .take(2)
            .map(String::as_str)
            .collect();
        return Scorecard {
            indicators,
            primary_score,
            auxiliary_score,
            total_score: 0.0,
            signal: Signal::Disqualified,
            recommendation: format!("Failed filters: {}", reasons.join(", ")),
        };
    }

    let total_score = round_to(primary_score + AUXILIARY_WEIGHT * auxiliary_score, 1);
    let signal = Signal::from_score(total_score);

    Scorecard {
        indicators,
        primary_score,
        auxiliary_score,
        total_score,
        signal,
        recommendation: signal.recommendation().to_string(),
    }
}
