use analysis_core::stats::growth_pct;
use analysis_core::{FinancialMetrics, Term};
use serde::{Deserialize, Serialize};

use crate::resolver::TermMetrics;
use crate::scoring::UNBOUNDED;

/// One year of the trend series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub year: i32,
    pub operating_income: f64,
    pub net_income: f64,
    pub operating_cash_flow: f64,
    pub finance_cost: f64,
    /// Growth against the previous point, `None` for the first point
    pub operating_growth: Option<f64>,
    pub net_income_growth: Option<f64>,
    pub interest_coverage: f64,
    /// Operating cash flow exceeds net income
    pub cash_quality: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSignal {
    Improving,
    Declining,
    Stable,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    /// Oldest first
    pub points: Vec<TrendPoint>,
    pub improving: Vec<String>,
    pub declining: Vec<String>,
    pub signal: TrendSignal,
}

fn has_figures(m: &FinancialMetrics) -> bool {
    [
        m.operating_income,
        m.net_income,
        m.operating_cash_flow,
        m.finance_cost,
    ]
    .iter()
    .any(|v| *v != 0.0)
}

fn build_points(year: i32, terms: &TermMetrics) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = Vec::new();

    for (offset, term) in [(2, Term::BeforePrior), (1, Term::Prior), (0, Term::Current)] {
        let m = terms.get(term);
        if !has_figures(m) {
            continue;
        }

        let (operating_growth, net_income_growth) = match points.last() {
            Some(prev) => (
                Some(growth_pct(m.operating_income, prev.operating_income).unwrap_or(0.0)),
                Some(growth_pct(m.net_income, prev.net_income).unwrap_or(0.0)),
            ),
            None => (None, None),
        };

        points.push(TrendPoint {
            year: year - offset,
            operating_income: m.operating_income,
            net_income: m.net_income,
            operating_cash_flow: m.operating_cash_flow,
            finance_cost: m.finance_cost,
            operating_growth,
            net_income_growth,
            interest_coverage: if m.finance_cost != 0.0 {
                m.operating_income / m.finance_cost
            } else {
                UNBOUNDED
            },
            cash_quality: m.operating_cash_flow > m.net_income,
        });
    }

    points
}

/// Direction of the operating growth, interest coverage and cash quality between the two
/// latest years of `terms`. `year` is the business year of the current column.
pub fn analyze_trend(year: i32, terms: &TermMetrics) -> TrendAnalysis {
    let points = build_points(year, terms);

    if points.len() < 2 {
        return TrendAnalysis {
            points,
            improving: Vec::new(),
            declining: Vec::new(),
            signal: TrendSignal::Unknown,
        };
    }
    let latest = &points[points.len() - 1];
    let previous = &points[points.len() - 2];

    let mut improving = Vec::new();
    let mut declining = Vec::new();

    let latest_growth = latest.operating_growth.unwrap_or(0.0);
    let previous_growth = previous.operating_growth.unwrap_or(0.0);
    if latest_growth > previous_growth {
        improving.push("Operating growth improving".to_string());
    } else if latest_growth < previous_growth {
        declining.push("Operating growth slowing".to_string());
    }

    if latest.interest_coverage > previous.interest_coverage {
        improving.push("Financial stability improving".to_string());
    } else if latest.interest_coverage < previous.interest_coverage {
        declining.push("Financial stability weakening".to_string());
    }

    if latest.cash_quality && !previous.cash_quality {
        improving.push("Cash flow quality improving".to_string());
    } else if !latest.cash_quality && previous.cash_quality {
        declining.push("Cash flow quality weakening".to_string());
    }

    let signal = match improving.len().cmp(&declining.len()) {
        std::cmp::Ordering::Greater => TrendSignal::Improving,
        std::cmp::Ordering::Less => TrendSignal::Declining,
        std::cmp::Ordering::Equal => TrendSignal::Stable,
    };

    TrendAnalysis {
        points,
        improving,
        declining,
        signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(operating_income: f64, net_income: f64, ocf: f64, finance_cost: f64) -> FinancialMetrics {
        FinancialMetrics {
            operating_income,
            net_income,
            operating_cash_flow: ocf,
            finance_cost,
            ..Default::default()
        }
    }

    #[test]
    fn test_improving_company() {
        let terms = TermMetrics {
            current: year(150.0, 100.0, 130.0, 10.0),
            prior: year(110.0, 80.0, 70.0, 20.0),
            before_prior: year(100.0, 70.0, 90.0, 20.0),
            substitutions: Vec::new(),
        };
        let trend = analyze_trend(2023, &terms);

        assert_eq!(trend.points.len(), 3);
        assert_eq!(trend.points[0].year, 2021);
        assert_eq!(trend.points[2].year, 2023);
        assert_eq!(trend.points[0].operating_growth, None);
        assert_eq!(trend.points[2].interest_coverage, 15.0);
        assert_eq!(trend.signal, TrendSignal::Improving);
        assert_eq!(trend.improving.len(), 3);
        assert!(trend.declining.is_empty());
    }

    #[test]
    fn test_declining_company() {
        let terms = TermMetrics {
            current: year(80.0, 90.0, 50.0, 40.0),
            prior: year(100.0, 80.0, 120.0, 20.0),
            before_prior: FinancialMetrics::default(),
            substitutions: Vec::new(),
        };
        let trend = analyze_trend(2023, &terms);

        assert_eq!(trend.points.len(), 2);
        assert_eq!(trend.points[1].operating_growth, Some(-20.0));
        assert_eq!(trend.signal, TrendSignal::Declining);
        assert_eq!(trend.declining.len(), 3);
    }

    #[test]
    fn test_single_year_is_unknown() {
        let terms = TermMetrics {
            current: year(80.0, 90.0, 50.0, 40.0),
            ..Default::default()
        };
        let trend = analyze_trend(2023, &terms);
        assert_eq!(trend.signal, TrendSignal::Unknown);
        assert_eq!(trend.points.len(), 1);
    }

    #[test]
    fn test_zero_base_growth_is_zero() {
        let terms = TermMetrics {
            current: year(50.0, 10.0, 20.0, 0.0),
            prior: year(0.0, 10.0, 20.0, 0.0),
            ..Default::default()
        };
        let trend = analyze_trend(2023, &terms);
        assert_eq!(trend.points[1].operating_growth, Some(0.0));
        assert_eq!(trend.points[1].interest_coverage, UNBOUNDED);
        assert_eq!(trend.signal, TrendSignal::Stable);
    }
}
