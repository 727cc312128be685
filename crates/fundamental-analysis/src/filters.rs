use analysis_core::{FilterResult, FilterRule, FinancialMetrics};

/// Revenue drop (in percent) beyond which a year-over-year change counts as a collapse
pub const REVENUE_COLLAPSE_PCT: f64 = -50.0;

/// Minimum operating income / finance cost
pub const MIN_INTEREST_COVERAGE: f64 = 1.0;

/// Run every disqualification rule against the current and prior term.
///
/// Rules are evaluated in a fixed order and all failures are collected; the result
/// passes only when none fired.
pub fn apply_filters(current: &FinancialMetrics, prior: &FinancialMetrics) -> FilterResult {
    let mut failures: Vec<(FilterRule, String)> = Vec::new();

    if current.operating_cash_flow < 0.0 && prior.operating_cash_flow < 0.0 {
        failures.push((
            FilterRule::NegativeOperatingCashFlow,
            "Negative operating cash flow for two consecutive years".to_string(),
        ));
    }

    if let Some(coverage) = current.interest_coverage() {
        if coverage < MIN_INTEREST_COVERAGE {
            failures.push((
                FilterRule::WeakInterestCoverage,
                format!(
                    "Interest coverage {:.1}x below {:.1}x (operating income cannot cover interest)",
                    coverage, MIN_INTEREST_COVERAGE
                ),
            ));
        }
    }

    if current.total_equity <= 0.0 {
        failures.push((
            FilterRule::CapitalImpairment,
            "Capital impairment (total equity <= 0)".to_string(),
        ));
    }

    if current.net_income < 0.0 && prior.net_income < 0.0 {
        failures.push((
            FilterRule::ConsecutiveNetLoss,
            "Net loss for two consecutive years".to_string(),
        ));
    }

    if current.operating_income < 0.0 && prior.operating_income < 0.0 {
        failures.push((
            FilterRule::ConsecutiveOperatingLoss,
            "Operating loss for two consecutive years".to_string(),
        ));
    }

    if current.revenue <= 0.0 {
        failures.push((FilterRule::RevenueCollapse, "No revenue".to_string()));
    } else if prior.revenue > 0.0 {
        let change = (current.revenue - prior.revenue) / prior.revenue * 100.0;
        if change < REVENUE_COLLAPSE_PCT {
            failures.push((
                FilterRule::RevenueCollapse,
                format!("Revenue collapsed {:.1}% year over year", change),
            ));
        }
    }

    FilterResult::from_failures(failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> FinancialMetrics {
        FinancialMetrics {
            revenue: 1000.0,
            operating_income: 150.0,
            net_income: 100.0,
            total_equity: 800.0,
            operating_cash_flow: 120.0,
            finance_cost: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_company_passes() {
        let result = apply_filters(&healthy(), &healthy());
        assert!(result.passed());
        assert!(result.failed_reasons().is_empty());
    }

    #[test]
    fn test_single_loss_year_passes() {
        let mut current = healthy();
        current.net_income = -50.0;
        current.operating_cash_flow = -10.0;
        current.operating_income = -5.0;
        current.finance_cost = 0.0;
        assert!(apply_filters(&current, &healthy()).passed());
    }

    #[test]
    fn test_negative_ocf_two_years() {
        let mut current = healthy();
        let mut prior = healthy();
        current.operating_cash_flow = -1.0;
        prior.operating_cash_flow = -1.0;
        let result = apply_filters(&current, &prior);
        assert!(!result.passed());
        assert_eq!(result.failed_rules(), &[FilterRule::NegativeOperatingCashFlow]);
    }

    #[test]
    fn test_weak_interest_coverage() {
        let mut current = healthy();
        current.finance_cost = 200.0;
        let result = apply_filters(&current, &healthy());
        assert!(result.has_failed(FilterRule::WeakInterestCoverage));
        assert!(result.failed_reasons()[0].starts_with("Interest coverage 0.8x"));
    }

    #[test]
    fn test_no_finance_cost_skips_coverage() {
        let mut current = healthy();
        current.finance_cost = 0.0;
        current.operating_income = 1.0;
        assert!(!apply_filters(&current, &healthy()).has_failed(FilterRule::WeakInterestCoverage));
    }

    #[test]
    fn test_capital_impairment() {
        let mut current = healthy();
        current.total_equity = 0.0;
        assert!(apply_filters(&current, &healthy()).has_failed(FilterRule::CapitalImpairment));
    }

    #[test]
    fn test_consecutive_losses() {
        let mut current = healthy();
        let mut prior = healthy();
        current.net_income = -1.0;
        prior.net_income = -1.0;
        current.operating_income = -1.0;
        prior.operating_income = -1.0;
        current.finance_cost = 0.0;
        let result = apply_filters(&current, &prior);
        assert_eq!(
            result.failed_rules(),
            &[FilterRule::ConsecutiveNetLoss, FilterRule::ConsecutiveOperatingLoss]
        );
    }

    #[test]
    fn test_revenue_rules() {
        let mut current = healthy();
        current.revenue = 0.0;
        let result = apply_filters(&current, &healthy());
        assert_eq!(result.failed_reasons(), &["No revenue".to_string()]);

        current.revenue = 400.0;
        let result = apply_filters(&current, &healthy());
        assert_eq!(
            result.failed_reasons(),
            &["Revenue collapsed -60.0% year over year".to_string()]
        );

        current.revenue = 500.0;
        assert!(apply_filters(&current, &healthy()).passed());
    }

    #[test]
    fn test_prior_without_revenue_skips_collapse_check() {
        let mut prior = healthy();
        prior.revenue = 0.0;
        assert!(apply_filters(&healthy(), &prior).passed());
    }

    #[test]
    fn test_failures_keep_evaluation_order() {
        let current = FinancialMetrics {
            operating_cash_flow: -1.0,
            net_income: -1.0,
            operating_income: -1.0,
            finance_cost: 5.0,
            ..Default::default()
        };
        let result = apply_filters(&current, &current);
        assert_eq!(
            result.failed_rules(),
            &[
                FilterRule::NegativeOperatingCashFlow,
                FilterRule::WeakInterestCoverage,
                FilterRule::CapitalImpairment,
                FilterRule::ConsecutiveNetLoss,
                FilterRule::ConsecutiveOperatingLoss,
                FilterRule::RevenueCollapse,
            ]
        );
    }
}
