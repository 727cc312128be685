use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::{parse_amount, parse_reported_amount};

/// Financial statement a line item belongs to (DART `sj_div`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatementType {
    #[serde(rename = "IS")]
    IncomeStatement,
    #[serde(rename = "CIS")]
    ComprehensiveIncome,
    #[serde(rename = "BS")]
    BalanceSheet,
    #[serde(rename = "CF")]
    CashFlow,
}

impl StatementType {
    pub fn code(&self) -> &'static str {
        match self {
            StatementType::IncomeStatement => "IS",
            StatementType::ComprehensiveIncome => "CIS",
            StatementType::BalanceSheet => "BS",
            StatementType::CashFlow => "CF",
        }
    }

    /// Returns `None` for statement kinds the analysis does not read (e.g. `SCE`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "IS" => Some(StatementType::IncomeStatement),
            "CIS" => Some(StatementType::ComprehensiveIncome),
            "BS" => Some(StatementType::BalanceSheet),
            "CF" => Some(StatementType::CashFlow),
            _ => None,
        }
    }

    /// IS and CIS share one set of extraction rules
    pub fn is_income(&self) -> bool {
        matches!(
            self,
            StatementType::IncomeStatement | StatementType::ComprehensiveIncome
        )
    }
}

/// Reporting period a column of amounts refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Current,
    Prior,
    BeforePrior,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::Current, Term::Prior, Term::BeforePrior];

    /// DART response column holding this term's amount
    pub fn column_key(&self) -> &'static str {
        match self {
            Term::Current => "thstrm_amount",
            Term::Prior => "frmtrm_amount",
            Term::BeforePrior => "bfefrmtrm_amount",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Term::Current => "current year",
            Term::Prior => "prior year",
            Term::BeforePrior => "year before prior",
        }
    }
}

/// Consolidated group statements vs. parent-only statements (DART `fs_div`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Consolidation {
    #[serde(rename = "CFS")]
    Consolidated,
    #[serde(rename = "OFS")]
    Separate,
}

impl Consolidation {
    pub fn code(&self) -> &'static str {
        match self {
            Consolidation::Consolidated => "CFS",
            Consolidation::Separate => "OFS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CFS" => Some(Consolidation::Consolidated),
            "OFS" => Some(Consolidation::Separate),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Consolidation::Consolidated => "consolidated",
            Consolidation::Separate => "parent-only",
        }
    }
}

impl fmt::Display for Consolidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Disclosure filing kind (DART `reprt_code`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    #[serde(rename = "11011")]
    Annual,
    #[serde(rename = "11012")]
    SemiAnnual,
    #[serde(rename = "11013")]
    FirstQuarter,
    #[serde(rename = "11014")]
    ThirdQuarter,
}

impl ReportType {
    pub fn code(&self) -> &'static str {
        match self {
            ReportType::Annual => "11011",
            ReportType::SemiAnnual => "11012",
            ReportType::FirstQuarter => "11013",
            ReportType::ThirdQuarter => "11014",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "11011" => Some(ReportType::Annual),
            "11012" => Some(ReportType::SemiAnnual),
            "11013" => Some(ReportType::FirstQuarter),
            "11014" => Some(ReportType::ThirdQuarter),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportType::Annual => "annual report",
            ReportType::SemiAnnual => "semi-annual report",
            ReportType::FirstQuarter => "Q1 report",
            ReportType::ThirdQuarter => "Q3 report",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One combination the orchestrator may ask a [`crate::StatementSource`] for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementRequest {
    pub corp_code: String,
    pub year: i32,
    pub report: ReportType,
    pub consolidation: Consolidation,
}

impl StatementRequest {
    pub fn new(
        corp_code: impl Into<String>,
        year: i32,
        report: ReportType,
        consolidation: Consolidation,
    ) -> Self {
        Self {
            corp_code: corp_code.into(),
            year,
            report,
            consolidation,
        }
    }
}

impl fmt::Display for StatementRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.consolidation, self.year, self.report)
    }
}

/// A single row of a disclosed financial statement.
///
/// Amounts stay as the raw strings the filer reported; parsing happens through
/// [`LineItem::amount`] so a blank column can be told apart from a reported zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub statement_type: StatementType,
    pub account_code: String,
    pub account_name: String,
    pub amounts: BTreeMap<Term, String>,
}

impl LineItem {
    pub fn new(
        statement_type: StatementType,
        account_code: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            statement_type,
            account_code: account_code.into(),
            account_name: account_name.into(),
            amounts: BTreeMap::new(),
        }
    }

    pub fn with_amount(mut self, term: Term, raw: impl Into<String>) -> Self {
        self.amounts.insert(term, raw.into());
        self
    }

    pub fn raw_amount(&self, term: Term) -> Option<&str> {
        self.amounts.get(&term).map(String::as_str)
    }

    /// Parsed amount, `0.0` when blank or malformed
    pub fn amount(&self, term: Term) -> f64 {
        parse_amount(self.raw_amount(term))
    }

    /// Parsed amount, `None` when the filer left the column blank
    pub fn reported_amount(&self, term: Term) -> Option<f64> {
        parse_reported_amount(self.raw_amount(term))
    }
}

/// Field of [`FinancialMetrics`], used as the target of extraction rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    Revenue,
    CostOfSales,
    GrossProfit,
    OperatingIncome,
    FinanceCost,
    NetIncome,
    TotalAssets,
    CurrentAssets,
    CashAndEquivalents,
    TotalLiabilities,
    CurrentLiabilities,
    TotalEquity,
    CapitalStock,
    RetainedEarnings,
    OperatingCashFlow,
    InvestingCashFlow,
    FinancingCashFlow,
}

impl MetricField {
    pub const ALL: [MetricField; 17] = [
        MetricField::Revenue,
        MetricField::CostOfSales,
        MetricField::GrossProfit,
        MetricField::OperatingIncome,
        MetricField::FinanceCost,
        MetricField::NetIncome,
        MetricField::TotalAssets,
        MetricField::CurrentAssets,
        MetricField::CashAndEquivalents,
        MetricField::TotalLiabilities,
        MetricField::CurrentLiabilities,
        MetricField::TotalEquity,
        MetricField::CapitalStock,
        MetricField::RetainedEarnings,
        MetricField::OperatingCashFlow,
        MetricField::InvestingCashFlow,
        MetricField::FinancingCashFlow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricField::Revenue => "revenue",
            MetricField::CostOfSales => "cost_of_sales",
            MetricField::GrossProfit => "gross_profit",
            MetricField::OperatingIncome => "operating_income",
            MetricField::FinanceCost => "finance_cost",
            MetricField::NetIncome => "net_income",
            MetricField::TotalAssets => "total_assets",
            MetricField::CurrentAssets => "current_assets",
            MetricField::CashAndEquivalents => "cash_and_equivalents",
            MetricField::TotalLiabilities => "total_liabilities",
            MetricField::CurrentLiabilities => "current_liabilities",
            MetricField::TotalEquity => "total_equity",
            MetricField::CapitalStock => "capital_stock",
            MetricField::RetainedEarnings => "retained_earnings",
            MetricField::OperatingCashFlow => "operating_cash_flow",
            MetricField::InvestingCashFlow => "investing_cash_flow",
            MetricField::FinancingCashFlow => "financing_cash_flow",
        }
    }
}

/// Normalized figures for one term of one filing. Every field defaults to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    // Income statement
    pub revenue: f64,
    pub cost_of_sales: f64,
    pub gross_profit: f64,
    pub operating_income: f64,
    pub finance_cost: f64,
    pub net_income: f64,

    // Balance sheet
    pub total_assets: f64,
    pub current_assets: f64,
    pub cash_and_equivalents: f64,
    pub total_liabilities: f64,
    pub current_liabilities: f64,
    pub total_equity: f64,
    pub capital_stock: f64,
    pub retained_earnings: f64,

    // Cash flow statement
    pub operating_cash_flow: f64,
    pub investing_cash_flow: f64,
    pub financing_cash_flow: f64,
}

impl FinancialMetrics {
    pub fn get(&self, field: MetricField) -> f64 {
        match field {
            MetricField::Revenue => self.revenue,
            MetricField::CostOfSales => self.cost_of_sales,
            MetricField::GrossProfit => self.gross_profit,
            MetricField::OperatingIncome => self.operating_income,
            MetricField::FinanceCost => self.finance_cost,
            MetricField::NetIncome => self.net_income,
            MetricField::TotalAssets => self.total_assets,
            MetricField::CurrentAssets => self.current_assets,
            MetricField::CashAndEquivalents => self.cash_and_equivalents,
            MetricField::TotalLiabilities => self.total_liabilities,
            MetricField::CurrentLiabilities => self.current_liabilities,
            MetricField::TotalEquity => self.total_equity,
            MetricField::CapitalStock => self.capital_stock,
            MetricField::RetainedEarnings => self.retained_earnings,
            MetricField::OperatingCashFlow => self.operating_cash_flow,
            MetricField::InvestingCashFlow => self.investing_cash_flow,
            MetricField::FinancingCashFlow => self.financing_cash_flow,
        }
    }

    pub fn slot_mut(&mut self, field: MetricField) -> &mut f64 {
        match field {
            MetricField::Revenue => &mut self.revenue,
            MetricField::CostOfSales => &mut self.cost_of_sales,
            MetricField::GrossProfit => &mut self.gross_profit,
            MetricField::OperatingIncome => &mut self.operating_income,
            MetricField::FinanceCost => &mut self.finance_cost,
            MetricField::NetIncome => &mut self.net_income,
            MetricField::TotalAssets => &mut self.total_assets,
            MetricField::CurrentAssets => &mut self.current_assets,
            MetricField::CashAndEquivalents => &mut self.cash_and_equivalents,
            MetricField::TotalLiabilities => &mut self.total_liabilities,
            MetricField::CurrentLiabilities => &mut self.current_liabilities,
            MetricField::TotalEquity => &mut self.total_equity,
            MetricField::CapitalStock => &mut self.capital_stock,
            MetricField::RetainedEarnings => &mut self.retained_earnings,
            MetricField::OperatingCashFlow => &mut self.operating_cash_flow,
            MetricField::InvestingCashFlow => &mut self.investing_cash_flow,
            MetricField::FinancingCashFlow => &mut self.financing_cash_flow,
        }
    }

    pub fn set(&mut self, field: MetricField, value: f64) {
        *self.slot_mut(field) = value;
    }

    /// Operating income / revenue × 100, zero without revenue
    pub fn operating_margin(&self) -> f64 {
        if self.revenue > 0.0 {
            self.operating_income / self.revenue * 100.0
        } else {
            0.0
        }
    }

    /// Net income / total equity × 100, zero when equity is impaired
    pub fn roe(&self) -> f64 {
        if self.total_equity > 0.0 {
            self.net_income / self.total_equity * 100.0
        } else {
            0.0
        }
    }

    /// Approximate return on invested capital.
    ///
    /// NOPAT assumes a 25% tax rate; invested capital treats half of total liabilities as
    /// interest-bearing and nets out cash.
    pub fn roic(&self) -> f64 {
        let nopat = self.operating_income * 0.75;
        let invested_capital =
            self.total_equity + self.total_liabilities * 0.5 - self.cash_and_equivalents;
        if invested_capital > 0.0 {
            nopat / invested_capital * 100.0
        } else {
            0.0
        }
    }

    /// Total liabilities / total equity × 100, 999 when equity is impaired
    pub fn debt_ratio(&self) -> f64 {
        if self.total_equity > 0.0 {
            self.total_liabilities / self.total_equity * 100.0
        } else {
            999.0
        }
    }

    /// Retained earnings / capital stock × 100
    pub fn retention_ratio(&self) -> f64 {
        if self.capital_stock > 0.0 {
            self.retained_earnings / self.capital_stock * 100.0
        } else {
            0.0
        }
    }

    /// Operating income / finance cost, `None` when there is no finance cost
    pub fn interest_coverage(&self) -> Option<f64> {
        if self.finance_cost > 0.0 {
            Some(self.operating_income / self.finance_cost)
        } else {
            None
        }
    }
}

/// A current-term field the fallback resolver filled from an earlier column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub field: MetricField,
    pub source: Term,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorCategory {
    Profitability,
    CashGeneration,
    Growth,
    Stability,
    Moat,
}

impl IndicatorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorCategory::Profitability => "profitability",
            IndicatorCategory::CashGeneration => "cash generation",
            IndicatorCategory::Growth => "growth",
            IndicatorCategory::Stability => "stability",
            IndicatorCategory::Moat => "moat",
        }
    }
}

/// Output of one scoring rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    pub value: f64,
    pub score: f64,
    pub max_score: f64,
    pub grade: String,
    pub description: String,
    pub good_criteria: String,
    pub category: IndicatorCategory,
}

/// Hard disqualification rules, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRule {
    NegativeOperatingCashFlow,
    WeakInterestCoverage,
    CapitalImpairment,
    ConsecutiveNetLoss,
    ConsecutiveOperatingLoss,
    RevenueCollapse,
}

/// Outcome of the filter stage. `passed` holds exactly when no rule failed.
///
/// `passed` is serialized for readers but recomputed on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FilterResultRepr")]
pub struct FilterResult {
    passed: bool,
    failed_rules: Vec<FilterRule>,
    failed_reasons: Vec<String>,
}

#[derive(Deserialize)]
struct FilterResultRepr {
    #[serde(default)]
    failed_rules: Vec<FilterRule>,
    #[serde(default)]
    failed_reasons: Vec<String>,
}

impl From<FilterResultRepr> for FilterResult {
    fn from(repr: FilterResultRepr) -> Self {
        Self {
            passed: repr.failed_rules.is_empty() && repr.failed_reasons.is_empty(),
            failed_rules: repr.failed_rules,
            failed_reasons: repr.failed_reasons,
        }
    }
}

impl FilterResult {
    pub fn from_failures(failures: Vec<(FilterRule, String)>) -> Self {
        let (failed_rules, failed_reasons): (Vec<_>, Vec<_>) = failures.into_iter().unzip();
        Self {
            passed: failed_reasons.is_empty(),
            failed_rules,
            failed_reasons,
        }
    }

    /// A result with a single externally decided failure (e.g. the listing pre-filter)
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            failed_rules: Vec::new(),
            failed_reasons: vec![reason.into()],
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn failed_rules(&self) -> &[FilterRule] {
        &self.failed_rules
    }

    pub fn failed_reasons(&self) -> &[String] {
        &self.failed_reasons
    }

    pub fn has_failed(&self, rule: FilterRule) -> bool {
        self.failed_rules.contains(&rule)
    }
}

/// 10-tier trading signal plus the filter-gated `Disqualified` state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    SStrongBuy,
    AStrongBuy,
    ABuy,
    BBuy,
    BHoldBuyBias,
    CHold,
    CHoldSellBias,
    DSell,
    DStrongSell,
    FAvoid,
    Disqualified,
}

impl Signal {
    /// Tier for a score that already passed the filters
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Signal::SStrongBuy,
            s if s >= 80.0 => Signal::AStrongBuy,
            s if s >= 72.0 => Signal::ABuy,
            s if s >= 65.0 => Signal::BBuy,
            s if s >= 58.0 => Signal::BHoldBuyBias,
            s if s >= 50.0 => Signal::CHold,
            s if s >= 42.0 => Signal::CHoldSellBias,
            s if s >= 35.0 => Signal::DSell,
            s if s >= 25.0 => Signal::DStrongSell,
            _ => Signal::FAvoid,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Signal::SStrongBuy => "S Strong Buy",
            Signal::AStrongBuy => "A Strong Buy",
            Signal::ABuy => "A Buy",
            Signal::BBuy => "B Buy",
            Signal::BHoldBuyBias => "B Hold (Buy Bias)",
            Signal::CHold => "C Hold",
            Signal::CHoldSellBias => "C Hold (Sell Bias)",
            Signal::DSell => "D Sell",
            Signal::DStrongSell => "D Strong Sell",
            Signal::FAvoid => "F Avoid",
            Signal::Disqualified => "Disqualified",
        }
    }

    /// Label used by the Korean-language screener tables
    pub fn label_ko(&self) -> &'static str {
        match self {
            Signal::SStrongBuy => "S급 강력매수",
            Signal::AStrongBuy => "A급 강력매수",
            Signal::ABuy => "A급 매수",
            Signal::BBuy => "B급 매수",
            Signal::BHoldBuyBias => "B급 관망(매수우위)",
            Signal::CHold => "C급 관망",
            Signal::CHoldSellBias => "C급 관망(매도우위)",
            Signal::DSell => "D급 매도",
            Signal::DStrongSell => "D급 강력매도",
            Signal::FAvoid => "F급 회피",
            Signal::Disqualified => "투자부적격",
        }
    }

    /// Canned recommendation for the tier. `Disqualified` gets its text from the filter
    /// reasons instead.
    pub fn recommendation(&self) -> &'static str {
        match self {
            Signal::SStrongBuy => "Top-tier company with durable economics. Strong long-term hold.",
            Signal::AStrongBuy => "Meets every value criterion. Suitable for long-term investment.",
            Signal::ABuy => "Most indicators are excellent. Worth an active investment review.",
            Signal::BBuy => "Key indicators are sound. Investment review recommended.",
            Signal::BHoldBuyBias => "Reasonably good. Consider investing after further analysis.",
            Signal::CHold => "Some indicators fall short. Review carefully.",
            Signal::CHoldSellBias => "Several negative indicators. Invest with caution.",
            Signal::DSell => "Many indicators are negative. Consider exiting if held.",
            Signal::DStrongSell => "Most indicators miss the criteria. Avoid.",
            Signal::FAvoid => "Serious financial weakness. Do not invest.",
            Signal::Disqualified => "Failed the disqualification filters.",
        }
    }

    pub fn is_disqualified(&self) -> bool {
        matches!(self, Signal::Disqualified)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Complete analysis of one company for one requested (year, consolidation).
///
/// Built once by the orchestrator and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub corp_code: String,
    pub corp_name: String,
    pub requested_year: i32,
    pub requested_consolidation: Consolidation,
    /// Year, consolidation and report type the figures actually came from
    pub year: i32,
    pub consolidation: Consolidation,
    pub report: ReportType,
    pub indicators: Vec<Indicator>,
    pub total_score: f64,
    pub signal: Signal,
    pub recommendation: String,
    pub filter_result: FilterResult,
    pub current: FinancialMetrics,
    pub prior: FinancialMetrics,
    pub before_prior: FinancialMetrics,
    pub substitutions: Vec<Substitution>,
    pub data_source: String,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// True when any of year, consolidation or report type differs from the request
    pub fn used_fallback(&self) -> bool {
        self.year != self.requested_year
            || self.consolidation != self.requested_consolidation
            || self.report != ReportType::Annual
    }

    pub fn indicator(&self, name: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.name == name)
    }
}
