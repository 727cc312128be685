//! Maps heterogeneous disclosure line items onto [`FinancialMetrics`].
//!
//! Filers label the same concept under IFRS/DART account codes, under free-text Korean
//! names, or both, and a single response may repeat a concept in consolidated and
//! parent-only sub-tables. Classification therefore runs an ordered rule table per
//! statement family:
//!
//! * exclusion rules are checked first and drop the row outright (combined
//!   liabilities+equity totals, pre-tax income, comprehensive income, ...);
//! * inclusion rules are checked top to bottom and the first match picks the field, so
//!   specific matches must sit above the loose substring matches they would otherwise lose
//!   to;
//! * when several rows land on the same field the largest amount wins;
//! * fallback rules (parent-attributable figures) only fill a field that no regular rule
//!   populated, so a group total always takes precedence over its components.
//!
//! The tables are plain data. New account-naming quirks are added as rows, not as
//! control flow.

use std::collections::HashSet;

use analysis_core::{FinancialMetrics, LineItem, MetricField, StatementType, Term};

/// Lowercased account code and normalized account name of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub code: String,
    pub name: String,
}

impl AccountKey {
    pub fn new(account_code: &str, account_name: &str) -> Self {
        Self {
            code: account_code.trim().to_lowercase(),
            name: normalize_name(account_name),
        }
    }

    pub fn from_item(item: &LineItem) -> Self {
        Self::new(&item.account_code, &item.account_name)
    }
}

/// Strip whitespace and punctuation so `"자본 총계"`, `"자본총계"` and `"(자본총계)"` compare equal
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| {
            !c.is_whitespace()
                && !c.is_ascii_punctuation()
                && !matches!(c, '·' | 'ㆍ' | '・' | '（' | '）' | '［' | '］' | '【' | '】' | '「' | '」')
        })
        .collect()
}

/// Predicate over an [`AccountKey`]
#[derive(Debug, Clone, Copy)]
pub enum Cond {
    /// Lowercased account code contains the fragment
    Code(&'static str),
    /// Normalized account name contains the fragment
    Name(&'static str),
    /// Normalized account name equals the value
    NameIs(&'static str),
    Not(&'static Cond),
    All(&'static [Cond]),
    Any(&'static [Cond]),
}

impl Cond {
    pub fn matches(&self, key: &AccountKey) -> bool {
        match self {
            Cond::Code(fragment) => key.code.contains(fragment),
            Cond::Name(fragment) => key.name.contains(fragment),
            Cond::NameIs(value) => key.name == *value,
            Cond::Not(inner) => !inner.matches(key),
            Cond::All(conds) => conds.iter().all(|c| c.matches(key)),
            Cond::Any(conds) => conds.iter().any(|c| c.matches(key)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Assign(MetricField),
    /// Used only when no `Assign` row fed the field
    Fallback(MetricField),
    Exclude,
}

impl Action {
    pub fn field(&self) -> Option<MetricField> {
        match self {
            Action::Assign(field) | Action::Fallback(field) => Some(*field),
            Action::Exclude => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub when: Cond,
    pub action: Action,
}

impl Rule {
    pub const fn assign(field: MetricField, when: Cond) -> Self {
        Self {
            when,
            action: Action::Assign(field),
        }
    }

    pub const fn fallback(field: MetricField, when: Cond) -> Self {
        Self {
            when,
            action: Action::Fallback(field),
        }
    }

    pub const fn exclude(when: Cond) -> Self {
        Self {
            when,
            action: Action::Exclude,
        }
    }
}

use Cond::{All, Any, Code, Name, NameIs, Not};
use MetricField as F;

/// IS and CIS rows
pub static INCOME_RULES: &[Rule] = &[
    Rule::exclude(Any(&[
        Name("법인세비용차감전"),
        Code("beforetax"),
        Code("comprehensiveincome"),
        Name("총포괄"),
        Code("noncontrolling"),
        Code("minority"),
        Name("비지배"),
        Code("continuingoperations"),
        Code("discontinuedoperation"),
        Name("계속영업"),
        Name("중단영업"),
        Code("pershare"),
        Name("주당이익"),
        Name("주당순이익"),
        Name("주당손실"),
        Name("주당순손익"),
    ])),
    Rule::assign(
        F::Revenue,
        Any(&[Code("revenue"), Name("매출액"), NameIs("매출"), NameIs("영업수익")]),
    ),
    Rule::assign(F::CostOfSales, Any(&[Code("costofsales"), Name("매출원가")])),
    Rule::assign(F::GrossProfit, Any(&[Code("grossprofit"), Name("매출총이익")])),
    Rule::assign(
        F::OperatingIncome,
        Any(&[Code("operatingincome"), Name("영업이익"), Name("영업손익")]),
    ),
    Rule::assign(
        F::FinanceCost,
        Any(&[
            Name("금융비용"),
            Name("금융원가"),
            Name("이자비용"),
            Code("financecost"),
        ]),
    ),
    Rule::fallback(
        F::NetIncome,
        Any(&[
            Code("attributabletoownersofparent"),
            All(&[
                Any(&[Name("지배기업"), Name("지배주주")]),
                Any(&[Name("이익"), Name("손익")]),
                Not(&Name("포괄")),
            ]),
        ]),
    ),
    Rule::assign(
        F::NetIncome,
        All(&[
            Code("profitloss"),
            Not(&Code("comprehensive")),
            Not(&Code("attributableto")),
        ]),
    ),
    Rule::assign(F::NetIncome, Any(&[Code("netincome"), Code("netprofit")])),
    Rule::assign(
        F::NetIncome,
        Any(&[
            Name("당기순이익"),
            Name("당기순손익"),
            Name("분기순이익"),
            Name("반기순이익"),
            Name("연결당기순이익"),
            Name("연결순이익"),
        ]),
    ),
    Rule::assign(
        F::NetIncome,
        All(&[Any(&[Name("순이익"), Name("순손익")]), Not(&Name("포괄"))]),
    ),
];

/// BS rows
pub static BALANCE_RULES: &[Rule] = &[
    // Combined "equity and liabilities" totals would otherwise satisfy both the liability
    // and the equity rules.
    Rule::exclude(Any(&[
        Name("자본과부채"),
        Name("부채와자본"),
        Code("equityandliabilities"),
        Code("liabilitiesandequity"),
    ])),
    // Equity components and minority stakes are parts of the equity total
    Rule::exclude(Any(&[
        Code("componentsofequity"),
        Code("otherstockholdersequity"),
        Code("otherequity"),
        Name("기타자본"),
        Code("noncontrolling"),
        Code("minority"),
        Name("비지배"),
    ])),
    Rule::assign(
        F::TotalAssets,
        All(&[Code("assets"), Not(&Code("current")), Not(&Code("net"))]),
    ),
    Rule::assign(
        F::TotalAssets,
        Any(&[Name("자산총계"), NameIs("자산"), NameIs("자산계")]),
    ),
    Rule::assign(
        F::CurrentAssets,
        All(&[
            Any(&[Code("currentassets"), Name("유동자산")]),
            Not(&Code("noncurrent")),
            Not(&Name("비유동")),
        ]),
    ),
    Rule::assign(
        F::CashAndEquivalents,
        All(&[Code("cash"), Code("equivalent")]),
    ),
    Rule::assign(
        F::CashAndEquivalents,
        Any(&[
            Name("현금및현금성자산"),
            Name("현금및현금등가물"),
            NameIs("현금"),
            NameIs("현금및예치금"),
        ]),
    ),
    Rule::assign(
        F::TotalLiabilities,
        All(&[
            Code("liabilities"),
            Not(&Code("current")),
            Not(&Code("asset")),
        ]),
    ),
    Rule::assign(
        F::TotalLiabilities,
        Any(&[NameIs("부채총계"), NameIs("부채"), NameIs("부채계")]),
    ),
    Rule::assign(
        F::CurrentLiabilities,
        All(&[
            Any(&[Code("currentliabilities"), Name("유동부채")]),
            Not(&Code("noncurrent")),
            Not(&Name("비유동")),
        ]),
    ),
    Rule::fallback(
        F::TotalEquity,
        Any(&[
            Code("attributabletoownersofparent"),
            All(&[Name("지배기업"), Any(&[Name("지분"), Name("자본")])]),
            Name("지배주주지분"),
        ]),
    ),
    Rule::assign(
        F::TotalEquity,
        All(&[Code("equity"), Not(&Code("retained"))]),
    ),
    Rule::assign(
        F::TotalEquity,
        Any(&[NameIs("자본총계"), NameIs("자본"), NameIs("자본계")]),
    ),
    Rule::assign(
        F::RetainedEarnings,
        Any(&[Code("retainedearnings"), Name("이익잉여금")]),
    ),
    Rule::assign(
        F::CapitalStock,
        Any(&[Code("issuedcapital"), Code("sharecapital")]),
    ),
    Rule::assign(
        F::CapitalStock,
        Any(&[NameIs("자본금"), NameIs("보통주자본금"), NameIs("납입자본")]),
    ),
    Rule::assign(
        F::CapitalStock,
        All(&[Name("자본금"), Not(&Name("잉여금"))]),
    ),
];

/// CF rows
pub static CASH_FLOW_RULES: &[Rule] = &[
    // Working-capital adjustment lines reuse the "operating" wording
    Rule::exclude(Any(&[
        Code("adjustments"),
        Code("increasedecrease"),
        Name("자산부채의변동"),
    ])),
    // Interest, dividend and tax lines are tagged with the activity they are classified in
    Rule::exclude(Any(&[
        Code("classifiedasoperatingactivities"),
        Code("classifiedasinvestingactivities"),
        Code("classifiedasfinancingactivities"),
        Code("interestreceived"),
        Code("interestpaid"),
        Code("dividendsreceived"),
        Code("dividendspaid"),
        Code("incometaxespaid"),
        Code("incometaxesrefund"),
        Name("이자의수취"),
        Name("이자수취"),
        Name("이자의지급"),
        Name("이자지급"),
        Name("배당금의수취"),
        Name("배당금수취"),
        Name("배당금의지급"),
        Name("배당금지급"),
        Name("법인세의납부"),
        Name("법인세납부"),
        Name("법인세환급"),
    ])),
    Rule::assign(
        F::OperatingCashFlow,
        Any(&[Code("operatingactivities"), Name("영업활동")]),
    ),
    Rule::assign(
        F::InvestingCashFlow,
        Any(&[Code("investingactivities"), Name("투자활동")]),
    ),
    Rule::assign(
        F::FinancingCashFlow,
        Any(&[Code("financingactivities"), Name("재무활동")]),
    ),
];

/// Rule tables for the three statement families
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub income: Vec<Rule>,
    pub balance: Vec<Rule>,
    pub cash_flow: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            income: INCOME_RULES.to_vec(),
            balance: BALANCE_RULES.to_vec(),
            cash_flow: CASH_FLOW_RULES.to_vec(),
        }
    }
}

impl RuleSet {
    pub fn rules_for(&self, statement: StatementType) -> &[Rule] {
        match statement {
            StatementType::IncomeStatement | StatementType::ComprehensiveIncome => &self.income,
            StatementType::BalanceSheet => &self.balance,
            StatementType::CashFlow => &self.cash_flow,
        }
    }

    /// Insert `rule` ahead of every existing inclusion rule of the family
    pub fn prepend(&mut self, statement: StatementType, rule: Rule) {
        let rules = match statement {
            StatementType::IncomeStatement | StatementType::ComprehensiveIncome => &mut self.income,
            StatementType::BalanceSheet => &mut self.balance,
            StatementType::CashFlow => &mut self.cash_flow,
        };
        rules.insert(0, rule);
    }

    /// Action of the first inclusion rule matching the row, or `None` when it is excluded or
    /// unrecognized.
    ///
    /// Exclusions are evaluated before any inclusion regardless of their position in
    /// the table.
    pub fn match_row(&self, statement: StatementType, key: &AccountKey) -> Option<Action> {
        let rules = self.rules_for(statement);

        let excluded = rules
            .iter()
            .any(|r| r.action == Action::Exclude && r.when.matches(key));
        if excluded {
            return None;
        }

        rules
            .iter()
            .find(|r| r.action != Action::Exclude && r.when.matches(key))
            .map(|r| r.action)
    }

    /// Field a row feeds, whether as a regular or a fallback match
    pub fn classify(&self, statement: StatementType, key: &AccountKey) -> Option<MetricField> {
        self.match_row(statement, key).and_then(|action| action.field())
    }
}

/// Line-item to metric mapper
#[derive(Debug, Clone, Default)]
pub struct MetricExtractor {
    rules: RuleSet,
}

impl MetricExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Extract one term's metrics.
    ///
    /// Rows with a blank amount for `term` are skipped. The first matching row populates a
    /// field and later matches keep the maximum, so the result is independent of row
    /// order and of duplicated rows. Fallback matches are merged the same way and only
    /// fill fields left empty by regular matches.
    pub fn extract(&self, items: &[LineItem], term: Term) -> FinancialMetrics {
        let mut metrics = FinancialMetrics::default();
        let mut populated: HashSet<MetricField> = HashSet::new();
        let mut fallback = FinancialMetrics::default();
        let mut fallback_populated: HashSet<MetricField> = HashSet::new();

        for item in items {
            let Some(amount) = item.reported_amount(term) else {
                continue;
            };
            let key = AccountKey::from_item(item);
            match self.rules.match_row(item.statement_type, &key) {
                Some(Action::Assign(field)) => merge_max(&mut metrics, &mut populated, field, amount),
                Some(Action::Fallback(field)) => {
                    merge_max(&mut fallback, &mut fallback_populated, field, amount)
                }
                _ => {}
            }
        }

        for field in fallback_populated {
            if !populated.contains(&field) {
                metrics.set(field, fallback.get(field));
            }
        }

        metrics
    }
}

fn merge_max(
    metrics: &mut FinancialMetrics,
    populated: &mut HashSet<MetricField>,
    field: MetricField,
    amount: f64,
) {
    let slot = metrics.slot_mut(field);
    if populated.insert(field) {
        *slot = amount;
    } else {
        *slot = slot.max(amount);
    }
}

/// [`MetricExtractor::extract`] with the built-in rule tables
pub fn extract(items: &[LineItem], term: Term) -> FinancialMetrics {
    MetricExtractor::default().extract(items, term)
}
