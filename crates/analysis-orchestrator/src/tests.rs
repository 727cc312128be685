use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use analysis_core::{AnalysisError, Signal, StatementType, Term};
use approx::assert_relative_eq;
use async_trait::async_trait;

/// In-memory statement store keyed by the exact request
#[derive(Default)]
struct FakeSource {
    filings: HashMap<StatementRequest, Vec<LineItem>>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn with(mut self, corp_code: &str, year: i32, report: ReportType, fs: Consolidation, items: Vec<LineItem>) -> Self {
        self.filings
            .insert(StatementRequest::new(corp_code, year, report, fs), items);
        self
    }
}

#[async_trait]
impl StatementSource for FakeSource {
    async fn fetch_statements(
        &self,
        request: &StatementRequest,
    ) -> Result<Vec<LineItem>, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.filings.get(request).cloned().unwrap_or_default())
    }
}

/// Fails every call except for the listed requests
struct FlakySource {
    inner: FakeSource,
}

#[async_trait]
impl StatementSource for FlakySource {
    async fn fetch_statements(
        &self,
        request: &StatementRequest,
    ) -> Result<Vec<LineItem>, AnalysisError> {
        match self.inner.fetch_statements(request).await? {
            items if items.is_empty() => Err(AnalysisError::ApiError("connection reset".to_string())),
            items => Ok(items),
        }
    }
}

fn row(statement: StatementType, code: &str, name: &str, current: &str, prior: &str) -> LineItem {
    LineItem::new(statement, code, name)
        .with_amount(Term::Current, current)
        .with_amount(Term::Prior, prior)
}

fn steady_company() -> Vec<LineItem> {
    use StatementType::*;
    vec![
        row(IncomeStatement, "ifrs-full_Revenue", "매출액", "2,000", "2,000"),
        row(IncomeStatement, "dart_OperatingIncomeLoss", "영업이익", "300", "300"),
        row(IncomeStatement, "ifrs-full_FinanceCosts", "금융원가", "100", "100"),
        row(IncomeStatement, "ifrs-full_ProfitLoss", "당기순이익", "200", "200"),
        row(BalanceSheet, "ifrs-full_Equity", "자본총계", "1,000", "1,000"),
        row(CashFlow, "ifrs-full_CashFlowsFromUsedInOperatingActivities", "영업활동현금흐름", "250", "250"),
    ]
}

fn impaired_company() -> Vec<LineItem> {
    let mut items = steady_company();
    items[4] = row(StatementType::BalanceSheet, "ifrs-full_Equity", "자본총계", "-50", "1,000");
    items
}

fn orchestrator(source: impl StatementSource + 'static) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(Arc::new(source), AnalyzerConfig::default())
}

#[tokio::test]
async fn test_requested_combination_is_used_directly() {
    let source = FakeSource::default().with(
        "00126380",
        2023,
        ReportType::Annual,
        Consolidation::Consolidated,
        steady_company(),
    );
    let outcome = orchestrator(source)
        .analyze("00126380", "삼성전자", 2023, Consolidation::Consolidated)
        .await;

    let result = outcome.into_result().unwrap();
    assert_eq!(result.year, 2023);
    assert_eq!(result.consolidation, Consolidation::Consolidated);
    assert_eq!(result.report, ReportType::Annual);
    assert!(!result.used_fallback());
    assert_eq!(result.data_source, "CFS/2023");
    assert_relative_eq!(result.total_score, 89.9, epsilon = 1e-9);
    assert_eq!(result.signal, Signal::AStrongBuy);
    assert_eq!(result.recommendation, Signal::AStrongBuy.recommendation());
    assert_eq!(result.indicators.len(), 9);
    assert_eq!(result.corp_name, "삼성전자");
}

#[tokio::test]
async fn test_missing_current_year_falls_back_to_prior_year() {
    let source = FakeSource::default().with(
        "00126380",
        2022,
        ReportType::Annual,
        Consolidation::Consolidated,
        steady_company(),
    );
    let result = orchestrator(source)
        .analyze("00126380", "삼성전자", 2023, Consolidation::Consolidated)
        .await
        .into_result()
        .unwrap();

    assert_eq!(result.requested_year, 2023);
    assert_eq!(result.year, 2022);
    assert!(result.used_fallback());
    assert_eq!(result.data_source, "CFS/2022 (1 year earlier)");
    assert!(result
        .recommendation
        .starts_with("[using 2022, consolidated statements] "));
}

#[tokio::test]
async fn test_consolidated_falls_back_to_separate() {
    let source = FakeSource::default().with(
        "00164779",
        2020,
        ReportType::Annual,
        Consolidation::Separate,
        steady_company(),
    );
    let result = orchestrator(source)
        .analyze("00164779", "에스케이하이닉스", 2023, Consolidation::Consolidated)
        .await
        .into_result()
        .unwrap();

    assert_eq!(result.consolidation, Consolidation::Separate);
    assert_eq!(result.year, 2020);
    assert_eq!(result.data_source, "OFS/2020 (CFS unavailable, 3 years earlier)");
    assert!(result
        .recommendation
        .starts_with("[using 2020, parent-only statements] "));
}

#[tokio::test]
async fn test_consolidated_years_are_exhausted_before_separate() {
    let source = FakeSource::default()
        .with("00164779", 2023, ReportType::Annual, Consolidation::Separate, impaired_company())
        .with("00164779", 2019, ReportType::Annual, Consolidation::Consolidated, steady_company());
    let result = orchestrator(source)
        .analyze("00164779", "에스케이하이닉스", 2023, Consolidation::Consolidated)
        .await
        .into_result()
        .unwrap();

    assert_eq!(result.consolidation, Consolidation::Consolidated);
    assert_eq!(result.year, 2019);
}

#[tokio::test]
async fn test_semi_annual_report_is_noted_without_prefix() {
    let source = FakeSource::default().with(
        "00401731",
        2023,
        ReportType::SemiAnnual,
        Consolidation::Consolidated,
        steady_company(),
    );
    let result = orchestrator(source)
        .analyze("00401731", "LG전자", 2023, Consolidation::Consolidated)
        .await
        .into_result()
        .unwrap();

    assert_eq!(result.report, ReportType::SemiAnnual);
    assert_eq!(result.data_source, "CFS/2023 (semi-annual report)");
    assert_eq!(result.recommendation, Signal::AStrongBuy.recommendation());
}

#[tokio::test]
async fn test_not_found_lists_every_combination() {
    let orchestrator = orchestrator(FakeSource::default());
    let outcome = orchestrator
        .analyze("99999999", "없는회사", 2023, Consolidation::Consolidated)
        .await;

    let AnalysisOutcome::NotFound(not_found) = outcome else {
        panic!("expected not found");
    };
    assert_eq!(not_found.tried.len(), 2 * 6 * 2);
    assert_eq!(
        not_found.tried[0],
        StatementRequest::new("99999999", 2023, ReportType::Annual, Consolidation::Consolidated)
    );
    assert_eq!(
        not_found.tried[1],
        StatementRequest::new("99999999", 2023, ReportType::SemiAnnual, Consolidation::Consolidated)
    );
    assert_eq!(
        not_found.tried[23],
        StatementRequest::new("99999999", 2018, ReportType::SemiAnnual, Consolidation::Separate)
    );
    assert!(not_found.to_string().contains("24 combinations"));
}

#[tokio::test]
async fn test_separate_request_does_not_try_consolidated() {
    let source = Arc::new(FakeSource::default());
    let orchestrator = AnalysisOrchestrator::new(source.clone(), AnalyzerConfig::default());

    let outcome = orchestrator
        .analyze("99999999", "없는회사", 2023, Consolidation::Separate)
        .await;

    assert!(outcome.result().is_none());
    assert_eq!(source.calls.load(Ordering::SeqCst), 6 * 2);
}

#[tokio::test]
async fn test_fetch_errors_advance_the_loop() {
    let source = FlakySource {
        inner: FakeSource::default().with(
            "00126380",
            2021,
            ReportType::Annual,
            Consolidation::Consolidated,
            steady_company(),
        ),
    };
    let result = orchestrator(source)
        .analyze("00126380", "삼성전자", 2023, Consolidation::Consolidated)
        .await
        .into_result()
        .unwrap();

    assert_eq!(result.year, 2021);
    assert_eq!(result.data_source, "CFS/2021 (2 years earlier)");
}

#[tokio::test]
async fn test_disqualified_result_keeps_filter_reasons() {
    let source = FakeSource::default().with(
        "00126380",
        2023,
        ReportType::Annual,
        Consolidation::Consolidated,
        impaired_company(),
    );
    let result = orchestrator(source)
        .analyze("00126380", "삼성전자", 2023, Consolidation::Consolidated)
        .await
        .into_result()
        .unwrap();

    assert_eq!(result.signal, Signal::Disqualified);
    assert_eq!(result.total_score, 0.0);
    assert!(!result.filter_result.passed());
    assert!(result.recommendation.starts_with("Failed filters: "));
}

#[test]
fn test_fallback_plan_respects_config() {
    let config = AnalyzerConfig {
        max_years_back: 2,
        report_priority: vec![ReportType::Annual],
        fallback_to_separate: false,
    };
    let orchestrator = AnalysisOrchestrator::new(Arc::new(FakeSource::default()), config);

    let plan = orchestrator.fallback_plan("00126380", 2023, Consolidation::Consolidated);
    let years: Vec<i32> = plan.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![2023, 2022]);
    assert!(plan
        .iter()
        .all(|r| r.consolidation == Consolidation::Consolidated));
}

#[test]
fn test_describe_source() {
    let used = StatementRequest::new("x", 2023, ReportType::Annual, Consolidation::Separate);
    assert_eq!(describe_source(2023, Consolidation::Separate, &used), "OFS/2023");

    let used = StatementRequest::new("x", 2022, ReportType::SemiAnnual, Consolidation::Separate);
    assert_eq!(
        describe_source(2023, Consolidation::Consolidated, &used),
        "OFS/2022 (CFS unavailable, 1 year earlier, semi-annual report)"
    );
}

#[tokio::test]
async fn test_trend_uses_found_statements() {
    let source = FakeSource::default().with(
        "00126380",
        2022,
        ReportType::Annual,
        Consolidation::Consolidated,
        steady_company(),
    );
    let orchestrator = orchestrator(source);

    let trend = orchestrator
        .trend("00126380", 2023, Consolidation::Consolidated)
        .await
        .unwrap();
    let years: Vec<i32> = trend.points.iter().map(|p| p.year).collect();
    assert_eq!(years, vec![2021, 2022]);

    let missing = orchestrator
        .trend("99999999", 2023, Consolidation::Consolidated)
        .await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn test_trend_skips_blank_current_column() {
    use StatementType::*;
    let items = vec![
        LineItem::new(IncomeStatement, "dart_OperatingIncomeLoss", "영업이익")
            .with_amount(Term::Current, "")
            .with_amount(Term::Prior, "300")
            .with_amount(Term::BeforePrior, "250"),
        LineItem::new(IncomeStatement, "ifrs-full_ProfitLoss", "당기순이익")
            .with_amount(Term::Current, "")
            .with_amount(Term::Prior, "200")
            .with_amount(Term::BeforePrior, "150"),
    ];
    let source = FakeSource::default().with(
        "00126380",
        2023,
        ReportType::Annual,
        Consolidation::Consolidated,
        items,
    );
    let orchestrator = orchestrator(source);

    let trend = orchestrator
        .trend("00126380", 2023, Consolidation::Consolidated)
        .await
        .unwrap();
    let years: Vec<i32> = trend.points.iter().map(|p| p.year).collect();
    assert_eq!(years, vec![2021, 2022]);
    assert_eq!(trend.points[1].net_income, 200.0);
    assert_eq!(trend.points[0].net_income, 150.0);
}

mod screening {
    use super::*;

    fn company(corp_code: &str, corp_name: &str, stock_code: &str) -> Company {
        Company {
            corp_code: corp_code.to_string(),
            corp_name: corp_name.to_string(),
            stock_code: Some(stock_code.to_string()),
            sector: None,
        }
    }

    fn universe() -> (FakeSource, Vec<Company>) {
        let mut weaker = steady_company();
        // Lower ROE band: equity doubles, everything else unchanged
        weaker[4] = row(StatementType::BalanceSheet, "ifrs-full_Equity", "자본총계", "2,000", "2,000");

        let source = FakeSource::default()
            .with("00000001", 2023, ReportType::Annual, Consolidation::Consolidated, steady_company())
            .with("00000002", 2023, ReportType::Annual, Consolidation::Consolidated, weaker)
            .with("00000003", 2023, ReportType::Annual, Consolidation::Consolidated, impaired_company())
            .with("00000005", 2023, ReportType::Annual, Consolidation::Consolidated, steady_company());

        let companies = vec![
            company("00000002", "둘째", "000020"),
            company("00000001", "첫째", "000010"),
            company("00000003", "자본잠식", "000030"),
            company("00000004", "자료없음", "000040"),
            company("00000005", "첫째우", "000015"),
            company("00000006", "하나스팩제7호", "000060"),
        ];
        (source, companies)
    }

    #[tokio::test]
    async fn test_screen_partitions_and_ranks() {
        let (source, companies) = universe();
        let source = Arc::new(source);
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            source.clone(),
            AnalyzerConfig::default(),
        ));
        let screener = Screener::new(orchestrator, ScreenerConfig::default());

        let report = screener
            .screen(&companies, 2023, Consolidation::Consolidated)
            .await;

        assert_eq!(report.total_analyzed, 6);
        assert_eq!(report.passed_count, 2);
        assert_eq!(report.filtered_count, 3);
        assert_eq!(report.no_data_count, 1);
        assert_eq!(report.errors, 0);

        let ranked: Vec<(&str, Option<usize>)> = report
            .stocks
            .iter()
            .map(|e| (e.corp_code.as_str(), e.rank))
            .collect();
        assert_eq!(ranked, vec![("00000001", Some(1)), ("00000002", Some(2))]);
        assert!(report.stocks[0].total_score > report.stocks[1].total_score);
        assert_eq!(report.stocks[0].indicators.len(), 9);
        assert_eq!(report.stocks[0].indicators["ROE"].score, 30.0);

        let statuses: HashMap<&str, EntryStatus> = report
            .filtered_out
            .iter()
            .map(|e| (e.corp_code.as_str(), e.status))
            .collect();
        assert_eq!(statuses["00000003"], EntryStatus::Filtered);
        assert_eq!(statuses["00000005"], EntryStatus::PreFiltered);
        assert_eq!(statuses["00000006"], EntryStatus::PreFiltered);
        assert!(report.filtered_out.iter().all(|e| !e.filter_reasons.is_empty()));

        assert_eq!(report.no_data[0].corp_code, "00000004");
        assert_eq!(report.no_data[0].status, EntryStatus::NoData);

        // Pre-filtered listings are never fetched: 3 single hits plus 24 misses
        assert_eq!(source.calls.load(Ordering::SeqCst), 3 + 24);
    }

    #[tokio::test]
    async fn test_limit_and_previews_truncate() {
        let (source, companies) = universe();
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            Arc::new(source),
            AnalyzerConfig::default(),
        ));
        let config = ScreenerConfig {
            max_concurrency: 1,
            limit: 3,
            filtered_out_preview: 0,
            ..ScreenerConfig::default()
        };
        let screener = Screener::new(orchestrator, config);

        let report = screener
            .screen(&companies, 2023, Consolidation::Consolidated)
            .await;

        assert_eq!(report.total_analyzed, 3);
        assert_eq!(report.passed_count, 2);
        assert_eq!(report.filtered_count, 1);
        assert!(report.filtered_out.is_empty());
        assert_eq!(report.no_data_count, 0);
    }

    #[tokio::test]
    async fn test_top_picks_use_threshold() {
        let (source, companies) = universe();
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            Arc::new(source),
            AnalyzerConfig::default(),
        ));
        let screener = Screener::new(orchestrator, ScreenerConfig::default());
        let report = screener
            .screen(&companies, 2023, Consolidation::Consolidated)
            .await;

        let min = screener.config().top_pick_min_score;
        let picks = screener.top_picks(&report);
        assert!(picks.iter().all(|e| e.total_score >= min));
        assert_eq!(picks.first().map(|e| e.corp_code.as_str()), Some("00000001"));

        let strict = Screener::new(
            Arc::new(AnalysisOrchestrator::new(
                Arc::new(FakeSource::default()),
                AnalyzerConfig::default(),
            )),
            ScreenerConfig {
                top_pick_min_score: 101.0,
                ..ScreenerConfig::default()
            },
        );
        assert!(strict.top_picks(&report).is_empty());
    }
}
