//! dart-screener: score Korean listed companies from their OpenDART financial statements.
//!
//! Usage:
//!   cargo run -p dart-screener -- analyze 00126380 --name 삼성전자 --year 2023
//!   cargo run -p dart-screener -- screen --companies companies.json --year 2023 --top
//!   cargo run -p dart-screener -- trend 00126380 --year 2023 --fs OFS

use analysis_core::{Consolidation, StatementSource};
use analysis_orchestrator::{
    AnalysisOrchestrator, AnalyzerConfig, Company, ScreenEntry, ScreenerConfig, Screener,
};
use anyhow::Context;
use dart_client::{CachingSource, DartClient};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct TopPicks<'a> {
    year: i32,
    consolidation: Consolidation,
    min_score: f64,
    total_analyzed: usize,
    passed_count: usize,
    picks: Vec<&'a ScreenEntry>,
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

/// Value of a numeric flag; present but malformed is an error, never a silent default
fn parse_flag<T>(args: &[String], flag: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    arg_value(args, flag)
        .map(|v| {
            v.parse::<T>()
                .with_context(|| format!("{flag} must be a number, got {v:?}"))
        })
        .transpose()
}

/// First positional argument after the subcommand
fn positional(args: &[String]) -> Option<&str> {
    args.get(2)
        .filter(|a| !a.starts_with("--"))
        .map(|s| s.as_str())
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  dart-screener analyze <corp_code> --year YYYY [--name NAME] [--fs CFS|OFS]");
    eprintln!("  dart-screener screen --companies FILE --year YYYY [--fs CFS|OFS] [--top]");
    eprintln!("  dart-screener trend <corp_code> --year YYYY [--fs CFS|OFS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --companies FILE   JSON array of {{corp_code, corp_name, stock_code, sector}}");
    eprintln!("  --limit N          Companies screened (default: SCREENER_LIMIT or 100)");
    eprintln!("  --concurrency N    Parallel analyses (default: SCREENER_CONCURRENCY or 50)");
    eprintln!("  --top              Print only passed companies at or above the top-pick score");
    eprintln!();
    eprintln!("Environment: DART_API_KEY (required), DART_BASE_URL, DART_TIMEOUT_SECS,");
    eprintln!("  DART_CACHE_TTL_SECS, DART_RATE_LIMIT, ANALYZER_MAX_YEARS, ANALYZER_REPORT_TYPES,");
    eprintln!("  ANALYZER_FALLBACK_SEPARATE, SCREENER_TOP_PICK_MIN_SCORE");
    std::process::exit(1);
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dart_screener=info,analysis_orchestrator=info,dart_client=warn".into()
            }),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = match args.get(1) {
        Some(c) => c.as_str(),
        None => usage(),
    };

    let year: i32 = match arg_value(&args, "--year") {
        Some(v) => v
            .parse()
            .with_context(|| format!("--year must be a business year, got {v:?}"))?,
        None => usage(),
    };
    let consolidation = match arg_value(&args, "--fs") {
        Some(code) => Consolidation::from_code(code)
            .with_context(|| format!("--fs must be CFS or OFS, got {code:?}"))?,
        None => Consolidation::Consolidated,
    };

    let dart = DartClient::from_env()?;
    let cache_ttl = dart.config().cache_ttl;
    let source: Arc<dyn StatementSource> = Arc::new(CachingSource::new(dart, cache_ttl));
    let orchestrator = Arc::new(AnalysisOrchestrator::new(source, AnalyzerConfig::from_env()?));

    match command {
        "analyze" => {
            let corp_code = positional(&args).unwrap_or_else(|| usage());
            let corp_name = arg_value(&args, "--name").unwrap_or(corp_code);
            tracing::info!("Analyzing {} ({}) for {} {}", corp_code, corp_name, consolidation, year);

            let result = orchestrator
                .analyze(corp_code, corp_name, year, consolidation)
                .await
                .into_result()
                .map_err(|not_found| anyhow::anyhow!("{}", not_found))?;
            print_json(&result)?;
        }
        "screen" => {
            let path = arg_value(&args, "--companies").unwrap_or_else(|| usage());
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read company list {path}"))?;
            let companies: Vec<Company> = serde_json::from_str(&raw)
                .with_context(|| format!("{path} is not a JSON array of companies"))?;

            let mut config = ScreenerConfig::from_env()?;
            if let Some(limit) = parse_flag::<usize>(&args, "--limit")? {
                config.limit = limit;
            }
            if let Some(n) = parse_flag::<usize>(&args, "--concurrency")? {
                config.max_concurrency = n.max(1);
            }
            tracing::info!(
                "dart-screener: {} companies loaded from {}, limit={}, concurrency={}",
                companies.len(),
                path,
                config.limit,
                config.max_concurrency
            );

            let screener = Screener::new(Arc::clone(&orchestrator), config);
            let report = screener.screen(&companies, year, consolidation).await;

            if args.iter().any(|a| a == "--top") {
                print_json(&TopPicks {
                    year: report.year,
                    consolidation: report.consolidation,
                    min_score: screener.config().top_pick_min_score,
                    total_analyzed: report.total_analyzed,
                    passed_count: report.passed_count,
                    picks: screener.top_picks(&report),
                })?;
            } else {
                print_json(&report)?;
            }
        }
        "trend" => {
            let corp_code = positional(&args).unwrap_or_else(|| usage());
            let trend = orchestrator
                .trend(corp_code, year, consolidation)
                .await
                .map_err(|not_found| anyhow::anyhow!("{}", not_found))?;
            print_json(&trend)?;
        }
        _ => usage(),
    }

    Ok(())
}
