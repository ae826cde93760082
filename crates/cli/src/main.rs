mod config;
mod metrics;
mod pipeline;

use aggregate::{DashboardView, WarehouseRow};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crawl::{PageTraversal, TokioSleeper, WebDriverSession};
use extract::ReviewExtractor;
use sentiment::{Lexicon, SentimentAnalyzer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, PolicyPreset, Target};
use metrics::Metrics;
use pipeline::{run_and_release, Pipeline, RunReport};

/// Review sentiment scraper and report tools
#[derive(Parser)]
#[command(name = "review-sentiment")]
#[command(version)]
#[command(about = "Scrape entity review pages, score review sentiment and rank entities")]
struct Cli {
    /// JSON config file; missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Traverse every target and write one report per entity
    Run {
        /// Report directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// WebDriver endpoint
        #[arg(long)]
        webdriver: Option<String>,

        /// Entity to process, as NAME=URL or a bare URL (repeatable)
        #[arg(long = "target", value_name = "NAME=URL")]
        targets: Vec<String>,

        #[arg(long)]
        max_entities: Option<usize>,

        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// JSON file with "positive" and "negative" word lists
        #[arg(long)]
        lexicon: Option<PathBuf>,
    },
    /// Rank the reports already written to the output directory
    Summary {
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the dashboard view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score a single review text
    Score {
        #[arg(long)]
        text: String,

        #[arg(long, default_value_t = 0.0)]
        stars: f64,

        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        #[arg(long)]
        lexicon: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PolicyArg {
    Strict,
    Lenient,
}

impl From<PolicyArg> for PolicyPreset {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => PolicyPreset::Strict,
            PolicyArg::Lenient => PolicyPreset::Lenient,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path).await?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Run {
            output,
            webdriver,
            targets,
            max_entities,
            policy,
            lexicon,
        } => {
            if let Some(output) = output {
                config.run.output_dir = output;
            }
            if let Some(url) = webdriver {
                config.webdriver.url = url;
            }
            if !targets.is_empty() {
                config.targets = targets
                    .iter()
                    .map(|arg| Target::parse(arg))
                    .collect::<Result<Vec<_>>>()?;
            }
            if max_entities.is_some() {
                config.run.max_entities = max_entities;
            }
            apply_scoring_overrides(&mut config, policy, lexicon);
            run(config).await
        }
        Commands::Summary { output, json } => {
            let dir = output.unwrap_or(config.run.output_dir);
            summary(&dir, json).await
        }
        Commands::Score {
            text,
            stars,
            policy,
            lexicon,
        } => {
            apply_scoring_overrides(&mut config, policy, lexicon);
            score(&config, &text, stars)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn apply_scoring_overrides(config: &mut AppConfig, policy: Option<PolicyArg>, lexicon: Option<PathBuf>) {
    if let Some(policy) = policy {
        config.scoring = PolicyPreset::from(policy).policy();
    }
    if lexicon.is_some() {
        config.lexicon_path = lexicon;
    }
}

fn build_analyzer(config: &AppConfig) -> Result<SentimentAnalyzer> {
    let lexicon = match &config.lexicon_path {
        Some(path) => Lexicon::from_file(path)?,
        None => Lexicon::builtin()?,
    };
    info!(positive = lexicon.positive().len(), negative = lexicon.negative().len(), "Lexicon loaded");

    SentimentAnalyzer::new(lexicon, config.scoring.clone()).context("Invalid scoring policy")
}

async fn run(config: AppConfig) -> Result<()> {
    config.validate()?;

    let analyzer = Arc::new(build_analyzer(&config)?);
    let extractor = ReviewExtractor::new(&config.extraction, analyzer)?;
    let traversal = PageTraversal::new(config.traversal.clone(), extractor, Arc::new(TokioSleeper));
    let pipeline = Arc::new(Pipeline::new(traversal, config.run.clone(), Metrics::new()));
    let targets = config.effective_targets();

    info!(targets = targets.len(), webdriver = %config.webdriver.url, "Starting run");
    let session = WebDriverSession::connect(&config.webdriver)
        .await
        .context("Could not acquire a browser session")?;

    let report = run_and_release(pipeline.clone(), Arc::new(Mutex::new(session)), targets.clone()).await?;

    print_run_report(&report, targets.len().min(config.run.max_entities.unwrap_or(usize::MAX)));
    info!(metrics = ?pipeline.metrics().snapshot(), "Run finished");
    Ok(())
}

fn print_run_report(report: &RunReport, attempted: usize) {
    println!("\n=== RUN SUMMARY ===\n");
    println!("Entities attempted: {}", attempted);
    println!("Processed: {}", report.ranking.len());
    println!("Failed: {}", report.failures.len());

    for failure in &report.failures {
        println!("  ✗ {}: {}", failure.url, failure.reason);
    }

    if report.totals.total_reviews > 0 {
        let totals = &report.totals;
        println!("\nReviews: {}", totals.total_reviews);
        println!("  Positive: {} ({}%)", totals.positive_count, totals.positive_percentage);
        println!("  Negative: {} ({}%)", totals.negative_count, totals.negative_percentage);
        println!("  Neutral: {} ({}%)", totals.neutral_count, totals.neutral_percentage);
    }

    if !report.ranking.is_empty() {
        println!("\n🏆 RANKING:");
        for (i, summary) in report.ranking.iter().enumerate() {
            println!("  {}. {}", i + 1, summary.entity_name);
            println!("     Reviews: {}", summary.total_count);
            println!("     Positive: {}%", summary.positive_percentage);
            println!("     Negative: {}%", summary.negative_percentage);
            println!("     Neutral: {}%", summary.neutral_percentage);
        }
    }

    if !report.report_paths.is_empty() {
        println!("\nReports:");
        for path in &report.report_paths {
            println!("  {}", path.display());
        }
    }
}

async fn summary(dir: &std::path::Path, json: bool) -> Result<()> {
    let view = DashboardView::load(dir).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    match view {
        DashboardView::Ready { rows, stats } => {
            println!("Entities: {}", stats.total_entities);
            println!("Reviews: {}", stats.total_reviews);
            println!(
                "  Positive: {}  Negative: {}  Neutral: {}",
                stats.total_positive, stats.total_negative, stats.total_neutral
            );
            println!("Average positive: {}%\n", stats.avg_positive);
            for (i, row) in rows.iter().enumerate() {
                print_row(i + 1, row);
            }
        }
        DashboardView::NoData => {
            println!("No reports found in {}", dir.display());
        }
        DashboardView::ConnectionError { message } => {
            anyhow::bail!("Report source unavailable: {}", message);
        }
    }
    Ok(())
}

fn print_row(position: usize, row: &WarehouseRow) {
    println!(
        "{:>3}. {:<30} {:>5} reviews  +{:>6.2}%  -{:>6.2}%  {}",
        position, row.name, row.total, row.positive_pct, row.negative_pct, row.parsed_at
    );
}

fn score(config: &AppConfig, text: &str, stars: f64) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    let stars = extract::locator::snap_to_half(stars);
    let analysis = analyzer.analyze(text, stars);

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
