use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use trifetch::download::{DownloadConfig, DownloadCoordinator, StrategyKind};
use trifetch::http::{Outcome, Target};
use url::Url;

/// Download resources over plain HTTP/1.1, one connection per request.
#[derive(Debug, Parser)]
#[command(name = "trifetch", version)]
struct Cli {
    /// URLs to download (http:// only)
    #[arg(required = true)]
    urls: Vec<Url>,

    /// Driver used for every transaction
    #[arg(short, long)]
    strategy: Option<StrategyKind>,

    /// Download each URL this many times, concurrently
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// JSON config file (command-line flags win)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Connect timeout in milliseconds
    #[arg(long)]
    connect_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match DownloadConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::from(2);
            }
        },
        None => DownloadConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if cli.connect_timeout_ms.is_some() {
        config.connect_timeout_ms = cli.connect_timeout_ms;
    }

    let mut targets = Vec::new();
    for url in &cli.urls {
        match Target::from_url(url).await {
            Ok(target) => targets.extend(std::iter::repeat(target).take(cli.count)),
            Err(e) => {
                eprintln!("{url}: {e}");
                return ExitCode::from(2);
            }
        }
    }

    let coordinator = DownloadCoordinator::from_config(&config);
    tracing::info!(
        strategy = coordinator.strategy_name(),
        transactions = targets.len(),
        "starting downloads"
    );
    let report = coordinator.run(targets).await;

    for transaction in report.transactions() {
        match &transaction.outcome {
            Outcome::Completed(body) => {
                println!(
                    "\n---File {} Content---\n{}\n",
                    transaction.target,
                    String::from_utf8_lossy(body)
                );
            }
            Outcome::Failed(err) => {
                eprintln!("Error {}: {err}", transaction.target);
            }
        }
    }
    let failed = report.failure_count();
    println!("Finished: {} ok, {failed} failed", report.len() - failed);

    if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
