//! Credit scoring command line
//!
//! Scores customers held in a JSON snapshot and optionally writes
//! recommended limits back to it.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use credit_engine::{Config, CreditScoringEngine, InMemoryDataSource};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "credit-score",
    about = "Score customer credit risk and recommend credit limits",
    version
)]
struct Cli {
    /// TOML configuration file; CREDIT_ENGINE_* variables are used otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a single customer
    Score(CustomerArgs),
    /// Score every active customer
    ScoreAll(ScoreAllArgs),
    /// Apply a credit limit and save the snapshot
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
struct CustomerArgs {
    /// Snapshot file with customers, orders and invoices
    #[arg(long)]
    data: PathBuf,

    /// Customer ID
    #[arg(long)]
    customer: Uuid,
}

#[derive(Args, Debug)]
struct ScoreAllArgs {
    /// Snapshot file with customers, orders and invoices
    #[arg(long)]
    data: PathBuf,

    /// Override the configured concurrency cap
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    #[command(flatten)]
    target: CustomerArgs,

    /// Limit to apply; defaults to the freshly recommended limit
    #[arg(long)]
    limit: Option<Decimal>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env().context("loading config from environment")?,
    };

    info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting credit scoring"
    );

    match cli.command {
        Command::Score(args) => {
            let engine = open_engine(&args.data, config)?;
            let result = engine.calculate_credit_score(args.customer).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            print_metrics(&engine, cli.metrics);
        }
        Command::ScoreAll(args) => {
            if let Some(concurrency) = args.concurrency {
                config.bulk.max_concurrency = concurrency;
            }
            let engine = open_engine(&args.data, config)?;

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling remaining customers");
                    on_signal.cancel();
                }
            });

            let report = engine.get_all_customer_scores_with_cancel(cancel).await?;
            let output = serde_json::json!({
                "summary": report.summary(),
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            print_metrics(&engine, cli.metrics);
        }
        Command::Apply(args) => {
            let engine = open_engine(&args.target.data, config)?;
            let customer_id = args.target.customer;

            let limit = match args.limit {
                Some(limit) => limit,
                None => {
                    let result = engine.calculate_credit_score(customer_id).await?;
                    if !result.has_history() {
                        info!(%customer_id, "No history, recommended limit is zero");
                    }
                    result.recommended_limit
                }
            };

            engine.apply_recommended_limit(customer_id, limit).await?;
            engine
                .source()
                .save(&args.target.data)
                .await
                .with_context(|| format!("saving snapshot to {}", args.target.data.display()))?;

            let applied = serde_json::json!({ "customer_id": customer_id, "credit_limit": limit });
            println!("{}", applied);
            print_metrics(&engine, cli.metrics);
        }
    }

    Ok(())
}

fn open_engine(
    data: &Path,
    config: Config,
) -> anyhow::Result<CreditScoringEngine<InMemoryDataSource>> {
    let store = InMemoryDataSource::load(data)
        .with_context(|| format!("loading snapshot from {}", data.display()))?;
    Ok(CreditScoringEngine::new(Arc::new(store), config)?)
}

fn print_metrics(engine: &CreditScoringEngine<InMemoryDataSource>, enabled: bool) {
    if enabled {
        eprint!("{}", engine.metrics().render());
    }
}
