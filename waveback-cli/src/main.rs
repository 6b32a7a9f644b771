use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use waveback_core::BacktestRunner;
use waveback_store::{BacktestRunStore, SqliteStatisticsRepo};
use waveback_wms::WmsClient;

mod config;
mod report;

#[derive(Parser, Debug)]
#[command(name = "waveback", version, about = "Warehouse wave backtesting CLI")]
struct Cli {
    /// Path to config.toml (default: ~/.waveback/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Backtest one wave: print the summary, optionally write the CSV
    /// detail report and persist the run
    RunBacktest {
        wave_number: i64,

        /// Write the per-pallet detail table to this CSV file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip persisting the run to the database
        #[arg(long, default_value_t = false)]
        no_db: bool,
    },

    /// Write a default config.toml
    ConfigInit,

    /// Row counts of the statistics tables
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    match cli.command {
        Command::RunBacktest { wave_number, report, no_db } => {
            run_backtest_cmd(cli.config.as_deref(), wave_number, report, no_db).await
        }
        Command::ConfigInit => config::init_config(cli.config.as_deref()),
        Command::Stats => stats_cmd(cli.config.as_deref()).await,
    }
}

fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    cancel
}

async fn run_backtest_cmd(
    config_path: Option<&std::path::Path>,
    wave_number: i64,
    report_path: Option<PathBuf>,
    no_db: bool,
) -> Result<()> {
    let app = config::load_config(config_path)?;
    let backtest_config = app.backtest.to_core();
    backtest_config.validate().context("invalid backtest config")?;

    let wms = WmsClient::new(&app.wms.base_url);
    let pool = waveback_store::connect(&app.stats.database_url)
        .await
        .with_context(|| format!("open {}", app.stats.database_url))?;
    let stats_repo = SqliteStatisticsRepo::new(pool.clone());

    let runner = BacktestRunner::new(&wms, &stats_repo, backtest_config);
    let result = runner.run(wave_number, ctrl_c_token()).await?;

    report::print_summary(&result);

    if let Some(path) = report_path {
        report::write_csv_report(&path, &result)?;
        println!("\nWrote detail report: {}", path.display());
    }

    if !no_db {
        let store = BacktestRunStore::new(pool);
        store.ensure_schema().await?;
        let run_id = store.persist(&result).await?;
        println!("Persisted run {run_id}");
    }

    Ok(())
}

async fn stats_cmd(config_path: Option<&std::path::Path>) -> Result<()> {
    let app = config::load_config(config_path)?;
    let pool = waveback_store::connect(&app.stats.database_url)
        .await
        .with_context(|| format!("open {}", app.stats.database_url))?;

    let repo = SqliteStatisticsRepo::new(pool);
    for (table, count) in repo.table_counts().await? {
        println!("{table}: {count} rows");
    }
    Ok(())
}
