use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{DateWindow, ReportConfig};
use crate::db::{Collection, PgProvider};
use crate::report::OutputFormat;
use crate::store::{ConnectionProvider, DocumentStore};

mod config;
mod db;
mod error;
mod models;
mod queries;
mod report;
mod runner;
mod store;

#[derive(Parser)]
#[command(name = "zen-class-reports")]
#[command(about = "Reporting queries over the zen class training programme", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import documents for one collection from a CSV file
    Import {
        #[arg(long, value_enum)]
        collection: Collection,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run every report and print the results
    Run {
        #[command(flatten)]
        report_args: ReportArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long, default_value = "2020-10-01")]
    topics_from: NaiveDate,
    #[arg(long, default_value = "2020-10-31")]
    topics_to: NaiveDate,
    #[arg(long, default_value = "2020-10-15")]
    drives_from: NaiveDate,
    #[arg(long, default_value = "2020-10-31")]
    drives_to: NaiveDate,
    #[arg(long, default_value = "2020-10-15")]
    absence_from: NaiveDate,
    #[arg(long, default_value = "2020-10-31")]
    absence_to: NaiveDate,
    #[arg(long, default_value_t = 15)]
    mentee_threshold: i32,
    /// Per-report time limit in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl ReportArgs {
    fn into_config(self) -> anyhow::Result<ReportConfig> {
        Ok(ReportConfig {
            topics_window: DateWindow::new("topics", self.topics_from, self.topics_to)?,
            drives_window: DateWindow::new("drives", self.drives_from, self.drives_to)?,
            absence_window: DateWindow::new("absence", self.absence_from, self.absence_to)?,
            mentee_threshold: self.mentee_threshold,
            query_timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the zen class Postgres instance")?;
    let provider = PgProvider::new(database_url);

    match cli.command {
        Commands::InitDb => {
            let store = provider.connect().await.context("failed to connect to Postgres")?;
            let result = db::init_db(store.pool()).await;
            store.close().await;
            result?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let store = provider.connect().await.context("failed to connect to Postgres")?;
            let result = db::seed(store.pool()).await;
            store.close().await;
            result?;
            println!("Seed data inserted.");
        }
        Commands::Import { collection, csv } => {
            let store = provider.connect().await.context("failed to connect to Postgres")?;
            let result = db::import_csv(store.pool(), collection, &csv).await;
            store.close().await;
            let inserted = result?;
            println!("Inserted {inserted} documents from {}.", csv.display());
        }
        Commands::Run {
            report_args,
            format,
            out,
        } => {
            let config = report_args.into_config()?;
            let report = runner::run_scoped(&provider, &config)
                .await
                .context("report run failed")?;
            let rendered = report::render(&report, &config, format);

            match &out {
                Some(path) => {
                    std::fs::write(path, &rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "report written");
                }
                None => print!("{rendered}"),
            }

            let failed = report.failures().len();
            if failed > 0 {
                anyhow::bail!("{failed} of 6 reports failed");
            }
        }
    }

    Ok(())
}
