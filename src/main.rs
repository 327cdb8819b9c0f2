use anyhow::{Context, Result};
use billcharge_sync::analysis::{filter_sales, load_sales_csv, SalesAnalysis};
use billcharge_sync::collector::{BillChargeCollector, TracingProgress};
use billcharge_sync::config::SyncConfig;
use billcharge_sync::db::{init_pool, BillChargeRepository, DEFAULT_BATCH_SIZE};
use billcharge_sync::graphql::{GraphqlExecutor, ReqwestTransport};
use billcharge_sync::report::SalesSummary;
use billcharge_sync::time::DateRange;
use billcharge_sync::transform::transform_all;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "billcharge-sync")]
#[command(about = "Download bill charges and analyse sales reports")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download bill charges paid within a date range
    Fetch {
        /// First day of the range (YYYY-MM-DD, default: today)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the range (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Records per page (or set BILLCHARGE_PAGE_SIZE)
        #[arg(long)]
        page_size: Option<u32>,

        /// API token (or set BILLCHARGE_TOKEN env var)
        #[arg(long)]
        token: Option<String>,

        /// Replace the bill_charges table with the downloaded records
        #[arg(long)]
        persist: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyse a CSV sales export
    Analyze {
        /// Path to the exported CSV file
        file: PathBuf,

        /// First day of the range (YYYY-MM-DD, default: today)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the range (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let today = Local::now().date_naive();

    match args.command {
        Command::Fetch {
            start,
            end,
            page_size,
            token,
            persist,
            json,
        } => {
            let mut config = SyncConfig::from_env()?;
            if let Some(token) = token {
                config.token = Some(token);
            }
            if let Some(page_size) = page_size {
                config.page_size = page_size;
            }
            config.validate()?;

            let range = DateRange::new(start.unwrap_or(today), end.unwrap_or(today), today)?;
            fetch(&config, range, persist, json).await
        }
        Command::Analyze {
            file,
            start,
            end,
            json,
        } => {
            let rows = load_sales_csv(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let rows = filter_sales(rows, start.unwrap_or(today), end.unwrap_or(today))?;

            match SalesAnalysis::compute(&rows) {
                Some(analysis) if json => println!("{}", serde_json::to_string_pretty(&analysis)?),
                Some(analysis) => {
                    println!("\n=== Sales Analysis ===");
                    println!("{}", analysis);
                }
                None => warn!("No sales found for the selected period"),
            }
            Ok(())
        }
    }
}

async fn fetch(config: &SyncConfig, range: DateRange, persist: bool, json: bool) -> Result<()> {
    let token = config.require_token()?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, finishing at the next page boundary");
            ctrl_c.cancel();
        }
    });

    let transport = ReqwestTransport::new(config.api_url.clone(), config.request_timeout)?;
    info!("Fetching bill charges from {} for {}", transport.endpoint(), range);

    let executor = GraphqlExecutor::new(Arc::new(transport), config.retry.clone())
        .with_cancellation(cancel);
    let collector = BillChargeCollector::new(executor, config.collector.clone())
        .with_progress(Arc::new(TracingProgress));

    let records = match collector
        .collect(&range.start_iso(), &range.end_iso(), token, config.page_size)
        .await
    {
        Ok(records) => records,
        Err(e) => {
            error!("❌ {}", e);
            return Err(e.into());
        }
    };
    drop(collector);

    if records.is_empty() {
        warn!("No records found between {} and {}", range.start, range.end);
        return Ok(());
    }

    info!("Processing {} records...", records.len());
    let charges = transform_all(&records)?;

    if persist {
        let database_url = config.require_database_url()?;
        let pool = init_pool(database_url)
            .await
            .context("Failed to connect to database")?;
        let repo = BillChargeRepository::new(pool);
        repo.replace_all(&charges, DEFAULT_BATCH_SIZE).await?;
    }

    let summary = SalesSummary::from_charges(&charges);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("\n=== Sales Summary ({}) ===", range);
        println!("{}", summary);
    }

    Ok(())
}
