use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use apify_client::ApifyClient;
use clipstat_collector::sink::read_csv;
use clipstat_collector::{
    ApifyFetcher, CollectionPipeline, CsvSink, RecordNormalizer, ResultSink, SheetLinkSource,
    SheetsApi, SheetsSink, SleepPacer,
};
use clipstat_common::{Config, Table};
use sheets_client::SheetsClient;

#[derive(Parser)]
#[command(name = "clipstat")]
#[command(about = "Collect per-video stats for links listed in a spreadsheet")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    collect: CollectArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Read links, fetch metadata, write CSVs and a shared sheet (default)
    Collect,

    /// Re-format an existing raw CSV into the five-column report
    Format {
        /// Raw CSV produced by a previous collect run
        input: PathBuf,

        /// Where to write the report
        #[arg(short, long, default_value = "formatted_tiktok_data.csv")]
        output: PathBuf,
    },
}

/// Collect options. Global so they work with or without the `collect` word.
#[derive(clap::Args, Debug, Default, PartialEq)]
struct CollectArgs {
    /// Override OUTPUT_DIR
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Override REQUEST_DELAY_SECS
    #[arg(long, global = true)]
    delay_secs: Option<u64>,

    /// Process at most this many links
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Write CSVs only; do not create a spreadsheet
    #[arg(long, global = true)]
    skip_sheets: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::from_default_env()
        .add_directive("clipstat=info".parse()?)
        .add_directive("apify_client=info".parse()?)
        .add_directive("sheets_client=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Some(Commands::Format { input, output }) => format(&input, &output).await,
        Some(Commands::Collect) | None => collect(cli.collect).await,
    }
}

async fn collect(args: CollectArgs) -> Result<()> {
    info!("Starting data extraction...");

    let mut config = Config::from_env()?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(secs) = args.delay_secs {
        config.request_delay = Duration::from_secs(secs);
    }
    config.log_redacted();

    let sheets_client = SheetsClient::from_key_file(&config.service_account_file)
        .context("Failed to load Google service account")?;
    info!(
        client_email = sheets_client.client_email(),
        "Using service account; the source spreadsheet must be shared with it"
    );
    let sheets: Arc<dyn SheetsApi> = Arc::new(sheets_client);

    let source = SheetLinkSource::new(
        sheets.clone(),
        &config.source_spreadsheet,
        &config.source_worksheet,
        config.source_column,
        &config.link_pattern,
    );
    let fetcher = ApifyFetcher::new(ApifyClient::new(config.apify_api_key.clone()));
    let file_sink = CsvSink::new(&config.output_dir, config.csv_bom);
    let sheet_sink: Option<Arc<dyn ResultSink>> = if args.skip_sheets {
        info!("Spreadsheet upload disabled");
        None
    } else {
        Some(Arc::new(SheetsSink::new(sheets)))
    };

    let pipeline = CollectionPipeline::builder()
        .source(Arc::new(source))
        .fetcher(Arc::new(fetcher))
        .file_sink(Arc::new(file_sink))
        .sheet_sink(sheet_sink)
        .pacer(Arc::new(SleepPacer))
        .scratch_dir(config.output_dir.clone())
        .platform(config.platform.clone())
        .platform_label(config.platform_label.clone())
        .delay(config.request_delay)
        .limit(args.limit)
        .build();

    let report = pipeline.run_now().await?;

    if let Some(ref path) = report.files.raw {
        info!(path = %path, "All data has been combined");
    }
    if let Some(ref path) = report.files.summary {
        info!(path = %path, "See the processing summary for per-link results");
    }
    Ok(())
}

async fn format(input: &Path, output: &Path) -> Result<()> {
    let raw = read_csv(input)?.to_raw();
    let normalized = RecordNormalizer::default().normalize(&raw);

    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = output
        .file_name()
        .and_then(|n| n.to_str())
        .context("Output path has no file name")?;

    let written = CsvSink::new(dir, true)
        .save(&Table::from_normalized(&normalized), name)
        .await?;
    if written.is_empty() {
        info!(input = %input.display(), "Input had no rows; nothing written");
    } else {
        info!(path = %written, rows = normalized.len(), "Formatted CSV created");
    }
    Ok(())
}
