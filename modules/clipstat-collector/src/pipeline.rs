// Collection pipeline: links → paced sequential fetches → raw table →
// normalized report → CSV files and a shared spreadsheet.
//
// Per link: pending → fetching → succeeded | failed → paced wait (not after the last).
// One attempt per link. A failed fetch becomes an outcome row; it never stops the run.
// Sink failures are logged and skipped. Only the link source may abort a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use clipstat_common::{Link, OutcomeRecord, RawRecord, Table, LINK_INDEX};

use crate::normalizer::RecordNormalizer;
use crate::stats::RunStats;
use crate::traits::{FetchOutcome, LinkSource, MetadataFetcher, Pacer, ResultSink};

const EMPTY_DATA: &str = "Empty data returned";

#[derive(TypedBuilder)]
pub struct CollectionPipeline {
    source: Arc<dyn LinkSource>,
    fetcher: Arc<dyn MetadataFetcher>,
    file_sink: Arc<dyn ResultSink>,
    /// `None` skips the spreadsheet upload.
    #[builder(default)]
    sheet_sink: Option<Arc<dyn ResultSink>>,
    pacer: Arc<dyn Pacer>,
    #[builder(default)]
    normalizer: RecordNormalizer,
    /// Where per-link scratch files are created.
    #[builder(setter(into))]
    scratch_dir: PathBuf,
    /// Slug used in file names, e.g. `tiktok`.
    #[builder(default = "tiktok".to_string(), setter(into))]
    platform: String,
    /// Display name used in the spreadsheet title, e.g. `TikTok`.
    #[builder(default = "TikTok".to_string(), setter(into))]
    platform_label: String,
    #[builder(default = Duration::from_secs(5))]
    delay: Duration,
    /// Process at most this many links.
    #[builder(default)]
    limit: Option<usize>,
}

/// Where a run's outputs landed. `None` means nothing was written.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunFiles {
    pub raw: Option<String>,
    pub summary: Option<String>,
    pub formatted: Option<String>,
}

#[derive(Debug)]
pub struct RunReport {
    pub timestamp: String,
    pub raw: Vec<RawRecord>,
    pub outcomes: Vec<OutcomeRecord>,
    pub files: RunFiles,
    pub spreadsheet_id: Option<String>,
    pub stats: RunStats,
}

impl CollectionPipeline {
    /// Run with a fresh local-time run id.
    pub async fn run_now(&self) -> Result<RunReport> {
        self.run(&clipstat_common::run_timestamp()).await
    }

    pub async fn run(&self, timestamp: &str) -> Result<RunReport> {
        let mut links = self
            .source
            .get_links()
            .await
            .context("Failed to obtain links")?;
        info!(count = links.len(), "Found links to process");

        if let Some(limit) = self.limit {
            if links.len() > limit {
                info!(limit, dropped = links.len() - limit, "Applying link limit");
                links.truncate(limit);
            }
        }

        let (raw, outcomes) = self.collect(&links).await;
        let mut stats = RunStats::from_outcomes(&outcomes);
        stats.raw_rows = raw.len() as u32;

        let mut files = RunFiles::default();
        let sink = self.file_sink.as_ref();

        let raw_table = Table::from_raw(&raw);
        files.raw = save_to(sink, &raw_table, &self.raw_file_name(timestamp)).await;

        let summary = Table::from_outcomes(&outcomes);
        files.summary = save_to(sink, &summary, &summary_file_name(timestamp)).await;

        let mut spreadsheet_id = None;
        if !raw.is_empty() {
            let normalized = self.normalizer.normalize(&raw);
            let report = Table::from_normalized(&normalized);
            files.formatted = save_to(sink, &report, &self.formatted_file_name(timestamp)).await;

            if let Some(sheet_sink) = &self.sheet_sink {
                spreadsheet_id =
                    save_to(sheet_sink.as_ref(), &report, &self.sheet_title(timestamp)).await;
            }
        }

        stats.files_written = [&files.raw, &files.summary, &files.formatted]
            .iter()
            .filter(|f| f.is_some())
            .count() as u32;
        stats.sheet_uploaded = spreadsheet_id.is_some();
        info!("{stats}");

        Ok(RunReport {
            timestamp: timestamp.to_string(),
            raw,
            outcomes,
            files,
            spreadsheet_id,
            stats,
        })
    }

    /// Fetch every link in order, one at a time, pacing between them.
    async fn collect(&self, links: &[Link]) -> (Vec<RawRecord>, Vec<OutcomeRecord>) {
        let mut raw = Vec::new();
        let mut outcomes = Vec::with_capacity(links.len());
        let total = links.len();

        for (i, link) in links.iter().enumerate() {
            let index = i + 1;
            info!(index, total, link = %link, "Processing link");

            let scratch = self.scratch_path(index);
            let outcome = match self.fetcher.fetch(link, &scratch).await {
                Ok(FetchOutcome::Fetched(record)) => {
                    raw.push(record.with(LINK_INDEX, index.to_string()));
                    OutcomeRecord::success(index, link.clone())
                }
                Ok(FetchOutcome::Empty) => OutcomeRecord::failed(index, link.clone(), EMPTY_DATA),
                Ok(FetchOutcome::Failed { error }) => {
                    OutcomeRecord::failed(index, link.clone(), error)
                }
                Err(e) => OutcomeRecord::failed(index, link.clone(), format!("{e:#}")),
            };

            if let Some(error) = &outcome.error {
                warn!(index, link = %link, error = %error, "Error processing link");
            }
            outcomes.push(outcome);
            remove_scratch(&scratch).await;

            if index < total {
                info!(
                    delay_secs = self.delay.as_secs_f64(),
                    "Waiting before processing next link"
                );
                self.pacer.wait(self.delay).await;
            }
        }

        (raw, outcomes)
    }

    fn scratch_path(&self, index: usize) -> PathBuf {
        self.scratch_dir
            .join(format!("temp_{}_data_{index}.json", self.platform))
    }

    fn raw_file_name(&self, timestamp: &str) -> String {
        format!("all_{}_data_{timestamp}.csv", self.platform)
    }

    fn formatted_file_name(&self, timestamp: &str) -> String {
        format!("formatted_{}_data_{timestamp}.csv", self.platform)
    }

    fn sheet_title(&self, timestamp: &str) -> String {
        format!("{} Data Analysis {timestamp}", self.platform_label)
    }
}

fn summary_file_name(timestamp: &str) -> String {
    format!("processing_summary_{timestamp}.csv")
}

/// Save and report the location; failures and empty results become `None`.
async fn save_to(sink: &dyn ResultSink, table: &Table, destination: &str) -> Option<String> {
    match sink.save(table, destination).await {
        Ok(location) if !location.is_empty() => Some(location),
        Ok(_) => None,
        Err(e) => {
            warn!(destination, error = %format!("{e:#}"), "Failed to save results");
            None
        }
    }
}

async fn remove_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove scratch file"),
    }
}
