// Trait seams for the collection pipeline.
//
// SheetsApi: the four spreadsheet calls the link source and sheet sink need.
// LinkSource: ordered candidate links for one run.
// MetadataFetcher: one link → one tagged fetch outcome.
// ResultSink: persist a table, hand back where it went.
// Pacer: the inter-request wait.
//
// Production impls wrap SheetsClient / ApifyClient / tokio::time; the mocks in
// `testing` stand in for all five with no network and no sleeping.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use clipstat_common::{Link, RawRecord, Table};
use sheets_client::SheetsClient;

// ---------------------------------------------------------------------------
// SheetsApi
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Read one worksheet column (1-based) of a spreadsheet looked up by title.
    async fn read_column(
        &self,
        spreadsheet: &str,
        worksheet: &str,
        column: u32,
    ) -> Result<Vec<serde_json::Value>>;

    /// Create a spreadsheet and return its id.
    async fn create_spreadsheet(&self, title: &str) -> Result<String>;

    /// Anyone with the link may read.
    async fn share_publicly(&self, spreadsheet_id: &str) -> Result<()>;

    /// Write rows starting at the top-left cell of the first worksheet.
    async fn write_rows(&self, spreadsheet_id: &str, rows: &[Vec<String>]) -> Result<()>;
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn read_column(
        &self,
        spreadsheet: &str,
        worksheet: &str,
        column: u32,
    ) -> Result<Vec<serde_json::Value>> {
        let file = self.find_spreadsheet(spreadsheet).await?;
        Ok(self.column_values(&file.id, worksheet, column).await?)
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<String> {
        Ok(SheetsClient::create_spreadsheet(self, title).await?)
    }

    async fn share_publicly(&self, spreadsheet_id: &str) -> Result<()> {
        Ok(SheetsClient::share_publicly(self, spreadsheet_id).await?)
    }

    async fn write_rows(&self, spreadsheet_id: &str, rows: &[Vec<String>]) -> Result<()> {
        Ok(self.update_values(spreadsheet_id, "A1", rows).await?)
    }
}

// ---------------------------------------------------------------------------
// LinkSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LinkSource: Send + Sync {
    /// Links in processing order. Errors here are fatal to the run.
    async fn get_links(&self) -> Result<Vec<Link>>;
}

// ---------------------------------------------------------------------------
// MetadataFetcher
// ---------------------------------------------------------------------------

/// Result of one fetch attempt. Failure is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A non-empty record, already stamped with `source_link`.
    Fetched(RawRecord),
    /// The scraper answered but produced nothing usable.
    Empty,
    Failed { error: String },
}

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch one video's metadata, using `scratch` as the handoff file.
    /// The caller owns `scratch` and removes it afterwards.
    async fn fetch(&self, link: &Link, scratch: &Path) -> Result<FetchOutcome>;
}

// ---------------------------------------------------------------------------
// ResultSink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist `table` under `destination`. Returns a location (path or id),
    /// or an empty string when nothing was written.
    async fn save(&self, table: &Table, destination: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Pacer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
pub struct SleepPacer;

#[async_trait]
impl Pacer for SleepPacer {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
