// Test mocks for the collection pipeline.
//
// One mock per trait boundary:
// - StaticLinkSource (LinkSource): fixed list, or a fixed error
// - MockFetcher (MetadataFetcher): link→scripted outcome, records scratch paths
// - MockSheets (SheetsApi): canned column, optional failure, records calls
// - MemorySink (ResultSink): keeps every saved table in memory
// - RecordingPacer (Pacer): counts waits instead of sleeping

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use clipstat_common::{Link, RawRecord, Table, SOURCE_LINK};

use crate::traits::{FetchOutcome, LinkSource, MetadataFetcher, Pacer, ResultSink, SheetsApi};

// ---------------------------------------------------------------------------
// StaticLinkSource
// ---------------------------------------------------------------------------

pub struct StaticLinkSource {
    links: Vec<Link>,
    error: Option<String>,
}

impl StaticLinkSource {
    pub fn new(links: &[&str]) -> Self {
        Self {
            links: links.iter().map(|l| Link::from(*l)).collect(),
            error: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            links: Vec::new(),
            error: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl LinkSource for StaticLinkSource {
    async fn get_links(&self) -> Result<Vec<Link>> {
        if let Some(ref message) = self.error {
            bail!("{message}");
        }
        Ok(self.links.clone())
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

enum Scripted {
    Outcome(FetchOutcome),
    Error(String),
}

/// Link-keyed fetcher. Unregistered links come back `Empty`.
/// Builder pattern: `.on_record()`, `.on_empty()`, `.on_failure()`, `.on_error()`.
pub struct MockFetcher {
    scripted: HashMap<String, Scripted>,
    write_scratch: bool,
    calls: Mutex<Vec<(Link, PathBuf)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            scripted: HashMap::new(),
            write_scratch: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Succeed with `record`, stamped with `source_link` the way a real fetcher does.
    pub fn on_record(mut self, link: &str, record: RawRecord) -> Self {
        let record = record.with(SOURCE_LINK, link);
        self.scripted
            .insert(link.to_string(), Scripted::Outcome(FetchOutcome::Fetched(record)));
        self
    }

    pub fn on_empty(mut self, link: &str) -> Self {
        self.scripted
            .insert(link.to_string(), Scripted::Outcome(FetchOutcome::Empty));
        self
    }

    pub fn on_failure(mut self, link: &str, error: &str) -> Self {
        self.scripted.insert(
            link.to_string(),
            Scripted::Outcome(FetchOutcome::Failed {
                error: error.to_string(),
            }),
        );
        self
    }

    /// Return `Err` from `fetch`, as a misbehaving fetcher would.
    pub fn on_error(mut self, link: &str, message: &str) -> Self {
        self.scripted
            .insert(link.to_string(), Scripted::Error(message.to_string()));
        self
    }

    /// Leave a file at the scratch path on every call, to check cleanup.
    pub fn writing_scratch(mut self) -> Self {
        self.write_scratch = true;
        self
    }

    pub fn calls(&self) -> Vec<(Link, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for MockFetcher {
    async fn fetch(&self, link: &Link, scratch: &Path) -> Result<FetchOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((link.clone(), scratch.to_path_buf()));

        if self.write_scratch {
            if let Some(parent) = scratch.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(scratch, b"[]")?;
        }

        match self.scripted.get(link.as_str()) {
            Some(Scripted::Outcome(outcome)) => Ok(outcome.clone()),
            Some(Scripted::Error(message)) => bail!("{message}"),
            None => Ok(FetchOutcome::Empty),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSheets
// ---------------------------------------------------------------------------

/// Recorded spreadsheet call, for asserting call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetsCall {
    ReadColumn {
        spreadsheet: String,
        worksheet: String,
        column: u32,
    },
    Create(String),
    Share(String),
    Write { id: String, rows: Vec<Vec<String>> },
}

pub struct MockSheets {
    column: Vec<serde_json::Value>,
    fail_on: Option<&'static str>,
    calls: Mutex<Vec<SheetsCall>>,
}

impl MockSheets {
    pub fn new() -> Self {
        Self {
            column: Vec::new(),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_column(mut self, column: Vec<serde_json::Value>) -> Self {
        self.column = column;
        self
    }

    /// Fail the named operation: `"read"`, `"create"`, `"share"` or `"write"`.
    pub fn failing_on(mut self, op: &'static str) -> Self {
        self.fail_on = Some(op);
        self
    }

    pub fn calls(&self) -> Vec<SheetsCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, op: &str) -> Result<()> {
        if self.fail_on == Some(op) {
            bail!("API error (status 403): {op} denied");
        }
        Ok(())
    }
}

impl Default for MockSheets {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetsApi for MockSheets {
    async fn read_column(
        &self,
        spreadsheet: &str,
        worksheet: &str,
        column: u32,
    ) -> Result<Vec<serde_json::Value>> {
        self.calls.lock().unwrap().push(SheetsCall::ReadColumn {
            spreadsheet: spreadsheet.to_string(),
            worksheet: worksheet.to_string(),
            column,
        });
        self.check("read")?;
        Ok(self.column.clone())
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(SheetsCall::Create(title.to_string()));
        self.check("create")?;
        Ok("sheet-1".to_string())
    }

    async fn share_publicly(&self, spreadsheet_id: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(SheetsCall::Share(spreadsheet_id.to_string()));
        self.check("share")
    }

    async fn write_rows(&self, spreadsheet_id: &str, rows: &[Vec<String>]) -> Result<()> {
        self.calls.lock().unwrap().push(SheetsCall::Write {
            id: spreadsheet_id.to_string(),
            rows: rows.to_vec(),
        });
        self.check("write")
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Keeps saved tables by destination. Mirrors real sinks: empty tables are skipped.
pub struct MemorySink {
    saved: Mutex<Vec<(String, Table)>>,
    failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    /// Every save returns `Err`.
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn saved(&self) -> Vec<(String, Table)> {
        self.saved.lock().unwrap().clone()
    }

    pub fn destinations(&self) -> Vec<String> {
        self.saved().into_iter().map(|(d, _)| d).collect()
    }

    pub fn table(&self, destination: &str) -> Option<Table> {
        self.saved()
            .into_iter()
            .find(|(d, _)| d == destination)
            .map(|(_, t)| t)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn save(&self, table: &Table, destination: &str) -> Result<String> {
        if self.failing {
            bail!("disk full");
        }
        if table.is_empty() {
            return Ok(String::new());
        }
        self.saved
            .lock()
            .unwrap()
            .push((destination.to_string(), table.clone()));
        Ok(format!("memory://{destination}"))
    }
}

// ---------------------------------------------------------------------------
// RecordingPacer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPacer {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn wait(&self, delay: Duration) {
        self.waits.lock().unwrap().push(delay);
    }
}
