use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use clipstat_common::Table;

use crate::traits::{ResultSink, SheetsApi};

/// Public view URL for a spreadsheet id.
pub fn sheet_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{spreadsheet_id}/edit?usp=sharing")
}

/// Uploads each table into a freshly created, publicly readable spreadsheet.
pub struct SheetsSink {
    sheets: Arc<dyn SheetsApi>,
}

impl SheetsSink {
    pub fn new(sheets: Arc<dyn SheetsApi>) -> Self {
        Self { sheets }
    }

    async fn upload(&self, table: &Table, title: &str) -> Result<String> {
        let id = self.sheets.create_spreadsheet(title).await?;
        self.sheets.share_publicly(&id).await?;
        self.sheets.write_rows(&id, &table.to_values()).await?;
        Ok(id)
    }
}

#[async_trait]
impl ResultSink for SheetsSink {
    /// Never returns `Err`: any remote failure is logged and yields `""`.
    async fn save(&self, table: &Table, destination: &str) -> Result<String> {
        if table.is_empty() {
            return Ok(String::new());
        }

        match self.upload(table, destination).await {
            Ok(id) => {
                info!(
                    spreadsheet_id = %id,
                    rows = table.len(),
                    url = %sheet_url(&id),
                    "Data uploaded to Google Sheets"
                );
                Ok(id)
            }
            Err(e) => {
                warn!(title = destination, error = %e, "Error uploading to Google Sheets");
                Ok(String::new())
            }
        }
    }
}
