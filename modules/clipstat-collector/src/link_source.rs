use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use clipstat_common::{cell_text, Link};

use crate::traits::{LinkSource, SheetsApi};

/// Reads candidate links from one column of a named worksheet.
pub struct SheetLinkSource {
    sheets: Arc<dyn SheetsApi>,
    spreadsheet: String,
    worksheet: String,
    column: u32,
    pattern: String,
}

impl SheetLinkSource {
    pub fn new(
        sheets: Arc<dyn SheetsApi>,
        spreadsheet: impl Into<String>,
        worksheet: impl Into<String>,
        column: u32,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            sheets,
            spreadsheet: spreadsheet.into(),
            worksheet: worksheet.into(),
            column,
            pattern: pattern.into(),
        }
    }
}

#[async_trait]
impl LinkSource for SheetLinkSource {
    async fn get_links(&self) -> Result<Vec<Link>> {
        let cells = self
            .sheets
            .read_column(&self.spreadsheet, &self.worksheet, self.column)
            .await
            .with_context(|| {
                format!(
                    "Failed to read column {} of '{}' / '{}'",
                    self.column, self.spreadsheet, self.worksheet
                )
            })?;

        let links = filter_links(&cells, &self.pattern);
        info!(
            spreadsheet = %self.spreadsheet,
            worksheet = %self.worksheet,
            cells = cells.len(),
            links = links.len(),
            "Read links from sheet"
        );
        Ok(links)
    }
}

/// Keep cells whose text contains `pattern`, in order, duplicates included.
pub fn filter_links(cells: &[serde_json::Value], pattern: &str) -> Vec<Link> {
    cells
        .iter()
        .map(|cell| Link::new(cell_text(cell).trim()))
        .filter(|link| link.matches_domain(pattern))
        .collect()
}
