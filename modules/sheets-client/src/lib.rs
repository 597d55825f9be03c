pub mod a1;
pub mod auth;
pub mod error;
pub mod types;

pub use auth::{ServiceAccountKey, TokenProvider, DRIVE_SCOPE, SPREADSHEETS_SCOPE};
pub use error::{Result, SheetsError};
pub use types::{cell_value, DriveFile, ValueRange};

use std::path::Path;
use std::time::Duration;

use reqwest::{Method, Url};
use serde_json::json;
use types::{DriveFileList, Spreadsheet};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

pub struct SheetsClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    sheets_base: String,
    drive_base: String,
}

impl SheetsClient {
    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let tokens = TokenProvider::new(http.clone(), key, &[SPREADSHEETS_SCOPE, DRIVE_SCOPE]);

        Ok(Self {
            http,
            tokens,
            sheets_base: SHEETS_BASE_URL.to_string(),
            drive_base: DRIVE_BASE_URL.to_string(),
        })
    }

    /// Load a service-account key file and build a client from it.
    pub fn from_key_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(ServiceAccountKey::from_file(path)?)
    }

    /// Override the Sheets and Drive API roots.
    pub fn with_endpoints(mut self, sheets_base: &str, drive_base: &str) -> Self {
        self.sheets_base = sheets_base.trim_end_matches('/').to_string();
        self.drive_base = drive_base.trim_end_matches('/').to_string();
        self
    }

    pub fn client_email(&self) -> &str {
        self.tokens.client_email()
    }

    /// Resolve a spreadsheet visible to the service account by its exact title.
    pub async fn find_spreadsheet(&self, name: &str) -> Result<DriveFile> {
        let q = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            a1::drive_literal(name),
            SPREADSHEET_MIME
        );
        let url = self.url(&self.drive_base, &["files"])?;
        let resp = self
            .request(Method::GET, url)
            .await?
            .query(&[
                ("q", q.as_str()),
                ("fields", "files(id,name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;

        let list: DriveFileList = error_for_status(resp).await?.json().await?;
        if list.files.len() > 1 {
            tracing::warn!(
                name,
                matches = list.files.len(),
                "Several spreadsheets share this title, using the first"
            );
        }
        let file = list
            .files
            .into_iter()
            .next()
            .ok_or_else(|| SheetsError::NotFound(name.to_string()))?;
        tracing::debug!(
            id = %file.id,
            name = file.name.as_deref().unwrap_or_default(),
            "Resolved spreadsheet"
        );
        Ok(file)
    }

    /// Read a whole column of a worksheet, top to bottom, unformatted.
    pub async fn column_values(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        column: u32,
    ) -> Result<Vec<serde_json::Value>> {
        let range = a1::column_range(worksheet, column);
        let url = self.url(
            &self.sheets_base,
            &["spreadsheets", spreadsheet_id, "values", &range],
        )?;
        let resp = self
            .request(Method::GET, url)
            .await?
            .query(&[
                ("majorDimension", "COLUMNS"),
                ("valueRenderOption", "UNFORMATTED_VALUE"),
            ])
            .send()
            .await?;

        let values: ValueRange = error_for_status(resp).await?.json().await?;
        tracing::debug!(spreadsheet_id, range = %range, "Read column values");
        Ok(values.into_first_column())
    }

    /// Create an empty spreadsheet owned by the service account. Returns its id.
    pub async fn create_spreadsheet(&self, title: &str) -> Result<String> {
        let url = self.url(&self.sheets_base, &["spreadsheets"])?;
        let resp = self
            .request(Method::POST, url)
            .await?
            .json(&json!({ "properties": { "title": title } }))
            .send()
            .await?;

        let sheet: Spreadsheet = error_for_status(resp).await?.json().await?;
        tracing::info!(spreadsheet_id = %sheet.spreadsheet_id, title, "Created spreadsheet");
        Ok(sheet.spreadsheet_id)
    }

    /// Grant anyone-with-the-link read access.
    pub async fn share_publicly(&self, file_id: &str) -> Result<()> {
        let url = self.url(&self.drive_base, &["files", file_id, "permissions"])?;
        let resp = self
            .request(Method::POST, url)
            .await?
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await?;

        error_for_status(resp).await?;
        Ok(())
    }

    /// Overwrite cells starting at `start` (A1 notation). Numeric text is sent
    /// as numbers, see [`types::cell_value`].
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        start: &str,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let url = self.url(
            &self.sheets_base,
            &["spreadsheets", spreadsheet_id, "values", start],
        )?;
        let resp = self
            .request(Method::PUT, url)
            .await?
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": start,
                "majorDimension": "ROWS",
                "values": types::row_values(rows),
            }))
            .send()
            .await?;

        error_for_status(resp).await?;
        tracing::debug!(spreadsheet_id, rows = rows.len(), "Wrote values");
        Ok(())
    }

    fn url(&self, base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base).map_err(|e| SheetsError::Parse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Parse(format!("not a base URL: {base}")))?
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<reqwest::RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SheetsError::NotFound(message));
    }
    Err(SheetsError::Api {
        status: status.as_u16(),
        message,
    })
}
