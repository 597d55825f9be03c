use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::ClipstatError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Scraping
    pub apify_api_key: String,

    // Google service account
    pub service_account_file: PathBuf,

    // Link source
    pub source_spreadsheet: String,
    pub source_worksheet: String,
    /// 1-based column holding the links (11 = column K).
    pub source_column: u32,
    pub link_pattern: String,

    // Platform naming (file names and sheet titles)
    pub platform: String,
    pub platform_label: String,

    // Output
    pub output_dir: PathBuf,
    pub request_delay: Duration,
    pub csv_bom: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ClipstatError> {
        Ok(Self {
            apify_api_key: required_env("APIFY_API_KEY")?,
            service_account_file: PathBuf::from(required_env("GOOGLE_SERVICE_ACCOUNT_FILE")?),
            source_spreadsheet: required_env("SOURCE_SPREADSHEET")?,
            source_worksheet: required_env("SOURCE_WORKSHEET")?,
            source_column: parsed_env("SOURCE_COLUMN", 11)?,
            link_pattern: env::var("LINK_PATTERN").unwrap_or_else(|_| "tiktok.com".to_string()),
            platform: env::var("PLATFORM").unwrap_or_else(|_| "tiktok".to_string()),
            platform_label: env::var("PLATFORM_LABEL").unwrap_or_else(|_| "TikTok".to_string()),
            output_dir: PathBuf::from(
                env::var("OUTPUT_DIR").unwrap_or_else(|_| "tiktok_data".to_string()),
            ),
            request_delay: Duration::from_secs(parsed_env("REQUEST_DELAY_SECS", 5)?),
            csv_bom: parsed_env("CSV_BOM", true)?,
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            apify_api_key = %redact(&self.apify_api_key),
            service_account_file = %self.service_account_file.display(),
            source_spreadsheet = %self.source_spreadsheet,
            source_worksheet = %self.source_worksheet,
            source_column = self.source_column,
            link_pattern = %self.link_pattern,
            platform = %self.platform,
            output_dir = %self.output_dir.display(),
            request_delay_secs = self.request_delay.as_secs(),
            csv_bom = self.csv_bom,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> Result<String, ClipstatError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ClipstatError::Config(format!(
            "{key} environment variable is required"
        ))),
    }
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ClipstatError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ClipstatError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// Keep the first four characters of a secret.
fn redact(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    let head: String = secret.chars().take(4).collect();
    format!("{head}****")
}
