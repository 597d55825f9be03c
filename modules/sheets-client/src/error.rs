use thiserror::Error;

pub type Result<T> = std::result::Result<T, SheetsError>;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Spreadsheet not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for SheetsError {
    fn from(err: reqwest::Error) -> Self {
        SheetsError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SheetsError {
    fn from(err: serde_json::Error) -> Self {
        SheetsError::Parse(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for SheetsError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        SheetsError::Credentials(err.to_string())
    }
}
