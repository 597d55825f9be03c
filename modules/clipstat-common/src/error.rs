use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipstatError {
    #[error("Configuration error: {0}")]
    Config(String),
}
