pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::ClipstatError;
pub use types::*;

/// Run identifier: local wall-clock time, e.g. `20250415_092751`.
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
