use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Input for the clockworks/tiktok-scraper actor when scraping individual videos.
#[derive(Debug, Clone, Serialize)]
pub struct TikTokVideoInput {
    #[serde(rename = "postURLs")]
    pub post_urls: Vec<String>,
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
    #[serde(rename = "shouldDownloadVideos")]
    pub should_download_videos: bool,
    #[serde(rename = "shouldDownloadCovers")]
    pub should_download_covers: bool,
}

impl TikTokVideoInput {
    /// Metadata-only scrape of a single video URL.
    pub fn single(url: &str) -> Self {
        Self {
            post_urls: vec![url.to_string()],
            results_per_page: 1,
            should_download_videos: false,
            should_download_covers: false,
        }
    }
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Coarse classification of an actor run's `status` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Succeeded,
    Failed,
}

impl RunData {
    /// Wall-clock run time, once the run has finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    pub fn state(&self) -> RunState {
        match self.status.as_str() {
            "SUCCEEDED" => RunState::Succeeded,
            "FAILED" | "ABORTED" | "TIMED-OUT" | "TIMED_OUT" => RunState::Failed,
            _ => RunState::Running,
        }
    }
}
