// Apify-backed metadata fetcher.
// Scrapes one video, hands the dataset through the scratch file, reads it back.

use std::path::Path;

use anyhow::Result;
use apify_client::ApifyClient;
use async_trait::async_trait;
use tracing::{info, warn};

use clipstat_common::{Link, RawRecord, SOURCE_LINK};

use crate::traits::{FetchOutcome, MetadataFetcher};

pub struct ApifyFetcher {
    client: ApifyClient,
}

impl ApifyFetcher {
    pub fn new(client: ApifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataFetcher for ApifyFetcher {
    async fn fetch(&self, link: &Link, scratch: &Path) -> Result<FetchOutcome> {
        let items = match self.client.scrape_tiktok_video(link.as_str()).await {
            Ok(items) => items,
            Err(e) => {
                warn!(link = %link, error = %e, "Scrape failed");
                return Ok(FetchOutcome::Failed {
                    error: e.to_string(),
                });
            }
        };

        if let Err(e) = write_scratch(scratch, &items).await {
            warn!(link = %link, scratch = %scratch.display(), error = %e, "Scratch write failed");
            return Ok(FetchOutcome::Failed {
                error: e.to_string(),
            });
        }

        let outcome = read_scratch(scratch, link).await;
        if let FetchOutcome::Fetched(ref record) = outcome {
            info!(link = %link, fields = record.len(), "Fetched video metadata");
        }
        Ok(outcome)
    }
}

async fn write_scratch(scratch: &Path, items: &[serde_json::Value]) -> Result<()> {
    if let Some(parent) = scratch.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(scratch, serde_json::to_vec(items)?).await?;
    Ok(())
}

/// Turn a scratch file of dataset items into a fetch outcome.
///
/// The first item wins. An item carrying only an `error` message (the actor's
/// way of reporting an unavailable video) is a failure, not data.
pub async fn read_scratch(scratch: &Path, link: &Link) -> FetchOutcome {
    let bytes = match tokio::fs::read(scratch).await {
        Ok(b) => b,
        Err(e) => {
            return FetchOutcome::Failed {
                error: format!("Failed to read {}: {e}", scratch.display()),
            }
        }
    };

    let items: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
        Ok(items) => items,
        Err(e) => {
            return FetchOutcome::Failed {
                error: format!("Malformed scratch data: {e}"),
            }
        }
    };

    // Anything but an object (`null`, a bare string) carries no metadata.
    let Some(item) = items.into_iter().next().filter(|i| i.is_object()) else {
        return FetchOutcome::Empty;
    };

    if let Some(error) = actor_error(&item) {
        return FetchOutcome::Failed { error };
    }

    let record = RawRecord::from_json(&item);
    if record.is_empty() {
        return FetchOutcome::Empty;
    }
    FetchOutcome::Fetched(record.with(SOURCE_LINK, link.as_str()))
}

fn actor_error(item: &serde_json::Value) -> Option<String> {
    let obj = item.as_object()?;
    if obj.contains_key("id") {
        return None;
    }
    obj.get("error")
        .and_then(|e| e.as_str())
        .map(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LINK: &str = "https://www.tiktok.com/@abby/video/7350";

    async fn outcome_for(contents: &str) -> FetchOutcome {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_tiktok_data_1.json");
        tokio::fs::write(&path, contents).await.unwrap();
        read_scratch(&path, &Link::from(LINK)).await
    }

    #[tokio::test]
    async fn first_item_is_flattened_and_stamped() {
        let items = json!([
            { "id": "7350", "playCount": 1200, "authorMeta": { "name": "abby", "fans": 5000 } },
            { "id": "9999" }
        ]);
        match outcome_for(&items.to_string()).await {
            FetchOutcome::Fetched(record) => {
                assert_eq!(record.get("id"), Some("7350"));
                assert_eq!(record.get("authorMeta_fans"), Some("5000"));
                assert_eq!(record.source_link(), Some(LINK));
            }
            other => panic!("expected Fetched, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_dataset_is_empty() {
        assert_eq!(outcome_for("[]").await, FetchOutcome::Empty);
        assert_eq!(outcome_for("[{}]").await, FetchOutcome::Empty);
    }

    #[tokio::test]
    async fn non_object_item_is_empty() {
        for contents in ["[null]", r#"["oops"]"#, "[42]", "[[]]"] {
            assert_eq!(outcome_for(contents).await, FetchOutcome::Empty, "{contents}");
        }
    }

    #[tokio::test]
    async fn actor_error_item_is_failure() {
        let items = json!([{ "url": LINK, "error": "Post not found or private" }]);
        assert_eq!(
            outcome_for(&items.to_string()).await,
            FetchOutcome::Failed {
                error: "Post not found or private".to_string()
            }
        );
    }

    #[tokio::test]
    async fn malformed_scratch_is_failure() {
        match outcome_for("{not json").await {
            FetchOutcome::Failed { error } => assert!(error.starts_with("Malformed scratch data")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_scratch_is_failure() {
        let outcome = read_scratch(Path::new("/nonexistent/scratch.json"), &Link::from(LINK)).await;
        assert!(matches!(outcome, FetchOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn unreachable_api_becomes_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = ApifyFetcher::new(ApifyClient::with_base_url(
            "token".into(),
            "http://127.0.0.1:9",
        ));
        let outcome = fetcher
            .fetch(&Link::from(LINK), &dir.path().join("scratch.json"))
            .await
            .unwrap();
        assert!(matches!(outcome, FetchOutcome::Failed { .. }));
    }
}
