pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{RunData, RunState, TikTokVideoInput};

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Server-side long-poll per status request.
const WAIT_FOR_FINISH_SECS: u64 = 60;
/// Must outlast one long-poll.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(WAIT_FOR_FINISH_SECS + 30);
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10 * 60);

/// Actor ID for clockworks/tiktok-scraper (`username~actor-name` form).
const TIKTOK_SCRAPER: &str = "clockworks~tiktok-scraper";

pub struct ApifyClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    max_wait: Duration,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, BASE_URL)
    }

    /// Point the client at a different API root (proxies, local stubs).
    pub fn with_base_url(token: String, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    /// Give up on a run that has not finished after `max_wait`.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize + ?Sized>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let resp = error_for_status(resp).await?;
        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes, long-polling with `waitForFinish`.
    /// Fails with [`ApifyError::Timeout`] once `max_wait` has passed.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        let started = Instant::now();
        loop {
            let url = format!(
                "{}/actor-runs/{}?waitForFinish={}",
                self.base_url, run_id, WAIT_FOR_FINISH_SECS
            );
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let resp = error_for_status(resp).await?;
            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.state() {
                RunState::Succeeded => return Ok(api_resp.data),
                RunState::Failed => {
                    return Err(ApifyError::RunFailed {
                        run_id: api_resp.data.id,
                        status: api_resp.data.status,
                    });
                }
                RunState::Running => {
                    if started.elapsed() >= self.max_wait {
                        return Err(ApifyError::Timeout {
                            run_id: run_id.to_string(),
                            waited_secs: started.elapsed().as_secs(),
                        });
                    }
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let resp = error_for_status(resp).await?;
        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Scrape one TikTok video's metadata end-to-end: start run, poll, fetch results.
    ///
    /// Items are returned untyped: the actor's output fields drift between
    /// versions, so callers decide which keys they care about.
    pub async fn scrape_tiktok_video(&self, video_url: &str) -> Result<Vec<serde_json::Value>> {
        tracing::info!(video_url, "Starting TikTok video scrape");

        let input = TikTokVideoInput::single(video_url);
        let run = self.start_run(TIKTOK_SCRAPER, &input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            duration_secs = completed.duration().map(|d| d.num_seconds()),
            "Run completed, fetching results"
        );

        let items: Vec<serde_json::Value> = self
            .get_dataset_items(&completed.default_dataset_id)
            .await?;
        tracing::info!(count = items.len(), "Fetched TikTok video items");

        Ok(items)
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApifyError::Api {
        status: status.as_u16(),
        message: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer every request with the same JSON body.
    async fn serve_forever(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn stalled_run_times_out() {
        let base = serve_forever(
            r#"{"data": {"id": "run1", "status": "RUNNING", "defaultDatasetId": "ds1"}}"#,
        )
        .await;
        let client = ApifyClient::with_base_url("token".into(), &base).with_max_wait(Duration::ZERO);

        let err = client.wait_for_run("run1").await.unwrap_err();

        assert!(
            matches!(err, ApifyError::Timeout { ref run_id, .. } if run_id == "run1"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn succeeded_run_returns_immediately() {
        let base = serve_forever(
            r#"{"data": {"id": "run1", "status": "SUCCEEDED", "defaultDatasetId": "ds1"}}"#,
        )
        .await;
        let client = ApifyClient::with_base_url("token".into(), &base).with_max_wait(Duration::ZERO);

        let run = client.wait_for_run("run1").await.unwrap();

        assert_eq!(run.default_dataset_id, "ds1");
    }
}
