//! Pipeline tests: scripted links and fetch outcomes → CollectionPipeline::run() → assert.
//!
//! Mocks at every trait boundary. No network, no sleeping.

use std::sync::Arc;
use std::time::Duration;

use clipstat_collector::sink::read_csv;
use clipstat_collector::testing::{
    MemorySink, MockFetcher, MockSheets, RecordingPacer, SheetsCall, StaticLinkSource,
};
use clipstat_collector::{CollectionPipeline, CsvSink, ResultSink, SheetsSink};
use clipstat_common::{OutcomeStatus, RawRecord, LINK_INDEX, NORMALIZED_HEADERS, SOURCE_LINK};

const TS: &str = "20250415_092751";
const L1: &str = "https://www.tiktok.com/@a/video/1";
const L2: &str = "https://www.tiktok.com/@b/video/2";
const L3: &str = "https://www.tiktok.com/@c/video/3";

fn video(views: &str, author: &str, followers: &str) -> RawRecord {
    RawRecord::new()
        .with("video_playcount", views)
        .with("author_username", author)
        .with("author_followercount", followers)
}

struct Harness {
    fetcher: Arc<MockFetcher>,
    files: Arc<MemorySink>,
    sheets: Arc<MemorySink>,
    pacer: Arc<RecordingPacer>,
    scratch: tempfile::TempDir,
}

impl Harness {
    fn new(fetcher: MockFetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            files: Arc::new(MemorySink::new()),
            sheets: Arc::new(MemorySink::new()),
            pacer: Arc::new(RecordingPacer::new()),
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    fn pipeline(&self, links: &[&str]) -> CollectionPipeline {
        CollectionPipeline::builder()
            .source(Arc::new(StaticLinkSource::new(links)))
            .fetcher(self.fetcher.clone())
            .file_sink(self.files.clone())
            .sheet_sink(Some(self.sheets.clone() as Arc<dyn ResultSink>))
            .pacer(self.pacer.clone())
            .scratch_dir(self.scratch.path())
            .build()
    }
}

// ---------------------------------------------------------------------------
// Error isolation and pacing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_middle_link_is_isolated() {
    let h = Harness::new(
        MockFetcher::new()
            .on_record(L1, video("100", "a", "10"))
            .on_error(L2, "connection reset by peer")
            .on_record(L3, video("300", "c", "30")),
    );

    let report = h.pipeline(&[L1, L2, L3]).run(TS).await.unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.outcomes[0].status, OutcomeStatus::Success);
    assert_eq!(report.outcomes[1].status, OutcomeStatus::Failed);
    assert_eq!(report.outcomes[2].status, OutcomeStatus::Success);
    let error = report.outcomes[1].error.as_deref().unwrap();
    assert!(error.contains("connection reset"), "got {error}");

    assert_eq!(report.raw.len(), 2);
    assert_eq!(report.raw[0].get(SOURCE_LINK), Some(L1));
    assert_eq!(report.raw[1].get(SOURCE_LINK), Some(L3));

    assert_eq!(h.pacer.waits(), vec![Duration::from_secs(5); 2]);
}

#[tokio::test]
async fn empty_fetch_is_reported_as_failure() {
    let h = Harness::new(MockFetcher::new().on_empty(L1));

    let report = h.pipeline(&[L1]).run(TS).await.unwrap();

    assert_eq!(report.outcomes[0].status, OutcomeStatus::Failed);
    assert_eq!(report.outcomes[0].error.as_deref(), Some("Empty data returned"));
    assert!(h.pacer.waits().is_empty(), "no wait after the last link");
}

#[tokio::test]
async fn fetcher_reported_failure_keeps_its_message() {
    let h = Harness::new(MockFetcher::new().on_failure(L1, "Post not found or private"));

    let report = h.pipeline(&[L1]).run(TS).await.unwrap();

    assert_eq!(
        report.outcomes[0].error.as_deref(),
        Some("Post not found or private")
    );
}

#[tokio::test]
async fn link_index_is_one_based_discovery_order() {
    let h = Harness::new(
        MockFetcher::new()
            .on_empty(L1)
            .on_record(L2, video("1", "b", "1")),
    );

    let report = h.pipeline(&[L1, L2]).run(TS).await.unwrap();

    assert_eq!(report.raw.len(), 1);
    assert_eq!(report.raw[0].get(LINK_INDEX), Some("2"));
    assert_eq!(report.outcomes[1].index, 2);
}

#[tokio::test]
async fn duplicate_links_are_each_attempted() {
    let h = Harness::new(MockFetcher::new().on_record(L1, video("1", "a", "1")));

    let report = h.pipeline(&[L1, L1]).run(TS).await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.raw.len(), 2);
    assert_eq!(h.fetcher.calls().len(), 2);
}

#[tokio::test]
async fn limit_truncates_links() {
    let h = Harness::new(MockFetcher::new());
    let pipeline = CollectionPipeline::builder()
        .source(Arc::new(StaticLinkSource::new(&[L1, L2, L3])))
        .fetcher(h.fetcher.clone())
        .file_sink(h.files.clone())
        .pacer(h.pacer.clone())
        .scratch_dir(h.scratch.path())
        .delay(Duration::from_millis(10))
        .limit(Some(2))
        .build();

    let report = pipeline.run(TS).await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(h.pacer.waits(), vec![Duration::from_millis(10)]);
}

// ---------------------------------------------------------------------------
// Scratch files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scratch_files_are_per_link_and_removed() {
    let h = Harness::new(
        MockFetcher::new()
            .writing_scratch()
            .on_record(L1, video("1", "a", "1"))
            .on_error(L2, "boom"),
    );

    h.pipeline(&[L1, L2]).run(TS).await.unwrap();

    let calls = h.fetcher.calls();
    assert_eq!(calls[0].1, h.scratch.path().join("temp_tiktok_data_1.json"));
    assert_eq!(calls[1].1, h.scratch.path().join("temp_tiktok_data_2.json"));
    for (_, path) in calls {
        assert!(!path.exists(), "{} should be cleaned up", path.display());
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn outputs_are_named_by_run_timestamp() {
    let h = Harness::new(MockFetcher::new().on_record(L1, video("100", "a", "10")));

    let report = h.pipeline(&[L1]).run(TS).await.unwrap();

    assert_eq!(
        h.files.destinations(),
        vec![
            format!("all_tiktok_data_{TS}.csv"),
            format!("processing_summary_{TS}.csv"),
            format!("formatted_tiktok_data_{TS}.csv"),
        ]
    );
    assert_eq!(
        h.sheets.destinations(),
        vec![format!("TikTok Data Analysis {TS}")]
    );
    assert_eq!(report.files.raw, Some(format!("memory://all_tiktok_data_{TS}.csv")));
    assert!(report.spreadsheet_id.is_some());
    assert_eq!(report.stats.files_written, 3);
}

#[tokio::test]
async fn normalized_report_uses_fixed_schema() {
    let h = Harness::new(
        MockFetcher::new()
            .on_record(L1, video("100", "Phương", "10"))
            .on_record(L2, video("200", "b", "20")),
    );

    h.pipeline(&[L1, L2]).run(TS).await.unwrap();

    let report = h
        .files
        .table(&format!("formatted_tiktok_data_{TS}.csv"))
        .unwrap();
    assert_eq!(report.headers, NORMALIZED_HEADERS);
    assert_eq!(report.rows[0], vec!["1", L1, "100", "Phương", "10"]);
    assert_eq!(report.rows[1], vec!["2", L2, "200", "b", "20"]);
}

#[tokio::test]
async fn mixed_response_shapes_keep_each_rows_data() {
    let h = Harness::new(
        MockFetcher::new()
            .on_record(L1, video("100", "a", "10"))
            .on_record(
                L2,
                RawRecord::new()
                    .with("playCount", "200")
                    .with("authorMeta_name", "b"),
            ),
    );

    h.pipeline(&[L1, L2]).run(TS).await.unwrap();

    let report = h
        .files
        .table(&format!("formatted_tiktok_data_{TS}.csv"))
        .unwrap();
    assert_eq!(report.rows[0], vec!["1", L1, "100", "a", "10"]);
    assert_eq!(report.rows[1], vec!["2", L2, "200", "b", "0"]);
}

#[tokio::test]
async fn all_failures_still_write_summary_only() {
    let h = Harness::new(MockFetcher::new().on_error(L1, "x").on_empty(L2));

    let report = h.pipeline(&[L1, L2]).run(TS).await.unwrap();

    assert_eq!(
        h.files.destinations(),
        vec![format!("processing_summary_{TS}.csv")]
    );
    assert!(h.sheets.saved().is_empty());
    assert_eq!(report.stats.links_succeeded, 0);
    assert_eq!(report.stats.links_attempted, 2);
    assert!(report.files.raw.is_none());
}

#[tokio::test]
async fn no_links_means_no_fetches_and_no_files() {
    let h = Harness::new(MockFetcher::new());

    let report = h.pipeline(&[]).run(TS).await.unwrap();

    assert!(report.outcomes.is_empty());
    assert!(h.fetcher.calls().is_empty());
    assert!(h.files.saved().is_empty());
    assert!(h.pacer.waits().is_empty());
}

#[tokio::test]
async fn link_source_failure_aborts_before_fetching() {
    let h = Harness::new(MockFetcher::new());
    let pipeline = CollectionPipeline::builder()
        .source(Arc::new(StaticLinkSource::failing("Spreadsheet not found")))
        .fetcher(h.fetcher.clone())
        .file_sink(h.files.clone())
        .pacer(h.pacer.clone())
        .scratch_dir(h.scratch.path())
        .build();

    let err = pipeline.run(TS).await.unwrap_err();

    assert!(format!("{err:#}").contains("Spreadsheet not found"));
    assert!(h.fetcher.calls().is_empty());
    assert!(h.files.saved().is_empty());
}

#[tokio::test]
async fn failing_file_sink_does_not_abort_run() {
    let fetcher = Arc::new(MockFetcher::new().on_record(L1, video("1", "a", "1")));
    let sheets = Arc::new(MemorySink::new());
    let scratch = tempfile::tempdir().unwrap();
    let pipeline = CollectionPipeline::builder()
        .source(Arc::new(StaticLinkSource::new(&[L1])))
        .fetcher(fetcher)
        .file_sink(Arc::new(MemorySink::failing()))
        .sheet_sink(Some(sheets.clone() as Arc<dyn ResultSink>))
        .pacer(Arc::new(RecordingPacer::new()))
        .scratch_dir(scratch.path())
        .build();

    let report = pipeline.run(TS).await.unwrap();

    assert_eq!(report.files, Default::default());
    assert_eq!(sheets.saved().len(), 1, "sheet upload still happens");
}

#[tokio::test]
async fn sheet_failure_leaves_csv_outputs_intact() {
    let dir = tempfile::tempdir().unwrap();
    let mock_sheets = Arc::new(MockSheets::new().failing_on("share"));
    let sheet_sink: Arc<dyn ResultSink> = Arc::new(SheetsSink::new(mock_sheets.clone()));
    let pipeline = CollectionPipeline::builder()
        .source(Arc::new(StaticLinkSource::new(&[L1])))
        .fetcher(Arc::new(
            MockFetcher::new().on_record(L1, video("100", "a", "10")),
        ))
        .file_sink(Arc::new(CsvSink::new(dir.path(), true)))
        .sheet_sink(Some(sheet_sink))
        .pacer(Arc::new(RecordingPacer::new()))
        .scratch_dir(dir.path())
        .build();

    let report = pipeline.run(TS).await.unwrap();

    assert!(report.spreadsheet_id.is_none());
    assert!(!report.stats.sheet_uploaded);
    assert!(matches!(mock_sheets.calls()[0], SheetsCall::Create(_)));

    let formatted = read_csv(report.files.formatted.as_deref().unwrap()).unwrap();
    assert_eq!(formatted.len(), 1);
    let raw = read_csv(report.files.raw.as_deref().unwrap()).unwrap();
    assert!(raw.headers.iter().any(|h| h == SOURCE_LINK));
    assert!(raw.headers.iter().any(|h| h == LINK_INDEX));
}
