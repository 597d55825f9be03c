pub mod fetcher;
pub mod link_source;
pub mod normalizer;
pub mod pipeline;
pub mod sink;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use fetcher::ApifyFetcher;
pub use link_source::SheetLinkSource;
pub use normalizer::{FieldRule, RecordNormalizer};
pub use pipeline::{CollectionPipeline, RunFiles, RunReport};
pub use sink::{CsvSink, SheetsSink};
pub use stats::RunStats;
pub use traits::{
    FetchOutcome, LinkSource, MetadataFetcher, Pacer, ResultSink, SheetsApi, SleepPacer,
};
