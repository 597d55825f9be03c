mod file;
mod sheets;

pub use file::{read_csv, CsvSink};
pub use sheets::{sheet_url, SheetsSink};
