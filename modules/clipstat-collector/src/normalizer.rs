// Raw scraper rows → fixed five-column report rows.
//
// The scraper's field names drift between response versions, so each report
// field resolves through an ordered candidate list. New spellings go in the
// rule tables below; the resolution loop never changes.

use clipstat_common::{NormalizedRecord, RawRecord, SOURCE_LINK};

/// One logical report field: candidate raw columns in priority order, plus
/// the value used when a row has none of them.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub candidates: Vec<String>,
    pub default: String,
}

impl FieldRule {
    pub fn new(candidates: &[&str], default: &str) -> Self {
        Self {
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            default: default.to_string(),
        }
    }

    /// Value from the first candidate this record carries, else the default.
    ///
    /// Resolution is per row, so a run mixing response shapes keeps every
    /// row's data. Blank cells count as missing: a re-read raw CSV pads absent
    /// columns with them.
    fn value(&self, record: &RawRecord) -> String {
        self.candidates
            .iter()
            .find_map(|c| record.get(c).filter(|v| !v.is_empty()))
            .unwrap_or(self.default.as_str())
            .to_string()
    }
}

#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    views: FieldRule,
    author: FieldRule,
    followers: FieldRule,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self {
            views: FieldRule::new(
                &["video_playcount", "stats_playCount", "play_count", "playCount"],
                "0",
            ),
            author: FieldRule::new(
                &[
                    "author_username",
                    "author_uniqueId",
                    "author_nickname",
                    "authorMeta_name",
                ],
                "Unknown",
            ),
            followers: FieldRule::new(
                &[
                    "author_followercount",
                    "authorStats_followerCount",
                    "authorMeta_fans",
                ],
                "0",
            ),
        }
    }
}

impl RecordNormalizer {
    pub fn new(views: FieldRule, author: FieldRule, followers: FieldRule) -> Self {
        Self {
            views,
            author,
            followers,
        }
    }

    /// One output row per input row, numbered 1..N in input order.
    pub fn normalize(&self, records: &[RawRecord]) -> Vec<NormalizedRecord> {
        let normalized: Vec<NormalizedRecord> = records
            .iter()
            .enumerate()
            .map(|(i, record)| NormalizedRecord {
                sequence: i + 1,
                link: record.get(SOURCE_LINK).unwrap_or_default().to_string(),
                views: self.views.value(record),
                author: self.author.value(record),
                followers: self.followers.value(record),
            })
            .collect();
        tracing::debug!(rows = normalized.len(), "Normalized records");
        normalized
    }
}
