use std::fmt;

use serde::{Deserialize, Serialize};

/// Field stamped on every raw record by the fetcher.
pub const SOURCE_LINK: &str = "source_link";
/// Field stamped on every raw record by the pipeline (1-based discovery order).
pub const LINK_INDEX: &str = "link_index";

/// Report headers, in column order.
pub const NORMALIZED_HEADERS: [&str; 5] = [
    "STT",
    "Link Video",
    "Lượt xem",
    "Người Đăng",
    "Follower Người Đăng",
];

pub const OUTCOME_HEADERS: [&str; 4] = ["index", "link", "status", "error"];

// --- Links ---

/// One video URL as it appeared in the source sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Link(String);

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this link belongs to the platform identified by `domain`.
    pub fn matches_domain(&self, domain: &str) -> bool {
        self.0.contains(domain)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Link {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// --- Raw records ---

/// One fetched video as a flat, ordered set of named text cells.
///
/// Field names are whatever the scraper produced; nothing here assumes a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a JSON object into `parent_child` keyed cells.
    ///
    /// Scalars become their text form, `null` becomes empty, arrays are kept
    /// as compact JSON. A non-object top-level value lands under `value`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut record = Self::new();
        match value {
            serde_json::Value::Object(map) => {
                for (key, v) in map {
                    flatten_into(&mut record, key, v);
                }
            }
            other => flatten_into(&mut record, "value", other),
        }
        record
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == field)
    }

    /// Set a field, replacing an existing value in place or appending.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn source_link(&self) -> Option<&str> {
        self.get(SOURCE_LINK)
    }
}

fn flatten_into(record: &mut RawRecord, prefix: &str, value: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) if !map.is_empty() => {
            for (key, v) in map {
                flatten_into(record, &format!("{prefix}_{key}"), v);
            }
        }
        other => record.insert(prefix, cell_text(other)),
    }
}

/// Text form of a JSON cell: strings unquoted, `null` empty, everything else as JSON.
pub fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// --- Outcomes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Success,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Success => f.write_str("Success"),
            OutcomeStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// Audit entry for one attempted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub index: usize,
    pub link: Link,
    pub status: OutcomeStatus,
    pub error: Option<String>,
}

impl OutcomeRecord {
    pub fn success(index: usize, link: Link) -> Self {
        Self {
            index,
            link,
            status: OutcomeStatus::Success,
            error: None,
        }
    }

    pub fn failed(index: usize, link: Link, error: impl Into<String>) -> Self {
        Self {
            index,
            link,
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

// --- Normalized report rows ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub sequence: usize,
    pub link: String,
    pub views: String,
    pub author: String,
    pub followers: String,
}

// --- Tables ---

/// A header row plus string rows: the unit every sink persists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// No data rows. A header-only table counts as empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Column set is the union of all record fields, in first-seen order.
    /// Records lacking a column get an empty cell.
    pub fn from_raw(records: &[RawRecord]) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for record in records {
            for (field, _) in record.fields() {
                if !headers.iter().any(|h| h == field) {
                    headers.push(field.to_string());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h).unwrap_or_default().to_string())
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    /// Inverse of [`Table::from_raw`]: every cell becomes a field, empty or not.
    pub fn to_raw(&self) -> Vec<RawRecord> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = RawRecord::new();
                for (header, cell) in self.headers.iter().zip(row) {
                    record.insert(header.clone(), cell.clone());
                }
                record
            })
            .collect()
    }

    pub fn from_outcomes(outcomes: &[OutcomeRecord]) -> Self {
        let rows = outcomes
            .iter()
            .map(|o| {
                vec![
                    o.index.to_string(),
                    o.link.to_string(),
                    o.status.to_string(),
                    o.error.clone().unwrap_or_default(),
                ]
            })
            .collect();
        Self::new(OUTCOME_HEADERS.iter().map(|h| h.to_string()).collect(), rows)
    }

    pub fn from_normalized(records: &[NormalizedRecord]) -> Self {
        let rows = records
            .iter()
            .map(|r| {
                vec![
                    r.sequence.to_string(),
                    r.link.clone(),
                    r.views.clone(),
                    r.author.clone(),
                    r.followers.clone(),
                ]
            })
            .collect();
        Self::new(
            NORMALIZED_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
        )
    }

    /// Header row followed by data rows, as spreadsheet uploads expect.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.headers.clone());
        values.extend(self.rows.iter().cloned());
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_flatten_with_underscores() {
        let record = RawRecord::from_json(&json!({
            "id": "7350",
            "stats": { "playCount": 1200, "diggCount": 30 },
            "authorStats": { "followerCount": 5000 },
            "author": { "uniqueId": "abby.official", "verified": false },
            "hashtags": [{"name": "fyp"}],
            "music": null
        }));

        assert_eq!(record.get("stats_playCount"), Some("1200"));
        assert_eq!(record.get("authorStats_followerCount"), Some("5000"));
        assert_eq!(record.get("author_uniqueId"), Some("abby.official"));
        assert_eq!(record.get("author_verified"), Some("false"));
        assert_eq!(record.get("hashtags"), Some(r#"[{"name":"fyp"}]"#));
        assert_eq!(record.get("music"), Some(""));
        assert!(!record.contains("stats"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut record = RawRecord::new().with("a", "1").with("b", "2");
        record.insert("a", "3");
        let fields: Vec<_> = record.fields().collect();
        assert_eq!(fields, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn raw_table_unions_columns_in_first_seen_order() {
        let records = vec![
            RawRecord::new().with("video_playcount", "10").with(SOURCE_LINK, "l1"),
            RawRecord::new().with("stats_playCount", "20").with(SOURCE_LINK, "l2"),
        ];
        let table = Table::from_raw(&records);
        assert_eq!(table.headers, vec!["video_playcount", SOURCE_LINK, "stats_playCount"]);
        assert_eq!(table.rows[0], vec!["10", "l1", ""]);
        assert_eq!(table.rows[1], vec!["", "l2", "20"]);
    }

    #[test]
    fn outcome_table_leaves_success_error_blank() {
        let outcomes = vec![
            OutcomeRecord::success(1, Link::from("https://www.tiktok.com/@a/video/1")),
            OutcomeRecord::failed(2, Link::from("https://www.tiktok.com/@b/video/2"), "Empty data returned"),
        ];
        let table = Table::from_outcomes(&outcomes);
        assert_eq!(table.headers, OUTCOME_HEADERS);
        assert_eq!(table.rows[0][2], "Success");
        assert_eq!(table.rows[0][3], "");
        assert_eq!(table.rows[1][2], "Failed");
        assert_eq!(table.rows[1][3], "Empty data returned");
    }

    #[test]
    fn header_only_table_is_empty() {
        let table = Table::from_outcomes(&[]);
        assert!(table.is_empty());
        assert_eq!(table.to_values().len(), 1);
    }

    #[test]
    fn link_domain_match_is_substring() {
        assert!(Link::from("https://vt.tiktok.com/ZS123/").matches_domain("tiktok.com"));
        assert!(!Link::from("https://instagram.com/p/1").matches_domain("tiktok.com"));
    }
}
