use serde::Deserialize;

/// A Sheets `ValueRange` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueRange {
    pub range: Option<String>,
    #[serde(rename = "majorDimension")]
    pub major_dimension: Option<String>,
    /// Absent entirely when the range holds no values.
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    /// First column of a `majorDimension=COLUMNS` read, or empty.
    pub fn into_first_column(self) -> Vec<serde_json::Value> {
        self.values.into_iter().next().unwrap_or_default()
    }
}

/// Cell value for a RAW write: plain integers and decimals go up as numbers so
/// the sheet can sort and sum them; everything else stays text.
///
/// Text that would not survive a number round trip (`007`, `1e3`, ` 5`) is kept
/// as text.
pub fn cell_value(text: &str) -> serde_json::Value {
    if let Ok(n) = text.parse::<i64>() {
        if n.to_string() == text {
            return serde_json::Value::from(n);
        }
    }
    let plain_decimal = text.contains('.')
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    if plain_decimal {
        if let Some(n) = text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return serde_json::Value::Number(n);
        }
    }
    serde_json::Value::String(text.to_string())
}

/// Rows of text cells as typed JSON values.
pub fn row_values(rows: &[Vec<String>]) -> Vec<Vec<serde_json::Value>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell_value(cell)).collect())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Spreadsheet {
    #[serde(rename = "spreadsheetId")]
    pub spreadsheet_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_has_no_column() {
        let vr: ValueRange =
            serde_json::from_str(r#"{"range": "'W13'!K1:K1000", "majorDimension": "COLUMNS"}"#)
                .unwrap();
        assert!(vr.into_first_column().is_empty());
    }

    #[test]
    fn counts_upload_as_numbers() {
        let rows = vec![
            vec!["STT".to_string(), "Lượt xem".to_string(), "Người Đăng".to_string()],
            vec!["1".to_string(), "1200".to_string(), "Nguyễn Văn A".to_string()],
        ];
        let values = row_values(&rows);
        assert_eq!(values[0][1], serde_json::json!("Lượt xem"));
        assert_eq!(values[1][0], serde_json::json!(1));
        assert_eq!(values[1][1], serde_json::json!(1200));
        assert_eq!(values[1][2], serde_json::json!("Nguyễn Văn A"));
    }

    #[test]
    fn number_like_text_stays_text() {
        assert_eq!(cell_value("12.5"), serde_json::json!(12.5));
        assert_eq!(cell_value("-3"), serde_json::json!(-3));
        for text in ["007", "1e3", " 5", "", "1.2.3", "https://www.tiktok.com/@a/video/1"] {
            assert_eq!(cell_value(text), serde_json::json!(text), "{text:?}");
        }
    }

    #[test]
    fn drive_listing_parses_with_and_without_files() {
        let list: DriveFileList = serde_json::from_str(
            r#"{"files": [{"id": "1AbC", "name": "Ecom - Booking KOC"}]}"#,
        )
        .unwrap();
        assert_eq!(list.files[0].id, "1AbC");
        assert_eq!(list.files[0].name.as_deref(), Some("Ecom - Booking KOC"));

        let empty: DriveFileList = serde_json::from_str("{}").unwrap();
        assert!(empty.files.is_empty());
    }

    #[test]
    fn mixed_cell_types_survive() {
        let vr: ValueRange = serde_json::from_str(
            r#"{"majorDimension": "COLUMNS", "values": [["Link", 42, "https://www.tiktok.com/@a/video/1"]]}"#,
        )
        .unwrap();
        let col = vr.into_first_column();
        assert_eq!(col.len(), 3);
        assert_eq!(col[1], serde_json::json!(42));
    }
}
