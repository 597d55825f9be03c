//! A1-notation helpers.

/// 1-based column number to its letter form: 1 → `A`, 11 → `K`, 27 → `AA`.
pub fn column_letter(column: u32) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quote a worksheet title for use in a range. Embedded quotes are doubled.
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Whole-column range on a worksheet, e.g. `'W13'!K:K`.
pub fn column_range(worksheet: &str, column: u32) -> String {
    let letter = column_letter(column);
    format!("{}!{letter}:{letter}", quote_sheet(worksheet))
}

/// Escape a literal for a Drive `q` search expression.
pub fn drive_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter_columns() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(11), "K");
        assert_eq!(column_letter(26), "Z");
    }

    #[test]
    fn multi_letter_columns() {
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn worksheet_with_punctuation_is_quoted() {
        assert_eq!(column_range("W13 (24/3 - 30/3)", 11), "'W13 (24/3 - 30/3)'!K:K");
        assert_eq!(quote_sheet("Abby's plan"), "'Abby''s plan'");
    }

    #[test]
    fn drive_literal_escapes_quotes() {
        assert_eq!(drive_literal("Abby's \\ plan"), "Abby\\'s \\\\ plan");
    }
}
