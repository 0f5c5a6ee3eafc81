//! A1 notation helpers.

/// Convert column index to letter (0 -> A, 1 -> B, 26 -> AA, etc.)
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Quote a tab title for use inside an A1 range (`2024 W1` -> `'2024 W1'`).
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Rectangle on one tab. Zero-based, end-exclusive (the Sheets `GridRange` model).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl GridRange {
    /// Columns `start_col..end_col` of a single row.
    pub fn row(row: usize, start_col: usize, end_col: usize) -> Self {
        Self { start_row: row, end_row: row + 1, start_col, end_col }
    }

    pub fn cell(row: usize, col: usize) -> Self {
        Self::row(row, col, col + 1)
    }

    /// A1 form, e.g. `A1:K1`, or `C1` for a single cell.
    pub fn to_a1(&self) -> String {
        let top_left = format!("{}{}", col_to_letter(self.start_col), self.start_row + 1);
        if self.end_row == self.start_row + 1 && self.end_col == self.start_col + 1 {
            return top_left;
        }
        format!(
            "{}:{}{}",
            top_left,
            col_to_letter(self.end_col.saturating_sub(1)),
            self.end_row,
        )
    }

    /// Wire form for `batchUpdate` requests.
    pub fn to_json(&self, sheet_id: i64) -> serde_json::Value {
        serde_json::json!({
            "sheetId": sheet_id,
            "startRowIndex": self.start_row,
            "endRowIndex": self.end_row,
            "startColumnIndex": self.start_col,
            "endColumnIndex": self.end_col,
        })
    }
}
