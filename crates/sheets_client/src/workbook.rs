//! The spreadsheet surface the publisher writes through.

use crate::a1::GridRange;
use crate::client::SheetsError;

/// Tab metadata from the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub sheet_id: i64,
    pub title: String,
    pub row_count: usize,
    pub column_count: usize,
}

/// Values written with their top-left cell at `start` (A1, without the tab).
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub start: String,
    pub values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    pub fn new(start: impl Into<String>, values: Vec<Vec<serde_json::Value>>) -> Self {
        Self { start: start.into(), values }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Bold,
    AlignRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFormat {
    pub range: GridRange,
    pub style: CellStyle,
}

/// Operations on one spreadsheet.
///
/// Implemented by [`crate::SheetsClient`] against the live API; tests
/// substitute an in-memory grid.
pub trait Workbook {
    fn tabs(&mut self) -> Result<Vec<TabInfo>, SheetsError>;

    fn add_tab(&mut self, title: &str, rows: usize, cols: usize) -> Result<TabInfo, SheetsError>;

    /// Set the grid size of an existing tab.
    fn resize_tab(&mut self, tab: &TabInfo, rows: usize, cols: usize) -> Result<(), SheetsError>;

    /// Clear every value on the tab. Formatting is left alone.
    fn clear_tab(&mut self, tab: &TabInfo) -> Result<(), SheetsError>;

    fn write_values(&mut self, tab: &TabInfo, ranges: &[ValueRange]) -> Result<(), SheetsError>;

    fn format_ranges(&mut self, tab: &TabInfo, formats: &[RangeFormat]) -> Result<(), SheetsError>;
}
