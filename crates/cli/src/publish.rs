//! Write a [`Report`] into the week's spreadsheet tab.
//!
//! The tab is overwritten in full on every run: clear values, then write
//! title, period label, header and rows, then apply formatting. Steps are not
//! transactional; a failure part-way leaves whatever was already written.

use serde_json::Value;
use tracing::{debug, info};
use weektally_config::LabelLocale;
use weektally_sheets::{CellStyle, GridRange, RangeFormat, SheetsError, TabInfo, ValueRange, Workbook};

use crate::exit_codes;
use crate::report::Report;
use crate::week::WeekPeriod;
use crate::CliError;

/// New tabs get at least this many rows and columns.
const MIN_GRID: usize = 10;
/// Title row + header row.
const HEADER_ROWS: usize = 2;
const LABEL_COL: usize = 2; // C1
const NOTE_COL: usize = 4; // E1

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    pub tab_title: String,
    pub created: bool,
    pub rows: usize,
}

pub fn publish<W: Workbook>(
    workbook: &mut W,
    period: &WeekPeriod,
    report: &Report,
    locale: LabelLocale,
) -> Result<PublishSummary, CliError> {
    let title = period.tab_title();
    let rows_needed = HEADER_ROWS + report.rows.len();
    let last_col = if report.incomplete.is_some() { NOTE_COL } else { LABEL_COL };
    let cols_needed = report.width().max(last_col + 1);

    let existing = workbook
        .tabs()
        .map_err(|e| sheets_error("list tabs", e))?
        .into_iter()
        .find(|t| t.title == title);

    let (tab, created) = match existing {
        Some(tab) if tab.row_count >= rows_needed && tab.column_count >= cols_needed => {
            debug!("reusing tab '{}'", title);
            (tab, false)
        }
        Some(tab) => {
            let rows = tab.row_count.max(rows_needed);
            let cols = tab.column_count.max(cols_needed);
            debug!("growing tab '{}' to {}x{}", title, rows, cols);
            workbook
                .resize_tab(&tab, rows, cols)
                .map_err(|e| sheets_error("resize tab", e))?;
            (TabInfo { row_count: rows, column_count: cols, ..tab }, false)
        }
        None => {
            info!("creating tab '{}'", title);
            let tab = workbook
                .add_tab(&title, rows_needed.max(MIN_GRID), cols_needed.max(MIN_GRID))
                .map_err(|e| sheets_error("create tab", e))?;
            (tab, true)
        }
    };

    workbook
        .clear_tab(&tab)
        .map_err(|e| sheets_error("clear tab", e))?;

    let mut ranges = vec![
        ValueRange::new("A1", vec![vec![Value::from(title.as_str())]]),
        ValueRange::new(
            GridRange::cell(0, LABEL_COL).to_a1(),
            vec![vec![Value::from(period.label(locale))]],
        ),
    ];
    if let Some(reason) = &report.incomplete {
        ranges.push(ValueRange::new(
            GridRange::cell(0, NOTE_COL).to_a1(),
            vec![vec![Value::from(format!("INCOMPLETE: {}", reason))]],
        ));
    }
    ranges.push(ValueRange::new(
        "A2",
        vec![report.headers.iter().map(|h| Value::from(h.as_str())).collect()],
    ));
    if !report.rows.is_empty() {
        ranges.push(ValueRange::new(
            "A3",
            report.rows.iter().map(|row| row.to_cells()).collect(),
        ));
    }

    workbook
        .write_values(&tab, &ranges)
        .map_err(|e| sheets_error("write values", e))?;

    let width = report.width();
    let formats = [
        RangeFormat { range: GridRange::row(0, 0, width), style: CellStyle::Bold },
        RangeFormat { range: GridRange::row(1, 0, width), style: CellStyle::Bold },
        RangeFormat { range: GridRange::row(1, 1, width), style: CellStyle::AlignRight },
    ];
    workbook
        .format_ranges(&tab, &formats)
        .map_err(|e| sheets_error("format ranges", e))?;

    Ok(PublishSummary {
        tab_title: title,
        created,
        rows: report.rows.len(),
    })
}

/// Map a Sheets failure to the publish exit codes.
pub fn sheets_error(step: &str, err: SheetsError) -> CliError {
    match err {
        SheetsError::Credentials(_) | SheetsError::Auth(_) => CliError {
            code: exit_codes::EXIT_SHEETS_AUTH,
            message: format!("Sheets {}: {}", step, err),
            hint: Some(
                "check the service-account key (--credentials) and that the sheet is shared with it"
                    .into(),
            ),
        },
        SheetsError::Http(403, _) | SheetsError::Http(404, _) => CliError {
            code: exit_codes::EXIT_PUBLISH_FAILED,
            message: format!("Sheets {} failed: {}", step, err),
            hint: Some("check --sheet-id and that the service account has edit access".into()),
        },
        _ => CliError {
            code: exit_codes::EXIT_PUBLISH_FAILED,
            message: format!("Sheets {} failed: {}", step, err),
            hint: Some("earlier writes are not rolled back; re-run to overwrite the tab".into()),
        },
    }
}
