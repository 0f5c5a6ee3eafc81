//! Google Sheets client: the write side of the weekly report.
//!
//! Blocking reqwest client (no Tokio runtime required). Covers what the
//! publisher needs and nothing more: list tabs, add or grow a tab, clear
//! values, write ranges, format ranges.
//!
//! No retries. No token refresh: one run finishes well inside a token's
//! lifetime.

mod a1;
mod auth;
mod client;
mod workbook;

pub use a1::{col_to_letter, quote_title, GridRange};
pub use auth::{
    fetch_access_token, AccessToken, ServiceAccountKey,
    DEFAULT_TOKEN_URI, SPREADSHEETS_SCOPE,
};
pub use client::{SheetsClient, SheetsError, SHEETS_API_BASE};
pub use workbook::{CellStyle, RangeFormat, TabInfo, ValueRange, Workbook};
