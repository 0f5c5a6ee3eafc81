//! Sheets v4 HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). One bearer token per
//! client, obtained from a service account at construction.

use std::time::Duration;

use crate::a1::quote_title;
use crate::auth::{fetch_access_token, ServiceAccountKey, SPREADSHEETS_SCOPE};
use crate::workbook::{CellStyle, RangeFormat, TabInfo, ValueRange, Workbook};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Sheets API client bound to one spreadsheet (blocking).
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::blocking::Client,
    api_base: String,
    spreadsheet_id: String,
    token: String,
}

/// Error type for spreadsheet operations.
#[derive(Debug)]
pub enum SheetsError {
    /// Service-account key missing, unreadable or malformed
    Credentials(String),
    /// Token endpoint refused the assertion
    Auth(String),
    /// Network error
    Network(String),
    /// HTTP error with status code and the API's message
    Http(u16, String),
    /// Unexpected response shape
    Parse(String),
}

impl std::fmt::Display for SheetsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsError::Credentials(msg) => write!(f, "Credentials error: {}", msg),
            SheetsError::Auth(msg) => write!(f, "Authorization failed: {}", msg),
            SheetsError::Network(msg) => write!(f, "Network error: {}", msg),
            SheetsError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            SheetsError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for SheetsError {}

fn build_http() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .user_agent(format!("weektally/{}", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60))
        .build()
        .expect("Failed to create HTTP client")
}

impl SheetsClient {
    /// Authorize `key` for spreadsheet access and bind to `spreadsheet_id`.
    pub fn connect(key: &ServiceAccountKey, spreadsheet_id: &str) -> Result<Self, SheetsError> {
        let http = build_http();
        let token = fetch_access_token(&http, key, SPREADSHEETS_SCOPE)?;
        Ok(Self {
            http,
            api_base: SHEETS_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token: token.token,
        })
    }

    /// Create a client with an already-issued token.
    pub fn with_token(api_base: String, spreadsheet_id: String, token: String) -> Self {
        Self {
            http: build_http(),
            api_base,
            spreadsheet_id,
            token,
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/v4/spreadsheets/{}{}", self.api_base, self.spreadsheet_id, suffix)
    }

    fn batch_update(&self, requests: Vec<serde_json::Value>) -> Result<serde_json::Value, SheetsError> {
        let url = self.url(":batchUpdate");
        let resp = self.post_json(&url, &serde_json::json!({ "requests": requests }))?;
        resp.json().map_err(|e| SheetsError::Parse(e.to_string()))
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::blocking::Response, SheetsError> {
        let response = self.http.get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        check_status(response)
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<reqwest::blocking::Response, SheetsError> {
        let response = self.http.post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        check_status(response)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, SheetsError> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(SheetsError::Http(status, extract_error_message(&body)))
}

/// Sheets errors arrive as `{"error": {"code", "message", "status"}}`.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

fn parse_tab(props: &serde_json::Value) -> Option<TabInfo> {
    Some(TabInfo {
        sheet_id: props["sheetId"].as_i64().unwrap_or(0),
        title: props["title"].as_str()?.to_string(),
        row_count: props["gridProperties"]["rowCount"].as_u64().unwrap_or(0) as usize,
        column_count: props["gridProperties"]["columnCount"].as_u64().unwrap_or(0) as usize,
    })
}

fn format_request(sheet_id: i64, format: &RangeFormat) -> serde_json::Value {
    let (cell, fields) = match format.style {
        CellStyle::Bold => (
            serde_json::json!({ "userEnteredFormat": { "textFormat": { "bold": true } } }),
            "userEnteredFormat.textFormat.bold",
        ),
        CellStyle::AlignRight => (
            serde_json::json!({ "userEnteredFormat": { "horizontalAlignment": "RIGHT" } }),
            "userEnteredFormat.horizontalAlignment",
        ),
    };
    serde_json::json!({
        "repeatCell": {
            "range": format.range.to_json(sheet_id),
            "cell": cell,
            "fields": fields,
        }
    })
}

impl Workbook for SheetsClient {
    fn tabs(&mut self) -> Result<Vec<TabInfo>, SheetsError> {
        let resp = self.get(&self.url(""), &[("fields", "sheets.properties")])?;
        let json: serde_json::Value = resp.json().map_err(|e| SheetsError::Parse(e.to_string()))?;

        let tabs: Vec<TabInfo> = json["sheets"]
            .as_array()
            .map(|sheets| sheets.iter().filter_map(|s| parse_tab(&s["properties"])).collect())
            .unwrap_or_default();

        Ok(tabs)
    }

    fn add_tab(&mut self, title: &str, rows: usize, cols: usize) -> Result<TabInfo, SheetsError> {
        let reply = self.batch_update(vec![serde_json::json!({
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": cols }
                }
            }
        })])?;

        parse_tab(&reply["replies"][0]["addSheet"]["properties"])
            .ok_or_else(|| SheetsError::Parse("addSheet reply missing properties".into()))
    }

    fn resize_tab(&mut self, tab: &TabInfo, rows: usize, cols: usize) -> Result<(), SheetsError> {
        self.batch_update(vec![serde_json::json!({
            "updateSheetProperties": {
                "properties": {
                    "sheetId": tab.sheet_id,
                    "gridProperties": { "rowCount": rows, "columnCount": cols }
                },
                "fields": "gridProperties.rowCount,gridProperties.columnCount"
            }
        })])?;
        Ok(())
    }

    fn clear_tab(&mut self, tab: &TabInfo) -> Result<(), SheetsError> {
        let url = self.url("/values:batchClear");
        self.post_json(&url, &serde_json::json!({ "ranges": [quote_title(&tab.title)] }))?;
        Ok(())
    }

    fn write_values(&mut self, tab: &TabInfo, ranges: &[ValueRange]) -> Result<(), SheetsError> {
        let data: Vec<serde_json::Value> = ranges
            .iter()
            .map(|r| serde_json::json!({
                "range": format!("{}!{}", quote_title(&tab.title), r.start),
                "majorDimension": "ROWS",
                "values": r.values,
            }))
            .collect();

        let url = self.url("/values:batchUpdate");
        self.post_json(&url, &serde_json::json!({
            "valueInputOption": "RAW",
            "data": data,
        }))?;
        Ok(())
    }

    fn format_ranges(&mut self, tab: &TabInfo, formats: &[RangeFormat]) -> Result<(), SheetsError> {
        if formats.is_empty() {
            return Ok(());
        }
        let requests = formats.iter().map(|f| format_request(tab.sheet_id, f)).collect();
        self.batch_update(requests)?;
        Ok(())
    }
}
