//! Exit codes of the `weektally` binary.
//!
//! Scheduled runs branch on these codes.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                   |
//! |---------|-----------|-----------------------------------------------|
//! | 0       | Universal | Success                                       |
//! | 1       | Universal | General error (unspecified)                   |
//! | 2       | Universal | CLI usage error (bad args, week out of range) |
//! | 3       | Universal | Settings invalid or required value missing    |
//! | 50-59   | fetch     | Activity API                                  |
//! | 60-69   | publish   | Spreadsheet service                           |

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - report published (or printed, with --dry-run) from a complete fetch.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Settings file could not be read or parsed, its taxonomy is inconsistent,
/// or the API URL / sheet id is not configured anywhere.
pub const EXIT_CONFIG: u8 = 3;

// =============================================================================
// Fetch (50-59): activity API
// =============================================================================

/// No access token provided (neither flag nor env var).
pub const EXIT_FETCH_NOT_AUTH: u8 = 50;

/// Auth rejected by upstream (401/403).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Bad request rejected by upstream (400).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Rate limited (429). Not retried.
pub const EXIT_FETCH_RATE_LIMIT: u8 = 53;

/// Upstream error (5xx), malformed response, or network failure.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;

/// The selected week has no activity. Nothing was published.
pub const EXIT_FETCH_NO_DATA: u8 = 56;

/// A page failed under the `partial` policy. The report was still published,
/// marked incomplete.
pub const EXIT_FETCH_PARTIAL: u8 = 57;

// =============================================================================
// Publish (60-69): spreadsheet service
// =============================================================================

/// A write to the spreadsheet failed. Earlier writes may have landed.
pub const EXIT_PUBLISH_FAILED: u8 = 60;

/// Service-account key missing/invalid, or the token exchange was refused.
pub const EXIT_SHEETS_AUTH: u8 = 61;
