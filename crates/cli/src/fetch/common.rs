//! Shared HTTP plumbing for the activity fetcher.
//!
//! - `FetchClient`: one attempt per request, status → exit-code classification
//! - `resolve_api_key`: flag > env > error
//! - `resolve_value`: flag > env > settings file
//!
//! No retry loop: a failed page is handed back to the
//! caller, which applies the configured page-error policy.

use std::time::Duration;

use crate::exit_codes;
use crate::CliError;

// ── Constants ───────────────────────────────────────────────────────

pub(crate) const USER_AGENT: &str = concat!("weektally/", env!("CARGO_PKG_VERSION"));

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that handles error classification.
///
/// Callers own their token, base URL, and auth method. They pass a
/// request-building closure to [`FetchClient::request`], which sends it once
/// and maps HTTP status codes to the standard exit codes.
pub(crate) struct FetchClient {
    pub(crate) http: reqwest::blocking::Client,
    source_name: String,
    error_extractor: fn(&serde_json::Value, u16) -> String,
}

impl FetchClient {
    pub(crate) fn new(
        source_name: &str,
        error_extractor: fn(&serde_json::Value, u16) -> String,
    ) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            source_name: source_name.to_string(),
            error_extractor,
        }
    }

    /// Send one GET and parse the JSON body.
    ///
    /// `build_request` receives the underlying `reqwest::blocking::Client`
    /// and must return a fully configured `RequestBuilder` (URL, auth,
    /// headers, query params).
    pub(crate) fn request(
        &self,
        build_request: impl FnOnce(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, CliError> {
        let resp = build_request(&self.http).send().map_err(|e| CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message: format!("{} request failed: {}", self.source_name, e),
            hint: None,
        })?;

        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let reason = resp.status().canonical_reason().unwrap_or("").to_string();
            let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
            let msg = (self.error_extractor)(&body, status);
            let msg = if msg.is_empty() { reason } else { msg };

            let (code, what) = match status {
                401 | 403 => (exit_codes::EXIT_FETCH_AUTH, "auth failed"),
                400 => (exit_codes::EXIT_FETCH_VALIDATION, "request rejected"),
                429 => (exit_codes::EXIT_FETCH_RATE_LIMIT, "rate limited"),
                _ => (exit_codes::EXIT_FETCH_UPSTREAM, "error"),
            };
            return Err(CliError {
                code,
                message: format!("{} {} ({}): {}", self.source_name, what, status, msg),
                hint: None,
            });
        }

        // Read as text first to tolerate BOM-prefixed bodies
        let text = resp.text().map_err(|e| CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message: format!("failed to read {} response body: {}", self.source_name, e),
            hint: None,
        })?;
        let trimmed = text.trim_start_matches('\u{feff}');
        serde_json::from_str(trimmed).map_err(|e| CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message: format!(
                "failed to parse {} JSON response: {} (body: {})",
                self.source_name,
                e,
                trimmed.chars().take(200).collect::<String>(),
            ),
            hint: None,
        })
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Resolve an API key: flag value > environment variable > error.
pub(crate) fn resolve_api_key(
    flag: Option<String>,
    source_name: &str,
    env_var: &str,
) -> Result<String, CliError> {
    let missing = || CliError {
        code: exit_codes::EXIT_FETCH_NOT_AUTH,
        message: format!(
            "missing {} access token (use --access-token or set {})",
            source_name, env_var,
        ),
        hint: None,
    };

    if let Some(key) = flag {
        let trimmed = key.trim().to_string();
        if trimmed.is_empty() {
            return Err(missing());
        }
        return Ok(trimmed);
    }

    if let Ok(key) = std::env::var(env_var) {
        let trimmed = key.trim().to_string();
        if !trimmed.is_empty() {
            return Ok(trimmed);
        }
    }

    Err(missing())
}

/// Resolve a plain setting: flag value > environment variable > settings file.
/// Blank values count as absent.
pub(crate) fn resolve_value(
    flag: Option<String>,
    env_var: &str,
    file: Option<&str>,
) -> Option<String> {
    let non_blank = |s: &str| {
        let t = s.trim();
        if t.is_empty() { None } else { Some(t.to_string()) }
    };

    flag.as_deref()
        .and_then(non_blank)
        .or_else(|| std::env::var(env_var).ok().as_deref().and_then(non_blank))
        .or_else(|| file.and_then(non_blank))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn extract(body: &serde_json::Value, _status: u16) -> String {
        body["message"].as_str().unwrap_or("").to_string()
    }

    fn get_json(server: &MockServer) -> Result<serde_json::Value, CliError> {
        let client = FetchClient::new("Test", extract);
        let url = server.url("/thing");
        client.request(|http| http.get(&url))
    }

    #[test]
    fn test_resolve_api_key_flag_priority() {
        let key = resolve_api_key(Some("  token_123  ".into()), "Test", "TEST_KEY").unwrap();
        assert_eq!(key, "token_123");
    }

    #[test]
    fn test_resolve_api_key_empty_flag() {
        let err = resolve_api_key(Some("  ".into()), "Test", "TEST_KEY").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_NOT_AUTH);
        assert!(err.message.contains("missing Test access token"));
    }

    #[test]
    fn test_resolve_api_key_missing() {
        std::env::remove_var("__WEEKTALLY_TEST_KEY_MISSING");
        let err = resolve_api_key(None, "Test", "__WEEKTALLY_TEST_KEY_MISSING").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_NOT_AUTH);
    }

    #[test]
    fn test_resolve_value_precedence() {
        std::env::set_var("__WEEKTALLY_TEST_VALUE", "from-env");
        assert_eq!(
            resolve_value(Some("from-flag".into()), "__WEEKTALLY_TEST_VALUE", Some("from-file")),
            Some("from-flag".into()),
        );
        assert_eq!(
            resolve_value(None, "__WEEKTALLY_TEST_VALUE", Some("from-file")),
            Some("from-env".into()),
        );
        std::env::remove_var("__WEEKTALLY_TEST_VALUE");
        assert_eq!(
            resolve_value(Some("  ".into()), "__WEEKTALLY_TEST_VALUE", Some("from-file")),
            Some("from-file".into()),
        );
        assert_eq!(resolve_value(None, "__WEEKTALLY_TEST_VALUE", None), None);
    }

    #[test]
    fn test_success_with_bom() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/thing");
            then.status(200).body("\u{feff}{\"ok\": true}");
        });
        let body = get_json(&server).unwrap();
        assert_eq!(body["ok"], true);
    }

    #[test]
    fn test_status_classification() {
        let cases = [
            (401, exit_codes::EXIT_FETCH_AUTH),
            (403, exit_codes::EXIT_FETCH_AUTH),
            (400, exit_codes::EXIT_FETCH_VALIDATION),
            (429, exit_codes::EXIT_FETCH_RATE_LIMIT),
            (404, exit_codes::EXIT_FETCH_UPSTREAM),
            (503, exit_codes::EXIT_FETCH_UPSTREAM),
        ];
        for (status, code) in cases {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET).path("/thing");
                then.status(status)
                    .json_body(serde_json::json!({ "message": "nope" }));
            });
            let err = get_json(&server).unwrap_err();
            // Exactly one attempt, never retried
            mock.assert_calls(1);
            assert_eq!(err.code, code, "status {}", status);
            assert!(err.message.contains(&format!("({}): nope", status)), "{}", err.message);
        }
    }

    #[test]
    fn test_error_without_body_uses_reason() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/thing");
            then.status(502);
        });
        let err = get_json(&server).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("Bad Gateway"), "{}", err.message);
    }

    #[test]
    fn test_invalid_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/thing");
            then.status(200).body("<html>maintenance</html>");
        });
        let err = get_json(&server).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("maintenance"));
    }
}
