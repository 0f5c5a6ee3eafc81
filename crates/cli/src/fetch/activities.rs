//! Activity listing: cursor-paginated `GET {base}/activities`.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info, warn};
use weektally_config::PageErrorPolicy;

use crate::exit_codes;
use crate::CliError;

use super::common::FetchClient;

// ── Constants ───────────────────────────────────────────────────────

const PAGE_LIMIT: u32 = 500;

// ── Records ─────────────────────────────────────────────────────────

/// One activity, reduced to what the tally needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub actor: String,
    /// `None` when the API sent a timestamp in an unrecognised shape
    pub occurred_at: Option<DateTime<Utc>>,
    pub category: String,
}

/// A page that could not be fetched under [`PageErrorPolicy::Partial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page: u32,
    /// Exit code the failure classified to
    pub code: u8,
    pub message: String,
}

#[derive(Debug)]
pub struct FetchOutcome {
    /// Sorted by (actor, category)
    pub records: Vec<ActivityRecord>,
    /// Requests issued, failed one included
    pub pages: u32,
    /// Set when pagination stopped early
    pub failure: Option<PageFailure>,
}

impl FetchOutcome {
    /// The page error, when pagination failed before a single activity came
    /// back. Such a week was never read, so it must not pass for an empty one.
    pub fn unread_week_error(&self) -> Option<CliError> {
        if !self.records.is_empty() {
            return None;
        }
        self.failure.as_ref().map(|f| CliError {
            code: f.code,
            message: f.message.clone(),
            hint: Some(format!("page {} failed before any activities were fetched", f.page)),
        })
    }
}

// ── Client ──────────────────────────────────────────────────────────

pub struct ActivityClient {
    client: FetchClient,
    token: String,
    base_url: String,
}

impl ActivityClient {
    pub fn new(token: String, base_url: String) -> Self {
        Self {
            client: FetchClient::new("Activity API", extract_api_error),
            token,
            base_url,
        }
    }

    fn activities_url(&self) -> String {
        format!("{}/activities", self.base_url.trim_end_matches('/'))
    }

    /// Fetch every activity created in `[created_after, created_before]`
    /// (unix seconds), following `next` cursors until one comes back null.
    pub fn fetch_all(
        &self,
        created_after: i64,
        created_before: i64,
        policy: PageErrorPolicy,
    ) -> Result<FetchOutcome, CliError> {
        let url = self.activities_url();
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 0u32;
        let mut failure = None;
        let mut sent_cursors: HashSet<String> = HashSet::new();

        loop {
            page += 1;
            let mut params = vec![
                ("limit", PAGE_LIMIT.to_string()),
                ("created_after", created_after.to_string()),
                ("created_before", created_before.to_string()),
            ];
            if let Some(ref next) = cursor {
                params.push(("next", next.clone()));
            }

            let result = self
                .client
                .request(|http| http.get(&url).bearer_auth(&self.token).query(&params))
                .and_then(|body| parse_page(&body));

            let (items, next) = match result {
                Ok(parsed) => parsed,
                Err(err) => {
                    failure = Some(page_failed(policy, page, err)?);
                    break;
                }
            };

            records.extend(items);
            info!("Found {} total activities (page {})", records.len(), page);

            let Some(next) = next else {
                break;
            };

            // Infinite loop protection: any cursor already sent means a cycle
            if sent_cursors.contains(&next) {
                let err = CliError {
                    code: exit_codes::EXIT_FETCH_UPSTREAM,
                    message: format!("Activity API pagination stuck: next={} repeated", next),
                    hint: None,
                };
                failure = Some(page_failed(policy, page + 1, err)?);
                break;
            }

            debug!("following cursor {}", next);
            sent_cursors.insert(next.clone());
            cursor = Some(next);
        }

        let outside = records
            .iter()
            .filter_map(|r| r.occurred_at)
            .filter(|at| {
                let ts = at.timestamp();
                ts < created_after || ts > created_before
            })
            .count();
        if outside > 0 {
            warn!("{} activities fall outside the requested window", outside);
        }

        // Stable: equal (actor, category) pairs keep API order
        records.sort_by(|a, b| {
            a.actor
                .cmp(&b.actor)
                .then_with(|| a.category.cmp(&b.category))
        });

        Ok(FetchOutcome { records, pages: page, failure })
    }
}

/// Apply the page-error policy: abort, or record the failure and stop.
fn page_failed(
    policy: PageErrorPolicy,
    page: u32,
    err: CliError,
) -> Result<PageFailure, CliError> {
    match policy {
        PageErrorPolicy::Fail => Err(err),
        PageErrorPolicy::Partial => {
            warn!(
                "page {} failed, keeping activities fetched so far: {}",
                page, err.message,
            );
            Ok(PageFailure { page, code: err.code, message: err.message })
        }
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Split a page into records and the next cursor. An empty cursor counts
/// as exhausted.
fn parse_page(
    body: &serde_json::Value,
) -> Result<(Vec<ActivityRecord>, Option<String>), CliError> {
    let data = body["data"].as_array().ok_or_else(|| CliError {
        code: exit_codes::EXIT_FETCH_UPSTREAM,
        message: "Activity API response missing 'data' array".into(),
        hint: None,
    })?;

    let records = data
        .iter()
        .map(parse_activity)
        .collect::<Result<Vec<_>, _>>()?;

    let next = body["next"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok((records, next))
}

fn parse_activity(item: &serde_json::Value) -> Result<ActivityRecord, CliError> {
    let id = item["id"].as_str().unwrap_or("?");
    let malformed = |what: &str| CliError {
        code: exit_codes::EXIT_FETCH_UPSTREAM,
        message: format!("activity {} missing {}", id, what),
        hint: None,
    };

    let actor = item["ownerMember"]["email"]
        .as_str()
        .ok_or_else(|| malformed("'ownerMember.email'"))?;
    let category = item["activityCategory"]["name"]
        .as_str()
        .ok_or_else(|| malformed("'activityCategory.name'"))?;
    let occurred_at = parse_instant(&item["createdAt"]);
    if occurred_at.is_none() {
        debug!("activity {} has unreadable createdAt {}", id, item["createdAt"]);
    }

    Ok(ActivityRecord {
        actor: actor.to_string(),
        occurred_at,
        category: category.to_string(),
    })
}

/// `createdAt` arrives as unix seconds or an RFC 3339 string.
fn parse_instant(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    if let Some(secs) = value.as_i64() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn extract_api_error(body: &serde_json::Value, _status: u16) -> String {
    body["message"]
        .as_str()
        .or_else(|| body["error"]["message"].as_str())
        .or_else(|| body["error"].as_str())
        .unwrap_or("")
        .to_string()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    // ── Unit tests ──────────────────────────────────────────────────

    #[test]
    fn test_parse_instant() {
        let epoch = parse_instant(&serde_json::json!(1_704_067_200)).unwrap();
        assert_eq!(epoch.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let text = parse_instant(&serde_json::json!("2024-01-01T07:00:00+07:00")).unwrap();
        assert_eq!(text, epoch);

        assert!(parse_instant(&serde_json::json!("yesterday")).is_none());
        assert!(parse_instant(&serde_json::Value::Null).is_none());
    }

    #[test]
    fn test_parse_activity_projection() {
        let rec = parse_activity(&mock_activity("a@x.io", "Apply")).unwrap();
        assert_eq!(rec.actor, "a@x.io");
        assert_eq!(rec.category, "Apply");
        assert_eq!(rec.occurred_at.unwrap().timestamp(), 1_704_100_000);
    }

    #[test]
    fn test_unreadable_created_at_keeps_record() {
        for created_at in [serde_json::json!(1_704_100_000.5), serde_json::Value::Null] {
            let mut item = mock_activity("a@x.io", "Apply");
            item["createdAt"] = created_at;
            let rec = parse_activity(&item).unwrap();
            assert_eq!(rec.actor, "a@x.io");
            assert_eq!(rec.category, "Apply");
            assert!(rec.occurred_at.is_none());
        }
    }

    #[test]
    fn test_parse_activity_missing_fields() {
        let err = parse_activity(&serde_json::json!({
            "id": "act_1",
            "createdAt": 1_704_100_000,
            "activityCategory": { "name": "Apply" }
        }))
        .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("act_1 missing 'ownerMember.email'"), "{}", err.message);
    }

    #[test]
    fn test_parse_page_cursor() {
        let (recs, next) = parse_page(&page_body(vec![], Some("c1"))).unwrap();
        assert!(recs.is_empty());
        assert_eq!(next.as_deref(), Some("c1"));

        let (_, next) = parse_page(&page_body(vec![], None)).unwrap();
        assert!(next.is_none());

        let (_, next) = parse_page(&page_body(vec![], Some(""))).unwrap();
        assert!(next.is_none());

        assert!(parse_page(&serde_json::json!({ "next": null })).is_err());
    }

    #[test]
    fn test_extract_api_error() {
        assert_eq!(extract_api_error(&serde_json::json!({ "message": "bad token" }), 401), "bad token");
        assert_eq!(
            extract_api_error(&serde_json::json!({ "error": { "message": "nested" } }), 500),
            "nested",
        );
        assert_eq!(extract_api_error(&serde_json::json!({ "error": "flat" }), 500), "flat");
        assert_eq!(extract_api_error(&serde_json::Value::Null, 500), "");
    }

    // ── httpmock tests ──────────────────────────────────────────────

    /// Helper: build an activity JSON the way the API returns it.
    fn mock_activity(email: &str, category: &str) -> serde_json::Value {
        serde_json::json!({
            "id": format!("act_{}_{}", email, category),
            "ownerMember": { "id": "mem_1", "email": email, "firstName": "Test" },
            "createdAt": 1_704_100_000,
            "activityCategory": { "id": "cat_1", "name": category },
            "job": null
        })
    }

    fn page_body(data: Vec<serde_json::Value>, next: Option<&str>) -> serde_json::Value {
        serde_json::json!({ "data": data, "next": next })
    }

    fn client(server: &MockServer) -> ActivityClient {
        ActivityClient::new("test_token".into(), server.url("/org/"))
    }

    #[test]
    fn test_three_pages_follow_cursors() {
        let server = MockServer::start();

        let page1 = server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .header("authorization", "Bearer test_token")
                .query_param("limit", "500")
                .query_param("created_after", "100")
                .query_param("created_before", "200")
                .query_param_missing("next");
            then.status(200).json_body(page_body(
                vec![mock_activity("b@x.io", "Rejected"), mock_activity("a@x.io", "Apply")],
                Some("c1"),
            ));
        });
        let page2 = server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param("created_after", "100")
                .query_param("created_before", "200")
                .query_param("next", "c1");
            then.status(200).json_body(page_body(
                vec![mock_activity("a@x.io", "Apply")],
                Some("c2"),
            ));
        });
        let page3 = server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param("next", "c2");
            then.status(200).json_body(page_body(
                vec![mock_activity("a@x.io", "Accept Offer")],
                None,
            ));
        });

        let outcome = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Partial)
            .unwrap();

        page1.assert_calls(1);
        page2.assert_calls(1);
        page3.assert_calls(1);
        assert_eq!(outcome.pages, 3);
        assert!(outcome.failure.is_none());

        let keys: Vec<(&str, &str)> = outcome
            .records
            .iter()
            .map(|r| (r.actor.as_str(), r.category.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a@x.io", "Accept Offer"),
                ("a@x.io", "Apply"),
                ("a@x.io", "Apply"),
                ("b@x.io", "Rejected"),
            ],
        );
    }

    #[test]
    fn test_single_page_null_cursor() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/org/activities");
            then.status(200)
                .json_body(page_body(vec![mock_activity("a@x.io", "Apply")], None));
        });

        let outcome = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Fail)
            .unwrap();

        mock.assert_calls(1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.pages, 1);
    }

    #[test]
    fn test_failed_page_partial_keeps_earlier_pages() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param_missing("next");
            then.status(200).json_body(page_body(
                vec![mock_activity("a@x.io", "Apply"), mock_activity("b@x.io", "Apply")],
                Some("c1"),
            ));
        });
        let failing = server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param("next", "c1");
            then.status(500)
                .json_body(serde_json::json!({ "message": "internal error" }));
        });

        let outcome = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Partial)
            .unwrap();

        // Failed page is not retried
        failing.assert_calls(1);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.pages, 2);
        // Earlier pages came back, so this is a partial week, not an unread one
        assert!(outcome.unread_week_error().is_none());
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.page, 2);
        assert!(failure.message.contains("internal error"), "{}", failure.message);
    }

    #[test]
    fn test_failed_page_fail_policy_aborts() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param_missing("next");
            then.status(200).json_body(page_body(
                vec![mock_activity("a@x.io", "Apply")],
                Some("c1"),
            ));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param("next", "c1");
            then.status(503);
        });

        let err = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Fail)
            .unwrap_err();

        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("(503)"), "{}", err.message);
    }

    #[test]
    fn test_auth_failure_first_page() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/org/activities");
            then.status(401)
                .json_body(serde_json::json!({ "message": "Invalid token" }));
        });

        let err = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Fail)
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.contains("Activity API auth failed (401)"), "{}", err.message);
        assert!(err.message.contains("Invalid token"), "{}", err.message);

        // Partial policy: first page lost, nothing accumulated
        let outcome = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Partial)
            .unwrap();
        assert!(outcome.records.is_empty());
        let err = outcome.unread_week_error().unwrap();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.contains("Invalid token"), "{}", err.message);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.page, 1);
        assert_eq!(failure.code, exit_codes::EXIT_FETCH_AUTH);
    }

    #[test]
    fn test_stuck_cursor() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param_missing("next");
            then.status(200)
                .json_body(page_body(vec![mock_activity("a@x.io", "Apply")], Some("c1")));
        });
        let repeat = server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param("next", "c1");
            then.status(200)
                .json_body(page_body(vec![mock_activity("b@x.io", "Apply")], Some("c1")));
        });

        let err = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Fail)
            .unwrap_err();
        repeat.assert_calls(1);
        assert!(err.message.contains("pagination stuck"), "{}", err.message);

        let outcome = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Partial)
            .unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.failure.unwrap().message.contains("pagination stuck"));
    }

    #[test]
    fn test_cursor_cycle_stops() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param_missing("next");
            then.status(200)
                .json_body(page_body(vec![mock_activity("a@x.io", "Apply")], Some("c1")));
        });
        let c1 = server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param("next", "c1");
            then.status(200)
                .json_body(page_body(vec![mock_activity("b@x.io", "Apply")], Some("c2")));
        });
        let c2 = server.mock(|when, then| {
            when.method(GET)
                .path("/org/activities")
                .query_param("next", "c2");
            then.status(200)
                .json_body(page_body(vec![mock_activity("c@x.io", "Apply")], Some("c1")));
        });

        let outcome = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Partial)
            .unwrap();
        c1.assert_calls(1);
        c2.assert_calls(1);
        assert_eq!(outcome.records.len(), 3);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(failure.message.contains("next=c1 repeated"), "{}", failure.message);

        let err = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Fail)
            .unwrap_err();
        assert!(err.message.contains("pagination stuck"), "{}", err.message);
    }

    #[test]
    fn test_malformed_page_is_page_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/org/activities");
            then.status(200)
                .json_body(serde_json::json!({ "items": [], "next": null }));
        });

        let err = client(&server)
            .fetch_all(100, 200, PageErrorPolicy::Fail)
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("missing 'data' array"));
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/org/activities");
            then.status(200).json_body(page_body(vec![], None));
        });

        let client = ActivityClient::new("t".into(), server.url("/org"));
        let outcome = client.fetch_all(1, 2, PageErrorPolicy::Fail).unwrap();
        mock.assert();
        assert!(outcome.records.is_empty());
    }
}
