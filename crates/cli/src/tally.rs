//! Per-actor activity counts.

use std::collections::BTreeMap;

use crate::exit_codes;
use crate::fetch::ActivityRecord;
use crate::CliError;

/// actor → (category → count). Ordered maps keep iteration deterministic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tally {
    counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl Tally {
    pub fn from_records(records: &[ActivityRecord]) -> Self {
        let mut tally = Tally::default();
        for rec in records {
            tally.add(&rec.actor, &rec.category);
        }
        tally
    }

    pub fn add(&mut self, actor: &str, category: &str) {
        *self
            .counts
            .entry(actor.to_string())
            .or_default()
            .entry(category.to_string())
            .or_insert(0) += 1;
    }

    pub fn count(&self, actor: &str, category: &str) -> u64 {
        self.counts
            .get(actor)
            .and_then(|cats| cats.get(category))
            .copied()
            .unwrap_or(0)
    }

    /// Actors in ascending order with their category counts.
    pub fn actors(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, u64>)> {
        self.counts.iter().map(|(actor, cats)| (actor.as_str(), cats))
    }

    pub fn actor_count(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().flat_map(|cats| cats.values()).sum()
    }
}

/// Tally the fetched window, refusing to go on with nothing to report.
pub fn aggregate(records: &[ActivityRecord]) -> Result<Tally, CliError> {
    if records.is_empty() {
        return Err(CliError {
            code: exit_codes::EXIT_FETCH_NO_DATA,
            message: "no activities found for the selected week".into(),
            hint: Some("nothing was written to the sheet".into()),
        });
    }
    Ok(Tally::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn rec(actor: &str, category: &str) -> ActivityRecord {
        ActivityRecord {
            actor: actor.to_string(),
            occurred_at: Utc.timestamp_opt(1_704_100_000, 0).single(),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_counts_per_actor_and_category() {
        let tally = Tally::from_records(&[
            rec("a", "Apply"),
            rec("a", "Apply"),
            rec("b", "Rejected"),
        ]);

        assert_eq!(tally.count("a", "Apply"), 2);
        assert_eq!(tally.count("b", "Rejected"), 1);
        assert_eq!(tally.count("a", "Rejected"), 0);
        assert_eq!(tally.count("c", "Apply"), 0);

        let actors: Vec<&str> = tally.actors().map(|(a, _)| a).collect();
        assert_eq!(actors, vec!["a", "b"]);
        assert_eq!(tally.actors().next().unwrap().1.len(), 1);
    }

    #[test]
    fn test_total_matches_record_count() {
        let records = vec![
            rec("z@x.io", "Apply"),
            rec("a@x.io", "Interview"),
            rec("a@x.io", "Apply"),
            rec("z@x.io", "Apply"),
            rec("m@x.io", "Rejected"),
        ];
        let tally = Tally::from_records(&records);
        assert_eq!(tally.total(), records.len() as u64);

        // Unknown categories are counted, not filtered
        assert_eq!(tally.count("a@x.io", "Interview"), 1);

        let actors: Vec<&str> = tally.actors().map(|(a, _)| a).collect();
        assert_eq!(actors, vec!["a@x.io", "m@x.io", "z@x.io"]);
    }

    #[test]
    fn test_aggregate_empty_is_no_data() {
        let err = aggregate(&[]).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_NO_DATA);

        let tally = aggregate(&[rec("a", "Apply"), rec("b", "Apply")]).unwrap();
        assert_eq!(tally.actor_count(), 2);
    }
}
