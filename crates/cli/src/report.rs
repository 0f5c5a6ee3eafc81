//! Fixed-column report rows built from a [`Tally`] and a [`Taxonomy`].

use std::io::Write;
use std::path::PathBuf;

use serde_json::Value;
use weektally_config::Taxonomy;

use crate::tally::Tally;
use crate::CliError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub actor: String,
    /// One count per known category, in taxonomy order
    pub counts: Vec<u64>,
}

impl ReportRow {
    /// Sheet cells: the actor as text, counts as numbers.
    pub fn to_cells(&self) -> Vec<Value> {
        std::iter::once(Value::from(self.actor.as_str()))
            .chain(self.counts.iter().map(|&n| Value::from(n)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub headers: Vec<String>,
    pub rows: Vec<ReportRow>,
    /// Categories seen in the tally but absent from the taxonomy
    pub dropped: Vec<String>,
    /// Why the underlying fetch stopped early, if it did
    pub incomplete: Option<String>,
}

impl Report {
    pub fn width(&self) -> usize {
        self.headers.len()
    }
}

pub fn build_rows(tally: &Tally, taxonomy: &Taxonomy) -> Vec<ReportRow> {
    tally
        .actors()
        .map(|(actor, cats)| ReportRow {
            actor: actor.to_string(),
            counts: taxonomy
                .categories()
                .iter()
                .map(|cat| cats.get(cat).copied().unwrap_or(0))
                .collect(),
        })
        .collect()
}

pub fn build_report(tally: &Tally, taxonomy: &Taxonomy, incomplete: Option<String>) -> Report {
    let mut dropped: Vec<String> = tally
        .actors()
        .flat_map(|(_, cats)| cats.keys())
        .filter(|cat| !taxonomy.is_known(cat))
        .cloned()
        .collect();
    dropped.sort();
    dropped.dedup();

    Report {
        headers: taxonomy.labels().to_vec(),
        rows: build_rows(tally, taxonomy),
        dropped,
        incomplete,
    }
}

/// Write header + rows as CSV to `out` (stdout when `None`). Returns a label
/// for the destination.
pub fn write_csv(report: &Report, out: &Option<PathBuf>) -> Result<String, CliError> {
    let out_label = out
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());

    let writer: Box<dyn Write> = match out {
        Some(path) => {
            let f = std::fs::File::create(path).map_err(|e| {
                CliError::io(format!("cannot create {}: {}", path.display(), e))
            })?;
            Box::new(std::io::BufWriter::new(f))
        }
        None => Box::new(std::io::BufWriter::new(std::io::stdout().lock())),
    };

    write_records(report, writer)?;
    Ok(out_label)
}

fn write_records<W: Write>(report: &Report, writer: W) -> Result<(), CliError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    let write_err = |e: csv::Error| CliError::io(format!("CSV write error: {}", e));

    csv_writer.write_record(&report.headers).map_err(write_err)?;
    for row in &report.rows {
        let mut record = Vec::with_capacity(row.counts.len() + 1);
        record.push(row.actor.clone());
        record.extend(row.counts.iter().map(|n| n.to_string()));
        csv_writer.write_record(&record).map_err(write_err)?;
    }

    csv_writer
        .flush()
        .map_err(|e| CliError::io(format!("CSV flush error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy(categories: &[&str]) -> Taxonomy {
        let cats: Vec<String> = categories.iter().map(|s| s.to_string()).collect();
        let mut labels = vec!["Email".to_string()];
        labels.extend(cats.iter().cloned());
        Taxonomy::new(cats, labels).unwrap()
    }

    fn tally(pairs: &[(&str, &str)]) -> Tally {
        let mut t = Tally::default();
        for (actor, cat) in pairs {
            t.add(actor, cat);
        }
        t
    }

    #[test]
    fn test_row_fills_missing_categories_with_zero() {
        let rows = build_rows(
            &tally(&[("a", "Apply"), ("a", "Apply")]),
            &taxonomy(&["Apply", "Rejected"]),
        );
        assert_eq!(
            rows,
            vec![ReportRow { actor: "a".into(), counts: vec![2, 0] }],
        );
        assert_eq!(
            rows[0].to_cells(),
            vec![serde_json::json!("a"), serde_json::json!(2), serde_json::json!(0)],
        );
    }

    #[test]
    fn test_unknown_category_dropped_from_rows() {
        let t = tally(&[("a", "Apply"), ("a", "Interview"), ("b", "Interview")]);
        let report = build_report(&t, &taxonomy(&["Apply", "Rejected"]), None);

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].counts, vec![1, 0]);
        // Actor with only unknown activity still gets an all-zero row
        assert_eq!(report.rows[1].actor, "b");
        assert_eq!(report.rows[1].counts, vec![0, 0]);
        assert_eq!(report.dropped, vec!["Interview".to_string()]);
        assert_eq!(report.width(), 3);
    }

    #[test]
    fn test_default_taxonomy_width() {
        let report = build_report(&tally(&[("a", "Accept Offer")]), &Taxonomy::default(), None);
        assert_eq!(report.width(), 11);
        assert_eq!(report.rows[0].counts.len(), 10);
        assert_eq!(report.rows[0].counts[9], 1);
        assert!(report.dropped.is_empty());
    }

    #[test]
    fn test_csv_output() {
        let report = build_report(
            &tally(&[("b@x.io", "Rejected"), ("a@x.io", "Apply"), ("a@x.io", "Apply")]),
            &taxonomy(&["Apply", "Rejected"]),
            None,
        );
        let mut buf = Vec::new();
        write_records(&report, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Email,Apply,Rejected\na@x.io,2,0\nb@x.io,0,1\n",
        );
    }

    #[test]
    fn test_csv_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("week.csv");
        let report = build_report(&tally(&[("a", "Apply")]), &taxonomy(&["Apply"]), None);

        let label = write_csv(&report, &Some(path.clone())).unwrap();
        assert_eq!(label, path.display().to_string());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Email,Apply\na,1\n");
    }
}
