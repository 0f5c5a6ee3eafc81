//! Activity taxonomy: the tracked categories and their column labels.
//!
//! `labels[0]` heads the identifier column; `labels[i + 1]` heads the
//! column counting `categories[i]`. The two lists move in lockstep, which
//! [`Taxonomy::new`] enforces.

use crate::settings::ConfigError;

/// Categories counted in the report, in column order.
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "Apply",
    "Create Cover Letter",
    "Research Company / Job Requirement",
    "Priority Job",
    "Upload your CV in the document sections",
    "Upload your cover letter in the document sections",
    "Received User Invitation",
    "Rejected",
    "Networking Event",
    "Accept Offer",
];

/// Header row written above the counts. First entry is the identifier column.
pub const DEFAULT_LABELS: [&str; 11] = [
    "Email",
    "Apply",
    "Create Cover Letter",
    "Research Company",
    "Priority Job",
    "Upload CV",
    "Upload cover letter",
    "Received User Invitation",
    "Rejected",
    "Networking Event",
    "Accept Offer",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    categories: Vec<String>,
    labels: Vec<String>,
}

impl Taxonomy {
    pub fn new(categories: Vec<String>, labels: Vec<String>) -> Result<Self, ConfigError> {
        if categories.is_empty() {
            return Err(ConfigError::Taxonomy("no categories configured".into()));
        }
        if labels.len() != categories.len() + 1 {
            return Err(ConfigError::Taxonomy(format!(
                "expected {} labels (identifier column + {} categories), got {}",
                categories.len() + 1,
                categories.len(),
                labels.len(),
            )));
        }
        for (i, cat) in categories.iter().enumerate() {
            if cat.trim().is_empty() {
                return Err(ConfigError::Taxonomy(format!("category {} is blank", i + 1)));
            }
            if categories[..i].contains(cat) {
                return Err(ConfigError::Taxonomy(format!("duplicate category {:?}", cat)));
            }
        }
        Ok(Self { categories, labels })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_known(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
