// Run settings
// Loaded from ~/.config/weektally/config.toml (or --config)

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::taxonomy::Taxonomy;

/// How the Monday of week 1 is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekAnchor {
    /// Monday on or before January 1 (week 1 always contains Jan 1)
    #[default]
    Jan1,
    /// Strict ISO 8601: week 1 is the week containing January 4
    Iso,
}

/// What to do when one page of the activity listing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageErrorPolicy {
    /// Keep the pages already fetched, stop paginating, flag the report incomplete
    #[default]
    Partial,
    /// Abort the whole run
    Fail,
}

/// Language of the human-readable period label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelLocale {
    #[default]
    En,
    Id,
}

impl FromStr for WeekAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jan1" => Ok(Self::Jan1),
            "iso" => Ok(Self::Iso),
            other => Err(format!("unknown week anchor {:?} (expected jan1 or iso)", other)),
        }
    }
}

impl FromStr for PageErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "partial" => Ok(Self::Partial),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown page error policy {:?} (expected partial or fail)", other)),
        }
    }
}

impl FromStr for LabelLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "id" => Ok(Self::Id),
            other => Err(format!("unknown locale {:?} (expected en or id)", other)),
        }
    }
}

/// `[taxonomy]` table. Both lists must be given together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaxonomySettings {
    pub categories: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Activity API base URL (e.g. "https://api.example.com/org/v2/")
    pub api_url: Option<String>,

    /// Destination spreadsheet key
    pub sheet_id: Option<String>,

    /// Service-account key file for the spreadsheet service
    pub credentials: Option<PathBuf>,

    pub week_anchor: WeekAnchor,
    pub page_error: PageErrorPolicy,
    pub label_locale: LabelLocale,
    pub taxonomy: TaxonomySettings,
}

/// Error type for settings loading.
#[derive(Debug)]
pub enum ConfigError {
    /// Settings file could not be read
    Io { path: PathBuf, message: String },
    /// Settings file is not valid TOML for this schema
    Parse { path: PathBuf, message: String },
    /// Category and label lists are inconsistent
    Taxonomy(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "cannot read {}: {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid settings in {}: {}", path.display(), message)
            }
            ConfigError::Taxonomy(msg) => write!(f, "invalid taxonomy: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Settings {
    /// Default settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weektally")
            .join("config.toml")
    }

    /// Load settings.
    ///
    /// An explicit path must exist. Without one, the default path is tried
    /// and a missing file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::config_path();
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;

        Self::from_toml_str(&contents).map_err(|message| ConfigError::Parse { path, message })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Resolve the configured taxonomy, or the built-in one.
    pub fn taxonomy(&self) -> Result<Taxonomy, ConfigError> {
        match (&self.taxonomy.categories, &self.taxonomy.labels) {
            (None, None) => Ok(Taxonomy::default()),
            (Some(categories), Some(labels)) => Taxonomy::new(categories.clone(), labels.clone()),
            (Some(_), None) => Err(ConfigError::Taxonomy(
                "taxonomy.categories given without taxonomy.labels".into(),
            )),
            (None, Some(_)) => Err(ConfigError::Taxonomy(
                "taxonomy.labels given without taxonomy.categories".into(),
            )),
        }
    }
}
