// Configuration loading

pub mod settings;
pub mod taxonomy;

pub use settings::{ConfigError, LabelLocale, PageErrorPolicy, Settings, WeekAnchor};
pub use taxonomy::Taxonomy;
