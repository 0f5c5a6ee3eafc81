//! Activity fetching from the job-tracking API.

mod activities;
mod common;

pub use activities::{ActivityClient, ActivityRecord};
pub(crate) use common::{resolve_api_key, resolve_value};
