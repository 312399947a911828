//! Per-run observability record.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Matched-row counts and copy outcomes for one extraction run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,

    pub stops: u64,
    pub stop_times: u64,
    pub trips: u64,
    pub routes: u64,

    pub calendar_copied: bool,
    pub agency_copied: bool,
}

/// Logs a run summary as pretty-printed JSON.
pub fn print_json(summary: &RunSummary) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
