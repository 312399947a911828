//! Verbatim passthrough for the tables that are not filtered.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

/// Copies `src` to `dest` byte-for-byte, no parsing. Returns `false` after
/// a warning when the source is missing.
pub fn copy_table(src: &Path, dest: &Path) -> Result<bool> {
    let table = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| src.display().to_string());

    if !src.exists() {
        warn!(table = %table, "Source table missing, skipping copy");
        return Ok(false);
    }

    let bytes = fs::copy(src, dest)?;
    info!(table = %table, bytes, "Table copied");
    Ok(true)
}
