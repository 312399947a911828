//! Streaming filter stages over the extracted tables.
//!
//! All four stages (stops, stop_times, trips, routes) share one shape:
//! stream rows, keep the ones matching a predicate, and project a key
//! column from the kept rows into the set handed to the next stage.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use csv::{ReaderBuilder, WriterBuilder};
use tracing::{error, info, warn};

use crate::error::ExtractError;

/// Identifiers projected out of one stage and consumed as a membership
/// predicate by the next. The values are opaque strings.
pub type KeySet = HashSet<String>;

/// Row inclusion rule for a single filter stage.
pub enum Predicate<'a> {
    /// Keep rows whose `column` value starts with any of `prefixes`
    /// (exact, case-sensitive, untrimmed). A missing field reads as empty
    /// and never matches.
    Prefix {
        column: &'a str,
        prefixes: &'a [String],
    },
    /// Keep rows whose `column` value is a member of `keys`. A row without
    /// the column is malformed input that could break referential
    /// integrity downstream, so it fails the stage instead of being
    /// silently dropped.
    MemberOf { column: &'a str, keys: &'a KeySet },
}

/// Result of one filter stage: the keys handed to the next stage plus the
/// number of rows written.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub keys: KeySet,
    pub rows_written: u64,
}

/// Predicate with its column resolved against the table header.
enum Rule<'a> {
    Prefix {
        idx: Option<usize>,
        prefixes: &'a [String],
    },
    Member {
        idx: usize,
        column: &'a str,
        keys: &'a KeySet,
    },
}

/// Streams the table at `src` into `dest`, keeping only rows that match
/// `predicate`. Kept rows are written verbatim, full column set, original
/// order. When `key_column` is given, its value from each kept row joins
/// the returned key set.
///
/// A missing source file or an empty/unreadable header yields an empty
/// outcome (and no output file) without failing.
///
/// # Errors
///
/// Returns [`ExtractError::MissingColumn`] / [`ExtractError::MissingField`]
/// when the table lacks a column the stage depends on, and propagates I/O
/// and CSV errors. The caller decides whether that aborts the run.
pub fn filter_table(
    src: &Path,
    dest: &Path,
    predicate: Predicate<'_>,
    key_column: Option<&str>,
) -> Result<FilterOutcome> {
    let table = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| src.display().to_string());

    if !src.exists() {
        warn!(table = %table, "Source table missing, skipping filter");
        return Ok(FilterOutcome::default());
    }

    let mut reader = ReaderBuilder::new().flexible(true).from_path(src)?;
    let headers = match reader.headers() {
        Ok(h) if !h.is_empty() => h.clone(),
        Ok(_) => {
            error!(table = %table, "Table header is empty, treating table as absent");
            return Ok(FilterOutcome::default());
        }
        Err(e) => {
            error!(table = %table, error = %e, "Table header is unreadable, treating table as absent");
            return Ok(FilterOutcome::default());
        }
    };

    let rule = match predicate {
        Predicate::Prefix { column, prefixes } => Rule::Prefix {
            idx: headers.iter().position(|h| h == column),
            prefixes,
        },
        Predicate::MemberOf { column, keys } => {
            let idx = headers.iter().position(|h| h == column).ok_or_else(|| {
                ExtractError::MissingColumn {
                    table: table.clone(),
                    column: column.to_string(),
                }
            })?;
            Rule::Member { idx, column, keys }
        }
    };

    let key = match key_column {
        Some(column) => {
            let idx = headers.iter().position(|h| h == column).ok_or_else(|| {
                ExtractError::MissingColumn {
                    table: table.clone(),
                    column: column.to_string(),
                }
            })?;
            Some((idx, column))
        }
        None => None,
    };

    let mut writer = WriterBuilder::new().from_path(dest)?;
    writer.write_record(&headers)?;

    let mut outcome = FilterOutcome::default();
    for (i, result) in reader.records().enumerate() {
        let row = i as u64 + 1;
        let record = result?;

        let keep = match &rule {
            Rule::Prefix { idx, prefixes } => {
                let value = idx.and_then(|j| record.get(j)).unwrap_or("");
                prefixes.iter().any(|p| value.starts_with(p.as_str()))
            }
            Rule::Member { idx, column, keys } => {
                let value = record.get(*idx).ok_or_else(|| ExtractError::MissingField {
                    table: table.clone(),
                    row,
                    column: (*column).to_string(),
                })?;
                keys.contains(value)
            }
        };
        if !keep {
            continue;
        }

        writer.write_record(&record)?;
        outcome.rows_written += 1;

        if let Some((idx, column)) = key {
            let value = record.get(idx).ok_or_else(|| ExtractError::MissingField {
                table: table.clone(),
                row,
                column: column.to_string(),
            })?;
            outcome.keys.insert(value.to_string());
        }
    }
    writer.flush()?;

    info!(
        table = %table,
        rows = outcome.rows_written,
        keys = outcome.keys.len(),
        "Table filtered"
    );
    Ok(outcome)
}
