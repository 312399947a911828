//! Sequential extraction pipeline and working-directory lifecycle.
//!
//! Stage order is fixed: acquire, extract, then the four filter stages in
//! foreign-key dependency order (stops feed stop_times feed trips feed
//! routes), then the two passthrough copies. Each stage's key set is a
//! hard input to the next, so nothing here runs concurrently.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info};

use crate::archive;
use crate::config::ExtractConfig;
use crate::copy::copy_table;
use crate::fetch::{self, HttpClient};
use crate::filter::{FilterOutcome, Predicate, filter_table};
use crate::summary::RunSummary;

const ARCHIVE_NAME: &str = "latest.zip";

/// Runs one full extraction against `config`.
///
/// Acquisition and extraction failures abort the run. A failure inside any
/// single filter or copy stage is absorbed: logged, the stage's output
/// degrades to empty or skipped, and later stages still run. The transient
/// working directory is removed on every exit path, fatal ones included.
pub async fn run<C: HttpClient>(client: &C, config: &ExtractConfig) -> Result<RunSummary> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    // Dropping the guard deletes the directory, whichever way we leave.
    let workdir = tempfile::tempdir().context("failed to create working directory")?;
    let work = workdir.path();
    let zip_path = work.join(ARCHIVE_NAME);

    info!(url = %config.feed_url, "Acquiring feed archive");
    acquire(client, &config.feed_url, &zip_path).await?;

    info!("Extracting tables from archive");
    archive::extract_entries(&zip_path, work, &config.tables)?;

    let out = config.output_dir.as_path();

    let stops = absorb(
        "stops",
        &out.join("stops.txt"),
        filter_table(
            &work.join("stops.txt"),
            &out.join("stops.txt"),
            Predicate::Prefix {
                column: "stop_name",
                prefixes: &config.stop_prefixes,
            },
            Some("stop_id"),
        ),
    );

    let stop_times = absorb(
        "stop_times",
        &out.join("stop_times.txt"),
        filter_table(
            &work.join("stop_times.txt"),
            &out.join("stop_times.txt"),
            Predicate::MemberOf {
                column: "stop_id",
                keys: &stops.keys,
            },
            Some("trip_id"),
        ),
    );

    let trips = absorb(
        "trips",
        &out.join("trips.txt"),
        filter_table(
            &work.join("trips.txt"),
            &out.join("trips.txt"),
            Predicate::MemberOf {
                column: "trip_id",
                keys: &stop_times.keys,
            },
            Some("route_id"),
        ),
    );

    let routes = absorb(
        "routes",
        &out.join("routes.txt"),
        filter_table(
            &work.join("routes.txt"),
            &out.join("routes.txt"),
            Predicate::MemberOf {
                column: "route_id",
                keys: &trips.keys,
            },
            None,
        ),
    );

    let calendar_copied = absorb_copy(
        "calendar",
        copy_table(&work.join("calendar.txt"), &out.join("calendar.txt")),
    );
    let agency_copied = absorb_copy(
        "agency",
        copy_table(&work.join("agency.txt"), &out.join("agency.txt")),
    );

    let summary = RunSummary {
        timestamp: Utc::now(),
        stops: stops.rows_written,
        stop_times: stop_times.rows_written,
        trips: trips.rows_written,
        routes: routes.rows_written,
        calendar_copied,
        agency_copied,
    };

    info!(
        stops = summary.stops,
        stop_times = summary.stop_times,
        trips = summary.trips,
        routes = summary.routes,
        "Extraction complete"
    );
    Ok(summary)
}

/// Fetches an `http(s)` source over the network; anything else is treated
/// as a local file path, so tests and dev runs work offline.
#[tracing::instrument(skip_all, fields(source = %source))]
async fn acquire<C: HttpClient>(client: &C, source: &str, dest: &Path) -> Result<()> {
    if source.starts_with("http") {
        fetch::fetch_to_file(client, source, dest).await?;
    } else {
        fs::copy(source, dest)
            .with_context(|| format!("failed to read local feed archive {source}"))?;
    }
    Ok(())
}

/// Absorbs a filter-stage failure: logged, any partial output removed, and
/// the stage yields an empty outcome so later stages run against an empty
/// key set.
fn absorb(stage: &str, dest: &Path, result: Result<FilterOutcome>) -> FilterOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(stage, error = %e, "Filter stage failed, continuing with empty key set");
            let _ = fs::remove_file(dest);
            FilterOutcome::default()
        }
    }
}

fn absorb_copy(table: &str, result: Result<bool>) -> bool {
    match result {
        Ok(copied) => copied,
        Err(e) => {
            error!(table, error = %e, "Copy failed, skipping table");
            false
        }
    }
}
