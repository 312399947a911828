use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use gtfs_subset::config::ExtractConfig;
use gtfs_subset::error::ExtractError;
use gtfs_subset::fetch::BasicClient;
use gtfs_subset::pipeline;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const STOPS: &str = "stop_id,stop_name,stop_lat,stop_lon\n\
    1,\"Bielefeld Hbf, Bussteig 1\",52.03,8.53\n\
    2,\"Hannover Hbf, ZOB\",52.37,9.74\n\
    3,\"Bi-Brackwede, Kirche\",51.99,8.49\n";

const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
    T1,08:00:00,08:01:00,1,0\n\
    T1,08:10:00,08:11:00,2,1\n\
    T9,09:00:00,09:01:00,2,0\n\
    T2,10:00:00,10:00:30,3,0\n";

const TRIPS: &str = "route_id,service_id,trip_id\n\
    R1,S1,T1\n\
    R9,S1,T9\n\
    R2,S2,T2\n";

const ROUTES: &str = "route_id,agency_id,route_short_name,route_type\n\
    R1,A1,RE6,2\n\
    R9,A1,S5,2\n\
    R2,A2,29,3\n";

const CALENDAR: &str =
    "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
    S1,1,1,1,1,1,0,0,20260101,20261231\n\
    S2,0,0,0,0,0,1,1,20260101,20261231\n";

const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone\n\
    A1,DB Regio,https://www.bahn.de,Europe/Berlin\n\
    A2,moBiel,https://www.mobiel.de,Europe/Berlin\n";

fn write_feed_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn config_for(feed: &Path, out_dir: &Path) -> ExtractConfig {
    ExtractConfig {
        feed_url: feed.display().to_string(),
        output_dir: out_dir.to_path_buf(),
        ..ExtractConfig::default()
    }
}

fn column_values(path: &Path, column: &str) -> HashSet<String> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let idx = reader
        .headers()
        .unwrap()
        .iter()
        .position(|h| h == column)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().get(idx).unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_extraction_preserves_referential_closure() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("feed.zip");
    write_feed_zip(
        &feed,
        &[
            ("stops.txt", STOPS),
            ("stop_times.txt", STOP_TIMES),
            ("trips.txt", TRIPS),
            ("routes.txt", ROUTES),
            ("calendar.txt", CALENDAR),
            ("agency.txt", AGENCY),
        ],
    );
    let out = dir.path().join("out");

    let summary = pipeline::run(&BasicClient::new(), &config_for(&feed, &out))
        .await
        .unwrap();

    assert_eq!(summary.stops, 2);
    assert_eq!(summary.stop_times, 2);
    assert_eq!(summary.trips, 2);
    assert_eq!(summary.routes, 2);
    assert!(summary.calendar_copied);
    assert!(summary.agency_copied);

    let stop_ids = column_values(&out.join("stops.txt"), "stop_id");
    assert_eq!(stop_ids, ["1", "3"].map(String::from).into_iter().collect());

    // every stop_id in filtered stop_times came from the retained stop set
    let st_stop_ids = column_values(&out.join("stop_times.txt"), "stop_id");
    assert!(st_stop_ids.is_subset(&stop_ids));

    // every trip in filtered trips is reachable from a retained stop_time
    let st_trip_ids = column_values(&out.join("stop_times.txt"), "trip_id");
    let trip_ids = column_values(&out.join("trips.txt"), "trip_id");
    assert_eq!(trip_ids, st_trip_ids);
    assert_eq!(trip_ids, ["T1", "T2"].map(String::from).into_iter().collect());

    // every route in filtered routes is referenced by a retained trip
    let trip_route_ids = column_values(&out.join("trips.txt"), "route_id");
    let route_ids = column_values(&out.join("routes.txt"), "route_id");
    assert_eq!(route_ids, trip_route_ids);

    // passthrough tables are byte-identical
    assert_eq!(fs::read_to_string(out.join("calendar.txt")).unwrap(), CALENDAR);
    assert_eq!(fs::read_to_string(out.join("agency.txt")).unwrap(), AGENCY);
}

#[tokio::test]
async fn test_missing_stop_times_degrades_downstream_tables() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("feed.zip");
    write_feed_zip(
        &feed,
        &[
            ("stops.txt", STOPS),
            ("trips.txt", TRIPS),
            ("routes.txt", ROUTES),
            ("calendar.txt", CALENDAR),
            ("agency.txt", AGENCY),
        ],
    );
    let out = dir.path().join("out");

    let summary = pipeline::run(&BasicClient::new(), &config_for(&feed, &out))
        .await
        .unwrap();

    // stops are still filtered correctly
    assert_eq!(summary.stops, 2);

    // stop_times has no output at all, downstream tables are header-only
    assert_eq!(summary.stop_times, 0);
    assert!(!out.join("stop_times.txt").exists());
    assert_eq!(
        fs::read_to_string(out.join("trips.txt")).unwrap(),
        "route_id,service_id,trip_id\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("routes.txt")).unwrap(),
        "route_id,agency_id,route_short_name,route_type\n"
    );

    // passthrough tables are unaffected
    assert!(summary.calendar_copied);
    assert!(summary.agency_copied);
}

#[tokio::test]
async fn test_two_runs_produce_identical_output() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("feed.zip");
    write_feed_zip(
        &feed,
        &[
            ("stops.txt", STOPS),
            ("stop_times.txt", STOP_TIMES),
            ("trips.txt", TRIPS),
            ("routes.txt", ROUTES),
            ("calendar.txt", CALENDAR),
            ("agency.txt", AGENCY),
        ],
    );
    let out = dir.path().join("out");
    let config = config_for(&feed, &out);
    let client = BasicClient::new();

    pipeline::run(&client, &config).await.unwrap();
    let first: Vec<Vec<u8>> = config
        .tables
        .iter()
        .map(|t| fs::read(out.join(t)).unwrap())
        .collect();

    pipeline::run(&client, &config).await.unwrap();
    let second: Vec<Vec<u8>> = config
        .tables
        .iter()
        .map(|t| fs::read(out.join(t)).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_acquisition_aborts_before_any_output() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let config = config_for(&dir.path().join("no-such-feed.zip"), &out);

    let result = pipeline::run(&BasicClient::new(), &config).await;

    assert!(result.is_err());
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[tokio::test]
async fn test_corrupt_archive_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("feed.zip");
    fs::write(&feed, b"definitely not a zip archive").unwrap();
    let out = dir.path().join("out");

    let err = pipeline::run(&BasicClient::new(), &config_for(&feed, &out))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ExtractError>(),
        Some(ExtractError::ArchiveCorrupt { .. })
    ));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[tokio::test]
async fn test_malformed_row_fails_only_its_stage() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("feed.zip");
    // second stop_times row lacks the stop_id field entirely
    let bad_stop_times = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
        T1,08:00:00,08:01:00,1,0\n\
        T9,09:00:00\n";
    write_feed_zip(
        &feed,
        &[
            ("stops.txt", STOPS),
            ("stop_times.txt", bad_stop_times),
            ("trips.txt", TRIPS),
            ("routes.txt", ROUTES),
            ("calendar.txt", CALENDAR),
            ("agency.txt", AGENCY),
        ],
    );
    let out = dir.path().join("out");

    let summary = pipeline::run(&BasicClient::new(), &config_for(&feed, &out))
        .await
        .unwrap();

    // the failed stage leaves no partial output and an empty key set
    assert_eq!(summary.stop_times, 0);
    assert!(!out.join("stop_times.txt").exists());

    // the run still completes: stops are filtered, later stages run empty
    assert_eq!(summary.stops, 2);
    assert_eq!(summary.trips, 0);
    assert_eq!(summary.routes, 0);
    assert!(summary.calendar_copied);
    assert!(summary.agency_copied);
}
