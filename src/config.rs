//! Run configuration: which feed to pull, where output goes, and which
//! stop-name prefixes define the target region.

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_FEED_URL: &str = "https://download.gtfs.de/germany/nv_free/latest.zip";
const DEFAULT_OUTPUT_DIR: &str = "data/gtfs";

/// The tables the downstream route planner consumes, in pipeline order.
const PLANNER_TABLES: &[&str] = &[
    "stops.txt",
    "stop_times.txt",
    "calendar.txt",
    "trips.txt",
    "routes.txt",
    "agency.txt",
];

/// Stop-name prefixes covering the Bielefeld tariff area. Names in the
/// national feed follow the "City, Stop" convention, so most prefixes end
/// with a comma to avoid matching other cities sharing the same first word.
const BIELEFELD_PREFIXES: &[&str] = &[
    "Bielefeld Hbf,",
    "Bielefeld,",
    "Bi-Altenhagen,",
    "Bi-Babenhausen,",
    "Bi-Brackwede,",
    "Bi-Brake,",
    "Bi-Brönninghsn,",
    "Bi-Dalbke,",
    "Bi-Eckardtsh.,",
    "Bi-Eckardtsheim,",
    "Bi-Gadderbaum,",
    "Bi-Gellersh.,",
    "Bi-Gellershagen,",
    "Bi-Großdornberg,",
    "Bi-Heepen,",
    "Bi-Heideblümchen,",
    "Bi-Hilleg,",
    "Bi-Hillegossen,",
    "Bi-Hob/Uerent,",
    "Bi-Holtkamp,",
    "Bi-Jöllenbeck,",
    "Bi-Kirchdornberg,",
    "Bi-Lämershagen,",
    "Bi-Milse,",
    "Bi-Oldentrup,",
    "Bi-Quelle,",
    "Bi-Schild,",
    "Bi-Schildesche,",
    "Bi-Schröttinghausen,",
    "Bi-Schröttinghsn,",
    "Bi-Senne,",
    "Bi-Sennest,",
    "Bi-Sennestadt,",
    "Bi-Sieker,",
    "Bi-Stieghorst,",
    "Bi-Theesen,",
    "Bi-Ubbedissen,",
    "Bi-Ummeln,",
    "Bi-Vilsensdorf,",
    "Bi-Windelsbleiche,",
    "Bi-Windflöte,",
];

/// Everything one extraction run needs to know, fixed at construction.
///
/// No individual value is overridable at runtime; alternate cities or feeds
/// are expressed as a whole different config, typically loaded with
/// [`ExtractConfig::load`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// URL of the feed archive. A value not starting with `http` is read
    /// as a local file path.
    pub feed_url: String,

    /// Directory the filtered tables are written into, fully overwritten
    /// each run.
    pub output_dir: PathBuf,

    /// Archive entries to extract, in order.
    pub tables: Vec<String>,

    /// Stop-name prefixes defining the target region. Matching is exact,
    /// case-sensitive, and untrimmed.
    pub stop_prefixes: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tables: PLANNER_TABLES.iter().map(|t| t.to_string()).collect(),
            stop_prefixes: BIELEFELD_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ExtractConfig {
    /// Loads a config from a JSON file at `path`. Fields left out of the
    /// file keep their defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
