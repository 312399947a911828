//! Error kinds the pipeline must tell apart when deciding whether a
//! failure aborts the run or degrades a single stage.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("failed to fetch feed archive from {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("feed archive {path} is not a readable zip: {source}")]
    ArchiveCorrupt {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("{table}: missing required column `{column}`")]
    MissingColumn { table: String, column: String },

    #[error("{table} row {row}: missing required field `{column}`")]
    MissingField {
        table: String,
        row: u64,
        column: String,
    },
}
