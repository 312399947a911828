//! Extraction of the wanted tables from the downloaded feed archive.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::ExtractError;

/// Extracts each entry named in `wanted`, in order, from the zip at
/// `zip_path` into `dest_dir`.
///
/// An entry absent from the archive is logged and skipped; that table is
/// simply unavailable to later stages. Entries are looked up by exact name,
/// so nothing outside `wanted` is ever extracted.
///
/// # Errors
///
/// Returns [`ExtractError::ArchiveCorrupt`] if the file cannot be opened as
/// a zip archive, and propagates any I/O error while writing an entry out.
pub fn extract_entries(zip_path: &Path, dest_dir: &Path, wanted: &[String]) -> Result<()> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file).map_err(|source| ExtractError::ArchiveCorrupt {
        path: zip_path.to_path_buf(),
        source,
    })?;

    for name in wanted {
        match archive.by_name(name) {
            Ok(mut entry) => {
                let mut out = File::create(dest_dir.join(name))?;
                io::copy(&mut entry, &mut out)?;
                debug!(entry = %name, "Extracted archive entry");
            }
            Err(ZipError::FileNotFound) => {
                warn!(entry = %name, "Entry not found in feed archive");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
