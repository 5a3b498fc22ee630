//! Output module for exporting harvest results
//!
//! This module handles:
//! - Rendering the country and region tables as MySQL scripts
//! - Writing those scripts to the output directory
//! - Recording and printing harvest statistics

mod sql;
pub mod stats;

pub use sql::{quote_sql, render_countries_sql, render_regions_sql, ExportHeader};
pub use stats::{print_statistics, HarvestStats, TierStats};

use crate::state::Country;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// File names of the two scripts
pub const COUNTRIES_FILE: &str = "countries.sql";
pub const REGIONS_FILE: &str = "regions.sql";

/// Outcome of writing the export scripts
///
/// A failed file does not stop the other from being written.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<ExportError>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes `countries.sql` and `regions.sql` into `directory`
///
/// # Arguments
///
/// * `countries` - The harvested countries, in export order
/// * `directory` - Output directory, created if missing
/// * `header` - Provenance stamped into both files
///
/// # Returns
///
/// An [`ExportReport`] listing written files and per-file failures.
pub fn write_mysql_export(
    countries: &[Country],
    directory: &Path,
    header: &ExportHeader,
) -> ExportReport {
    let mut report = ExportReport::default();

    if let Err(source) = std::fs::create_dir_all(directory) {
        let err = ExportError::CreateDir {
            path: directory.to_path_buf(),
            source,
        };
        tracing::error!(error = %err, "Export aborted");
        report.failed.push(err);
        return report;
    }

    let scripts = [
        (COUNTRIES_FILE, render_countries_sql(countries, header)),
        (REGIONS_FILE, render_regions_sql(countries, header)),
    ];

    for (file_name, contents) in scripts {
        let path = directory.join(file_name);
        match std::fs::write(&path, contents) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Export written");
                report.written.push(path);
            }
            Err(source) => {
                let err = ExportError::Write { path, source };
                tracing::error!(error = %err, "Export file failed");
                report.failed.push(err);
            }
        }
    }

    report
}
