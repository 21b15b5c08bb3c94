//! Finds the export files and workbook to work on
//!
//! "Latest" always means most recent modification time. Ties fall back to
//! directory iteration order.

use crate::error::{SalesUpdateError, SalesUpdateResult};
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Prefix Excel uses for the owner file of a workbook that is open
const OWNER_FILE_PREFIX: &str = "~$";

fn pattern_for(fragment: &str, extension: Option<&str>) -> String {
    let fragment = Pattern::escape(fragment);
    match extension {
        Some(ext) => format!("*{}*.{}", fragment, Pattern::escape(ext.trim_start_matches('.'))),
        None => format!("*{}*", fragment),
    }
}

/// Every regular file in `dir` whose name contains `fragment` (and ends with
/// `.extension` when given), paired with its modification time
pub fn matching_files(
    dir: &Path,
    fragment: &str,
    extension: Option<&str>,
) -> SalesUpdateResult<Vec<(PathBuf, SystemTime)>> {
    let glob_text = pattern_for(fragment, extension);
    let pattern = Pattern::new(&glob_text)
        .map_err(|e| SalesUpdateError::Config(format!("bad file pattern '{}': {}", glob_text, e)))?;
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(OWNER_FILE_PREFIX) || !pattern.matches_with(name, options) {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        found.push((entry.path(), metadata.modified()?));
    }

    Ok(found)
}

/// The most recently modified file matching `*fragment*[.extension]`
pub fn find_latest(dir: &Path, fragment: &str, extension: Option<&str>) -> SalesUpdateResult<PathBuf> {
    let candidates = matching_files(dir, fragment, extension)?;
    debug!(
        pattern = %pattern_for(fragment, extension),
        candidates = candidates.len(),
        "locating latest file"
    );

    let mut latest: Option<(PathBuf, SystemTime)> = None;
    for (path, modified) in candidates {
        match &latest {
            Some((_, best)) if *best >= modified => {}
            _ => latest = Some((path, modified)),
        }
    }

    latest
        .map(|(path, _)| path)
        .ok_or_else(|| SalesUpdateError::FileNotFound {
            dir: dir.to_path_buf(),
            pattern: pattern_for(fragment, extension),
        })
}

/// A file with a fixed name (such as `2023_pbt.csv`) that must exist in `dir`
pub fn require_file(dir: &Path, name: &str) -> SalesUpdateResult<PathBuf> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(SalesUpdateError::FileNotFound {
            dir: dir.to_path_buf(),
            pattern: name.to_string(),
        })
    }
}
