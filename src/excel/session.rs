//! The in-memory Sales Update workbook for one run
//!
//! Opened once from the latest workbook, mutated by every stage, saved once to
//! the date-stamped copy. Nothing touches disk until [`SalesUpdateSession::save`].

use crate::error::{SalesUpdateError, SalesUpdateResult};
use crate::locator;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use umya_spreadsheet::{reader, writer, Spreadsheet, Worksheet};

/// `Sales Update 03.14.xlsx` for the 14th of March
pub fn dated_file_name(prefix: &str, today: NaiveDate) -> String {
    format!("{} {}.xlsx", prefix, today.format("%m.%d"))
}

pub struct SalesUpdateSession {
    book: Spreadsheet,
    source: PathBuf,
    target: PathBuf,
}

impl SalesUpdateSession {
    /// Open `source`; the result will be written to `target`
    pub fn open(source: &Path, target: PathBuf) -> SalesUpdateResult<Self> {
        let book = reader::xlsx::read(source).map_err(|e| {
            SalesUpdateError::Workbook(format!("Failed to open {}: {}", source.display(), e))
        })?;
        debug!(source = %source.display(), output = %target.display(), "workbook opened");

        Ok(Self {
            book,
            source: source.to_path_buf(),
            target,
        })
    }

    /// Open the most recently modified `*<prefix>*.xlsx` in `dir`, targeting a
    /// copy named for `today`
    pub fn begin(dir: &Path, prefix: &str, today: NaiveDate) -> SalesUpdateResult<Self> {
        let source = locator::find_latest(dir, prefix, Some("xlsx"))?;
        let target = dir.join(dated_file_name(prefix, today));
        Self::open(&source, target)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.book.get_sheet_by_name(name).is_some()
    }

    pub fn sheet(&self, name: &str) -> SalesUpdateResult<&Worksheet> {
        self.book
            .get_sheet_by_name(name)
            .ok_or_else(|| SalesUpdateError::SheetNotFound(name.to_string()))
    }

    pub fn sheet_mut(&mut self, name: &str) -> SalesUpdateResult<&mut Worksheet> {
        self.book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| SalesUpdateError::SheetNotFound(name.to_string()))
    }

    /// Write the workbook to the target path.
    ///
    /// The file is written next to the target first and renamed over it, so a
    /// failed write never leaves a truncated workbook behind.
    pub fn save(&self) -> SalesUpdateResult<PathBuf> {
        let dir = self
            .target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let temp = tempfile::Builder::new()
            .prefix(".sales-update-")
            .suffix(".xlsx")
            .tempfile_in(dir)?;
        writer::xlsx::write(&self.book, temp.path()).map_err(|e| {
            SalesUpdateError::Workbook(format!("Failed to save {}: {}", self.target.display(), e))
        })?;
        temp.persist(&self.target).map_err(|e| SalesUpdateError::Io(e.error))?;

        info!(path = %self.target.display(), "workbook saved");
        Ok(self.target.clone())
    }
}
