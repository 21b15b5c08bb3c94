//! The five-stage Sales Update run
//!
//! 1. open the latest workbook, targeting a copy named for today
//! 2. rewrite the current-year estimate summary sheet from the CSV export
//! 3. rebuild the current-year scoreboard column
//! 4. rebuild the prior-year scoreboard column (aged estimates only)
//! 5. rewrite the sales report sheet and the customer count columns
//!
//! All stages share one [`SalesUpdateSession`]; the workbook is saved once,
//! after stage 5. Any failure halts the run with nothing written.

mod estimates;
mod sales_report;
mod scoreboard;

pub use estimates::EstimateStage;
pub use sales_report::SalesReportStage;
pub use scoreboard::{ScoreboardStage, ScoreboardYear};

use crate::config::Layout;
use crate::error::{SalesUpdateError, SalesUpdateResult};
use crate::excel::SalesUpdateSession;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// Progress of a run, emitted after each stage completes
#[derive(Debug, Clone, PartialEq)]
pub enum StageReport {
    Opened { source: PathBuf, target: PathBuf },
    Estimates(EstimateStage),
    Scoreboard(ScoreboardStage),
    SalesReport(SalesReportStage),
    Saved { path: PathBuf },
}

/// Everything a run needs besides the workbook itself
pub struct Pipeline<'a> {
    dir: &'a Path,
    layout: &'a Layout,
    today: NaiveDate,
}

impl<'a> Pipeline<'a> {
    pub fn new(dir: &'a Path, layout: &'a Layout, today: NaiveDate) -> Self {
        Self { dir, layout, today }
    }

    pub fn dir(&self) -> &Path {
        self.dir
    }

    pub fn layout(&self) -> &Layout {
        self.layout
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Stage 1: open the latest workbook and check every sheet the run writes
    pub fn open_session(&self) -> SalesUpdateResult<SalesUpdateSession> {
        let session = SalesUpdateSession::begin(self.dir, &self.layout.sources.workbook, self.today)?;
        for sheet in self.layout.required_sheets() {
            if !session.has_sheet(sheet) {
                return Err(SalesUpdateError::SheetNotFound(sheet.to_string()));
            }
        }
        Ok(session)
    }

    /// Run every stage in order, calling `on_stage` as each one finishes.
    /// Returns the path of the saved workbook.
    pub fn run<F>(&self, mut on_stage: F) -> SalesUpdateResult<PathBuf>
    where
        F: FnMut(&StageReport),
    {
        let mut session = self.open_session()?;
        info!(source = %session.source().display(), "sales update started");
        on_stage(&StageReport::Opened {
            source: session.source().to_path_buf(),
            target: session.target().to_path_buf(),
        });

        let estimates = self.process_estimates(&mut session)?;
        on_stage(&StageReport::Estimates(estimates));

        let current = self.update_scoreboard(&mut session, ScoreboardYear::Current)?;
        on_stage(&StageReport::Scoreboard(current));

        let prior = self.update_scoreboard(&mut session, ScoreboardYear::Prior)?;
        on_stage(&StageReport::Scoreboard(prior));

        let sales = self.update_sales_report(&mut session)?;
        on_stage(&StageReport::SalesReport(sales));

        let path = session.save()?;
        on_stage(&StageReport::Saved { path: path.clone() });
        info!(output = %path.display(), "sales update completed");

        Ok(path)
    }
}
