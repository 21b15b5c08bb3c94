use super::Pipeline;
use crate::error::SalesUpdateResult;
use crate::excel::{update_range, RangeUpdate, SalesUpdateSession, UpdateSummary};
use crate::loader::{load_csv, LoadReport, LoadSpec};
use crate::locator;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateStage {
    pub csv: PathBuf,
    pub sheet: String,
    pub load: LoadReport,
    pub update: UpdateSummary,
}

impl Pipeline<'_> {
    /// Stage 2: load the latest estimate summary export and rewrite the
    /// estimate sheet, keeping its formula columns
    pub fn process_estimates(&self, session: &mut SalesUpdateSession) -> SalesUpdateResult<EstimateStage> {
        let layout = &self.layout().estimate_summary;
        let csv = locator::find_latest(self.dir(), &self.layout().sources.estimate_summary, Some("csv"))?;
        debug!(csv = %csv.display(), "processing estimate summary");

        let loaded = load_csv(&csv, &LoadSpec::estimate_summary(&self.layout().date_formats))?;

        let update = RangeUpdate::new(&layout.sheet, layout.start_row, &layout.columns)
            .with_header_row(layout.header_row)
            .preserving(&layout.preserve);
        let summary = update_range(session, &update, &loaded.table)?;

        Ok(EstimateStage {
            csv,
            sheet: layout.sheet.clone(),
            load: loaded.report,
            update: summary,
        })
    }
}
