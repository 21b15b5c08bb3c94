use super::Pipeline;
use crate::config::ScoreboardLayout;
use crate::error::{SalesUpdateError, SalesUpdateResult};
use crate::excel::sheet_reader::{read_estimates, REQUESTED_HEADER};
use crate::excel::{write_customer_column, SalesUpdateSession};
use crate::filter;
use crate::loader::load_roster;
use crate::locator;
use crate::types::Col;
use chrono::NaiveDate;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreboardYear {
    Current,
    Prior,
}

impl fmt::Display for ScoreboardYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreboardYear::Current => f.write_str("current-year"),
            ScoreboardYear::Prior => f.write_str("prior-year"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreboardStage {
    pub year: ScoreboardYear,
    pub estimate_sheet: String,
    pub estimate_rows: usize,
    /// Estimate rows skipped because the customer number was not numeric
    pub dropped_rows: usize,
    pub production_csv: String,
    pub production_customers: usize,
    pub cutoff: Option<NaiveDate>,
    pub column: Col,
    pub customers: usize,
}

impl Pipeline<'_> {
    fn scoreboard_layout(&self, year: ScoreboardYear) -> &ScoreboardLayout {
        match year {
            ScoreboardYear::Current => &self.layout().scoreboard.current_year,
            ScoreboardYear::Prior => &self.layout().scoreboard.prior_year,
        }
    }

    /// Stages 3 and 4: residential estimate customers with no production in
    /// the roster year, optionally limited to aged requests, written to the
    /// year's scoreboard column
    pub fn update_scoreboard(
        &self,
        session: &mut SalesUpdateSession,
        year: ScoreboardYear,
    ) -> SalesUpdateResult<ScoreboardStage> {
        let board = &self.layout().scoreboard;
        let year_layout = self.scoreboard_layout(year);

        let roster_path = locator::require_file(self.dir(), &year_layout.production_csv)?;
        let (production, _) = load_roster(&roster_path)?;
        let production: Vec<_> = production.iter().map(|p| p.customer).collect();
        let production_customers = filter::unique(production.iter().copied()).len();

        let estimates = read_estimates(
            session.sheet(&year_layout.estimate_sheet)?,
            &year_layout.estimate_sheet,
            self.layout().estimate_summary.header_row,
            &self.layout().date_formats,
        )?;

        let cutoff = year_layout
            .age_cutoff_days
            .map(|days| filter::age_cutoff(self.today(), days));
        if cutoff.is_some() && !estimates.has_requested_column {
            return Err(SalesUpdateError::missing_column(
                REQUESTED_HEADER,
                format!("sheet '{}'", year_layout.estimate_sheet),
            ));
        }

        let customers = filter::unconverted_residential(&estimates.records, production, cutoff);
        debug!(
            %year,
            residential = estimates.records.iter().filter(|e| e.is_residential()).count(),
            customers = customers.len(),
            ?cutoff,
            "scoreboard computed"
        );

        write_customer_column(session, &board.sheet, year_layout.column, board.start_row, &customers)?;

        Ok(ScoreboardStage {
            year,
            estimate_sheet: year_layout.estimate_sheet.clone(),
            estimate_rows: estimates.rows_read,
            dropped_rows: estimates.dropped,
            production_csv: year_layout.production_csv.clone(),
            production_customers,
            cutoff,
            column: year_layout.column,
            customers: customers.len(),
        })
    }
}
