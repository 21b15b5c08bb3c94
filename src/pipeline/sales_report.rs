use super::Pipeline;
use crate::error::SalesUpdateResult;
use crate::excel::{update_range, write_customer_column, RangeUpdate, SalesUpdateSession};
use crate::filter;
use crate::loader::{load_csv, production_records, LoadReport, LoadSpec};
use crate::locator;
use std::path::PathBuf;

const CUSTOMER_FIELD: &str = "CustomerNumber";

#[derive(Debug, Clone, PartialEq)]
pub struct SalesReportStage {
    pub sales_csv: PathBuf,
    pub sales_load: LoadReport,
    pub production_csv: PathBuf,
    pub production_load: LoadReport,
    /// Total gross sales across the kept production rows
    pub production_gross: f64,
    /// Unique customers in the sales report
    pub sales_customers: usize,
    /// Production customers missing from the sales report
    pub unmatched_customers: usize,
}

impl Pipeline<'_> {
    /// Stage 5: rewrite the sales report sheet from the sales and production
    /// exports, then the customer count cross-check columns
    pub fn update_sales_report(&self, session: &mut SalesUpdateSession) -> SalesUpdateResult<SalesReportStage> {
        let sources = &self.layout().sources;
        let report = &self.layout().sales_report;
        let count = &self.layout().customer_count;

        let sales_csv = locator::find_latest(self.dir(), &sources.sales_report, None)?;
        let sales = load_csv(&sales_csv, &LoadSpec::sales_report())?;

        let production_csv = locator::find_latest(self.dir(), &sources.production, None)?;
        let production = load_csv(&production_csv, &LoadSpec::production())?;

        update_range(
            session,
            &RangeUpdate::new(&report.sheet, report.start_row, &report.sales_columns),
            &sales.table,
        )?;
        update_range(
            session,
            &RangeUpdate::new(&report.sheet, report.start_row, &report.production_columns),
            &production.table,
        )?;

        let sales_customers = filter::unique(sales.table.customers(CUSTOMER_FIELD));
        let produced = production_records(&production.table);
        let production_gross = produced.iter().filter_map(|p| p.gross_sales).sum();
        let unmatched = filter::difference(
            produced.iter().map(|p| p.customer),
            sales_customers.iter().copied(),
        );

        write_customer_column(
            session,
            &count.sheet,
            count.sales_column,
            count.start_row,
            &sales_customers,
        )?;
        write_customer_column(
            session,
            &count.sheet,
            count.unmatched_column,
            count.start_row,
            &unmatched,
        )?;

        Ok(SalesReportStage {
            sales_csv,
            sales_load: sales.report,
            production_csv,
            production_load: production.report,
            production_gross,
            sales_customers: sales_customers.len(),
            unmatched_customers: unmatched.len(),
        })
    }
}
