//! Workbook access
//!
//! - Session: the one in-memory workbook a run mutates and saves (umya-spreadsheet)
//! - Updater: clear-and-rewrite of column ranges, keeping formula columns
//! - Inspector: read-only layout check (calamine)
//! - Template: blank workbook generation (rust_xlsxwriter)

mod inspector;
mod session;
pub mod sheet_reader;
mod template;
mod updater;

pub use inspector::{inspect_workbook, FormulaColumn, InspectionReport, SheetExtent};
pub use session::{dated_file_name, SalesUpdateSession};
pub use template::{write_template, TEMPLATE_FORMULA_ROWS};
pub use updater::{clear_column, update_range, write_cell, write_customer_column, RangeUpdate, UpdateSummary};
