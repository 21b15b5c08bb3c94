//! Read-only check of a workbook against the layout
//!
//! Uses calamine so the workbook is only ever read; `check` must never change
//! the file it looks at.

use crate::config::Layout;
use crate::error::SalesUpdateResult;
use crate::types::Col;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::path::{Path, PathBuf};

/// A formula column and how many of its data cells still hold formulas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaColumn {
    pub sheet: String,
    pub column: Col,
    pub formulas: usize,
}

/// Last used row of a sheet (1-based, 0 when empty)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetExtent {
    pub sheet: String,
    pub last_row: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionReport {
    pub path: PathBuf,
    pub missing_sheets: Vec<String>,
    pub extents: Vec<SheetExtent>,
    pub formula_columns: Vec<FormulaColumn>,
}

impl InspectionReport {
    pub fn is_ok(&self) -> bool {
        self.missing_sheets.is_empty()
    }

    /// Preserved columns that no longer hold a single formula
    pub fn empty_formula_columns(&self) -> impl Iterator<Item = &FormulaColumn> {
        self.formula_columns.iter().filter(|c| c.formulas == 0)
    }
}

fn last_row(range: &Range<Data>) -> u32 {
    range.end().map(|(row, _)| row + 1).unwrap_or(0)
}

/// Count non-empty formulas in one column at or below `start_row` (1-based)
fn count_formulas(formulas: &Range<String>, col: Col, start_row: u32) -> usize {
    let Some((_, end)) = formulas.start().zip(formulas.end()) else {
        return 0;
    };
    (start_row.saturating_sub(1)..=end.0)
        .filter(|row| {
            formulas
                .get_value((*row, col.offset()))
                .is_some_and(|f| !f.is_empty())
        })
        .count()
}

/// Inspect a workbook without modifying it
pub fn inspect_workbook(path: &Path, layout: &Layout) -> SalesUpdateResult<InspectionReport> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names();

    let mut report = InspectionReport {
        path: path.to_path_buf(),
        missing_sheets: Vec::new(),
        extents: Vec::new(),
        formula_columns: Vec::new(),
    };

    for name in layout.required_sheets() {
        if !sheet_names.iter().any(|s| s == name) {
            report.missing_sheets.push(name.to_string());
            continue;
        }
        let range = workbook.worksheet_range(name)?;
        report.extents.push(SheetExtent {
            sheet: name.to_string(),
            last_row: last_row(&range),
        });
    }

    let estimate = &layout.estimate_summary;
    if sheet_names.iter().any(|s| *s == estimate.sheet) {
        let formulas = workbook.worksheet_formula(&estimate.sheet)?;
        for col in &estimate.preserve {
            report.formula_columns.push(FormulaColumn {
                sheet: estimate.sheet.clone(),
                column: *col,
                formulas: count_formulas(&formulas, *col, estimate.start_row),
            });
        }
    }

    Ok(report)
}
