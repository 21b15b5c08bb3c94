//! Blank Sales Update workbook generation
//!
//! Produces a workbook with every sheet, header row and formula column the
//! layout expects. Used to bootstrap a new reporting directory.

use crate::config::{ColumnBinding, Layout};
use crate::error::SalesUpdateResult;
use crate::types::Col;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

/// Rows pre-filled with formulas in each preserved estimate column
pub const TEMPLATE_FORMULA_ROWS: u32 = 500;

/// Last row referenced by the summary formulas
const SUMMARY_LAST_ROW: u32 = 5000;

fn column_of(bindings: &[ColumnBinding], field: &str) -> Option<Col> {
    bindings.iter().find(|b| b.field == field).map(|b| b.column)
}

/// Header and per-row formula for the n-th preserved estimate column
fn estimate_formula(index: usize, bindings: &[ColumnBinding], row: u32) -> (String, String) {
    let class = column_of(bindings, "ResidentialOrCommercial");
    let requested = column_of(bindings, "EstimateRequestedDate");
    let sold = column_of(bindings, "SoldDate");
    let customer = column_of(bindings, "CustomerNumber");

    match (index, class, requested, sold, customer) {
        (0, Some(c), _, _, _) => (
            "Segment".to_string(),
            format!("=IF({c}{row}=\"\",\"\",IF({c}{row}=\"R\",\"Residential\",\"Commercial\"))"),
        ),
        (1, _, Some(r), Some(s), _) => (
            "DaysToSell".to_string(),
            format!("=IF(OR({r}{row}=\"\",{s}{row}=\"\"),\"\",{s}{row}-{r}{row})"),
        ),
        (2, _, Some(r), _, _) => (
            "RequestYear".to_string(),
            format!("=IF({r}{row}=\"\",\"\",YEAR({r}{row}))"),
        ),
        (3, _, Some(r), _, _) => (
            "RequestMonth".to_string(),
            format!("=IF({r}{row}=\"\",\"\",MONTH({r}{row}))"),
        ),
        (4, _, _, Some(s), _) => (
            "Status".to_string(),
            format!("=IF({s}{row}=\"\",\"Open\",\"Sold\")"),
        ),
        (_, _, _, _, Some(a)) => (
            "Present".to_string(),
            format!("=IF({a}{row}=\"\",0,1)"),
        ),
        _ => ("Row".to_string(), "=ROW()".to_string()),
    }
}

fn write_estimate_sheet(
    worksheet: &mut Worksheet,
    layout: &Layout,
    with_formulas: bool,
    bold: &Format,
) -> SalesUpdateResult<()> {
    let estimate = &layout.estimate_summary;
    let header_row = estimate.header_row - 1;

    for binding in &estimate.columns {
        worksheet.write_string_with_format(
            header_row,
            binding.column.offset() as u16,
            binding.header_text(),
            bold,
        )?;
    }

    for (index, col) in estimate.preserve.iter().enumerate() {
        let (header, _) = estimate_formula(index, &estimate.columns, estimate.start_row);
        worksheet.write_string_with_format(header_row, col.offset() as u16, &header, bold)?;
        if !with_formulas {
            continue;
        }
        for row in estimate.start_row..estimate.start_row + TEMPLATE_FORMULA_ROWS {
            let (_, formula) = estimate_formula(index, &estimate.columns, row);
            worksheet.write_formula(row - 1, col.offset() as u16, formula.as_str())?;
        }
    }

    Ok(())
}

fn write_titled_column(
    worksheet: &mut Worksheet,
    col: Col,
    start_row: u32,
    title: &str,
    summary: &str,
    bold: &Format,
) -> SalesUpdateResult<()> {
    // Title directly above the data, summary formula above the title
    if start_row >= 2 {
        worksheet.write_string_with_format(start_row - 2, col.offset() as u16, title, bold)?;
    }
    if start_row >= 3 {
        let formula = format!("={}({}{}:{}{})", summary, col, start_row, col, SUMMARY_LAST_ROW);
        worksheet.write_formula(start_row - 3, col.offset() as u16, formula.as_str())?;
    }
    Ok(())
}

/// Write a blank workbook matching `layout` to `path`
pub fn write_template(path: &Path, layout: &Layout) -> SalesUpdateResult<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for name in layout.required_sheets() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;

        if name == layout.estimate_summary.sheet {
            write_estimate_sheet(worksheet, layout, true, &bold)?;
        } else if name == layout.scoreboard.current_year.estimate_sheet
            || name == layout.scoreboard.prior_year.estimate_sheet
        {
            write_estimate_sheet(worksheet, layout, false, &bold)?;
        }

        let scoreboard = &layout.scoreboard;
        if name == scoreboard.sheet {
            worksheet.write_string_with_format(0, 0, "Scoreboard", &bold)?;
            for (layout_year, title) in [
                (&scoreboard.current_year, "Unconverted Residential"),
                (&scoreboard.prior_year, "Aged Unconverted Residential"),
            ] {
                write_titled_column(
                    worksheet,
                    layout_year.column,
                    scoreboard.start_row,
                    title,
                    "COUNT",
                    &bold,
                )?;
            }
        }

        let report = &layout.sales_report;
        if name == report.sheet {
            for binding in report.sales_columns.iter().chain(&report.production_columns) {
                let summary = if binding.field.contains("Price") || binding.field.contains("Amount") {
                    "SUM"
                } else {
                    "COUNT"
                };
                write_titled_column(
                    worksheet,
                    binding.column,
                    report.start_row,
                    binding.header_text(),
                    summary,
                    &bold,
                )?;
            }
        }

        let count = &layout.customer_count;
        if name == count.sheet {
            write_titled_column(
                worksheet,
                count.sales_column,
                count.start_row,
                "Sales Report Customers",
                "COUNT",
                &bold,
            )?;
            write_titled_column(
                worksheet,
                count.unmatched_column,
                count.start_row,
                "Production Not In Sales Report",
                "COUNT",
                &bold,
            )?;
        }
    }

    workbook.save(path)?;
    Ok(())
}
