//! Clear-and-rewrite of worksheet column ranges
//!
//! A range update clears the bound columns from the start row down to the
//! sheet's current last row, then writes the replacement table in their place.
//! Formula columns listed in `preserve` are snapshotted before anything is
//! cleared and written back verbatim afterwards.

use crate::config::ColumnBinding;
use crate::error::{SalesUpdateError, SalesUpdateResult};
use crate::excel::session::SalesUpdateSession;
use crate::types::{
    date_to_serial, CellValue, Col, CustomerNumber, Table, CURRENCY_FORMAT, DATE_FORMAT,
};
use tracing::debug;
use umya_spreadsheet::{Cell, Worksheet};

/// One clear-and-rewrite against one sheet
#[derive(Debug, Clone)]
pub struct RangeUpdate<'a> {
    pub sheet: &'a str,
    pub start_row: u32,
    /// Row that receives the binding headers, if any
    pub header_row: Option<u32>,
    pub columns: &'a [ColumnBinding],
    pub preserve: &'a [Col],
}

impl<'a> RangeUpdate<'a> {
    pub fn new(sheet: &'a str, start_row: u32, columns: &'a [ColumnBinding]) -> Self {
        Self {
            sheet,
            start_row,
            header_row: None,
            columns,
            preserve: &[],
        }
    }

    pub fn with_header_row(mut self, row: u32) -> Self {
        self.header_row = Some(row);
        self
    }

    pub fn preserving(mut self, columns: &'a [Col]) -> Self {
        self.preserve = columns;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub rows_written: usize,
    /// Last row of the sheet before the update
    pub previous_last_row: u32,
    pub preserved_cells: usize,
}

/// Snapshot of one preserved column: every existing cell, by row
struct PreservedColumn {
    col: Col,
    cells: Vec<(u32, Cell)>,
}

fn snapshot(sheet: &Worksheet, col: Col, last_row: u32) -> PreservedColumn {
    let cells = (1..=last_row)
        .filter_map(|row| sheet.get_cell((col.index(), row)).map(|cell| (row, cell.clone())))
        .collect();
    PreservedColumn { col, cells }
}

fn restore(sheet: &mut Worksheet, preserved: &PreservedColumn) -> usize {
    for (row, cell) in &preserved.cells {
        *sheet.get_cell_mut((preserved.col.index(), *row)) = cell.clone();
    }
    preserved.cells.len()
}

/// Blank the cells of one column from `start_row` to `last_row`
pub fn clear_column(sheet: &mut Worksheet, col: Col, start_row: u32, last_row: u32) {
    for row in start_row..=last_row {
        if sheet.get_cell((col.index(), row)).is_some() {
            sheet.get_cell_mut((col.index(), row)).set_value("");
        }
    }
}

/// Write one typed value, applying the currency or date number format
pub fn write_cell(sheet: &mut Worksheet, col: Col, row: u32, value: &CellValue) {
    let coordinate = (col.index(), row);
    match value {
        CellValue::Empty => {
            if sheet.get_cell(coordinate).is_some() {
                sheet.get_cell_mut(coordinate).set_value("");
            }
        }
        CellValue::Text(s) => {
            sheet.get_cell_mut(coordinate).set_value_string(s.as_str());
        }
        CellValue::Integer(i) => {
            sheet.get_cell_mut(coordinate).set_value_number(*i as f64);
        }
        CellValue::Number(n) => {
            sheet.get_cell_mut(coordinate).set_value_number(*n);
        }
        CellValue::Currency(n) => {
            let cell = sheet.get_cell_mut(coordinate);
            cell.set_value_number(*n);
            cell.get_style_mut()
                .get_number_format_mut()
                .set_format_code(CURRENCY_FORMAT);
        }
        CellValue::Date(d) => {
            let cell = sheet.get_cell_mut(coordinate);
            cell.set_value_number(date_to_serial(*d));
            cell.get_style_mut()
                .get_number_format_mut()
                .set_format_code(DATE_FORMAT);
        }
    }
}

/// Clear the bound columns and write `table` into them.
///
/// Bindings are checked against the table and the preserve list before any
/// cell changes, so a mismatch leaves the sheet untouched.
pub fn update_range(
    session: &mut SalesUpdateSession,
    update: &RangeUpdate<'_>,
    table: &Table,
) -> SalesUpdateResult<UpdateSummary> {
    let sheet = session.sheet_mut(update.sheet)?;

    let mut bound = Vec::with_capacity(update.columns.len());
    for binding in update.columns {
        if update.preserve.contains(&binding.column) {
            return Err(SalesUpdateError::Config(format!(
                "column {} of '{}' is both written and preserved",
                binding.column, update.sheet
            )));
        }
        let idx = table
            .column_index(&binding.field)
            .ok_or_else(|| {
                SalesUpdateError::missing_column(&binding.field, format!("data for '{}'", update.sheet))
            })?;
        bound.push((binding, idx));
    }

    let last_row = sheet.get_highest_row();
    let mut preserved = Vec::with_capacity(update.preserve.len());
    for col in update.preserve {
        preserved.push(snapshot(sheet, *col, last_row));
    }

    for (binding, _) in &bound {
        clear_column(sheet, binding.column, update.start_row, last_row);
    }

    if let Some(header_row) = update.header_row {
        for (binding, _) in &bound {
            sheet
                .get_cell_mut((binding.column.index(), header_row))
                .set_value_string(binding.header_text());
        }
    }

    for (offset, row) in table.rows.iter().enumerate() {
        let row_num = update.start_row + offset as u32;
        for (binding, idx) in &bound {
            write_cell(sheet, binding.column, row_num, &row[*idx]);
        }
    }

    let mut preserved_cells = 0;
    for column in &preserved {
        preserved_cells += restore(sheet, column);
    }

    debug!(
        sheet = update.sheet,
        rows = table.row_count(),
        previous_last_row = last_row,
        preserved_cells,
        "range updated"
    );

    Ok(UpdateSummary {
        rows_written: table.row_count(),
        previous_last_row: last_row,
        preserved_cells,
    })
}

/// Replace one column with a list of customer numbers, one per row
pub fn write_customer_column(
    session: &mut SalesUpdateSession,
    sheet_name: &str,
    col: Col,
    start_row: u32,
    customers: &[CustomerNumber],
) -> SalesUpdateResult<UpdateSummary> {
    let sheet = session.sheet_mut(sheet_name)?;
    let last_row = sheet.get_highest_row();

    clear_column(sheet, col, start_row, last_row);
    for (offset, customer) in customers.iter().enumerate() {
        write_cell(sheet, col, start_row + offset as u32, &CellValue::from(*customer));
    }

    debug!(
        sheet = sheet_name,
        column = %col,
        customers = customers.len(),
        "customer column written"
    );

    Ok(UpdateSummary {
        rows_written: customers.len(),
        previous_last_row: last_row,
        preserved_cells: 0,
    })
}
