//! Reading estimate rows back out of a workbook sheet

use crate::error::{SalesUpdateError, SalesUpdateResult};
use crate::loader::{coerce_currency, coerce_date};
use crate::types::{serial_to_date, CustomerNumber, EstimateRecord};
use chrono::NaiveDate;
use std::collections::HashMap;
use umya_spreadsheet::Worksheet;

pub const CUSTOMER_HEADER: &str = "CustomerNumber";
pub const CLASS_HEADER: &str = "ResidentialOrCommercial";
pub const REQUESTED_HEADER: &str = "EstimateRequestedDate";

/// Estimate rows from one sheet plus what was skipped on the way
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimateSheet {
    pub records: Vec<EstimateRecord>,
    /// Non-blank rows below the header
    pub rows_read: usize,
    /// Rows whose customer number was not numeric
    pub dropped: usize,
    pub has_requested_column: bool,
}

/// Display text of a cell, empty when the cell does not exist
pub fn cell_text(sheet: &Worksheet, col: u32, row: u32) -> String {
    sheet
        .get_cell((col, row))
        .map(|cell| cell.get_value().trim().to_string())
        .unwrap_or_default()
}

/// Dates stored as serial numbers or as text in one of `formats`
pub fn cell_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(serial) => serial_to_date(serial),
        Err(_) => coerce_date(text, formats).ok(),
    }
}

fn find_header(headers: &HashMap<String, u32>, names: &[&str]) -> Option<u32> {
    names.iter().find_map(|name| headers.get(*name).copied())
}

fn optional_text(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Read every estimate row under `header_row`, locating columns by header text
pub fn read_estimates(
    sheet: &Worksheet,
    sheet_name: &str,
    header_row: u32,
    date_formats: &[String],
) -> SalesUpdateResult<EstimateSheet> {
    let last_col = sheet.get_highest_column();
    let last_row = sheet.get_highest_row();

    let headers: HashMap<String, u32> = (1..=last_col)
        .filter_map(|col| {
            let text = cell_text(sheet, col, header_row);
            (!text.is_empty()).then_some((text, col))
        })
        .collect();

    let customer_col = find_header(&headers, &[CUSTOMER_HEADER])
        .ok_or_else(|| SalesUpdateError::missing_column(CUSTOMER_HEADER, format!("sheet '{}'", sheet_name)))?;
    let class_col = find_header(&headers, &[CLASS_HEADER])
        .ok_or_else(|| SalesUpdateError::missing_column(CLASS_HEADER, format!("sheet '{}'", sheet_name)))?;

    let size_col = find_header(&headers, &["CustomerSize"]);
    let branch_col = find_header(&headers, &["BranchNumberOfCustomer"]);
    let program_col = find_header(&headers, &["ProgramCode"]);
    let price_col = find_header(&headers, &["TotalPrice", "TotalPriceFormatted"]);
    let requested_col = find_header(&headers, &[REQUESTED_HEADER]);
    let given_col = find_header(&headers, &["EstimateGivenDate"]);
    let rejected_col = find_header(&headers, &["RejectDate"]);
    let sold_col = find_header(&headers, &["SoldDate"]);
    let cancelled_col = find_header(&headers, &["CancelDate"]);

    let text_at = |col: Option<u32>, row: u32| col.map(|c| cell_text(sheet, c, row)).unwrap_or_default();
    let date_at = |col: Option<u32>, row: u32| cell_date(&text_at(col, row), date_formats);

    let mut result = EstimateSheet {
        has_requested_column: requested_col.is_some(),
        ..EstimateSheet::default()
    };

    for row in (header_row + 1)..=last_row {
        let customer_text = cell_text(sheet, customer_col, row);
        if customer_text.is_empty() {
            continue;
        }
        result.rows_read += 1;

        let Ok(customer) = CustomerNumber::parse(&customer_text) else {
            result.dropped += 1;
            continue;
        };

        result.records.push(EstimateRecord {
            customer,
            size: optional_text(text_at(size_col, row)),
            residential_or_commercial: cell_text(sheet, class_col, row),
            branch: optional_text(text_at(branch_col, row)),
            program_code: optional_text(text_at(program_col, row)),
            price: coerce_currency(&text_at(price_col, row)).ok(),
            requested: date_at(requested_col, row),
            given: date_at(given_col, row),
            rejected: date_at(rejected_col, row),
            sold: date_at(sold_col, row),
            cancelled: date_at(cancelled_col, row),
        });
    }

    Ok(result)
}
