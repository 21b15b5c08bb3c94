//! CSV export loading
//!
//! Loads a fixed subset of columns, coerces each cell to its declared kind and
//! drops rows whose required cells are missing or invalid. Nothing here fails on
//! bad data: failures are counted per column in the [`LoadReport`].

use crate::error::{CoercionError, CoercionKind, SalesUpdateError, SalesUpdateResult};
use crate::types::{CellValue, CustomerNumber, ProductionRecord, Table};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// How a column's raw text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Customer,
    Currency,
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub required: bool,
}

impl ColumnSpec {
    pub fn required(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }
}

/// Row filter applied after coercion
#[derive(Debug, Clone, PartialEq)]
pub enum RowFilter {
    /// Drop rows where the column equals zero
    NonZero(String),
    /// Keep rows where the column is strictly greater than zero
    Positive(String),
}

impl RowFilter {
    fn column(&self) -> &str {
        match self {
            RowFilter::NonZero(c) | RowFilter::Positive(c) => c,
        }
    }

    fn keeps(&self, value: &CellValue) -> bool {
        match (self, value.as_f64()) {
            (RowFilter::NonZero(_), Some(n)) => n != 0.0,
            (RowFilter::Positive(_), Some(n)) => n > 0.0,
            (_, None) => false,
        }
    }
}

/// What to load from a CSV export
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSpec {
    pub columns: Vec<ColumnSpec>,
    pub filter: Option<RowFilter>,
    pub date_formats: Vec<String>,
}

impl LoadSpec {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            filter: None,
            date_formats: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_date_formats(mut self, formats: &[String]) -> Self {
        self.date_formats = formats.to_vec();
        self
    }

    /// Estimate summary export: price must be a positive amount, dates and
    /// descriptive fields may be blank
    pub fn estimate_summary(date_formats: &[String]) -> Self {
        use ColumnKind::*;
        Self::new(vec![
            ColumnSpec::required("CustomerNumber", Customer),
            ColumnSpec::optional("CustomerSize", Text),
            ColumnSpec::optional("ResidentialOrCommercial", Text),
            ColumnSpec::optional("BranchNumberOfCustomer", Text),
            ColumnSpec::optional("ProgramCode", Text),
            ColumnSpec::required("TotalPriceFormatted", Currency),
            ColumnSpec::optional("EstimateRequestedDate", Date),
            ColumnSpec::optional("EstimateGivenDate", Date),
            ColumnSpec::optional("RejectDate", Date),
            ColumnSpec::optional("SoldDate", Date),
            ColumnSpec::optional("CancelDate", Date),
        ])
        .with_filter(RowFilter::Positive("TotalPriceFormatted".to_string()))
        .with_date_formats(date_formats)
    }

    /// Updated sales report export; rows with a zero total are dropped
    pub fn sales_report() -> Self {
        Self::new(vec![
            ColumnSpec::required("CustomerNumber", ColumnKind::Customer),
            ColumnSpec::optional("BranchNumberOfCustomer", ColumnKind::Text),
            ColumnSpec::required("TotalPrice", ColumnKind::Currency),
        ])
        .with_filter(RowFilter::NonZero("TotalPrice".to_string()))
    }

    /// Production by technician export; rows with zero gross sales are dropped
    pub fn production() -> Self {
        Self::new(vec![
            ColumnSpec::required("CustomerNumber", ColumnKind::Customer),
            ColumnSpec::optional("BranchNumberOfCustomer", ColumnKind::Text),
            ColumnSpec::required("GrossSalesAmount", ColumnKind::Currency),
        ])
        .with_filter(RowFilter::NonZero("GrossSalesAmount".to_string()))
    }

    /// Prior-year production roster; only the customer number matters
    pub fn roster() -> Self {
        Self::new(vec![ColumnSpec::required("CustomerNumber", ColumnKind::Customer)])
    }
}

/// Row accounting for one load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows dropped because a required column was blank or invalid
    pub dropped: BTreeMap<String, usize>,
    /// Optional cells blanked because their content was invalid
    pub blanked: BTreeMap<String, usize>,
    /// Rows removed by the zero/positive filter
    pub filtered: usize,
}

impl LoadReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_kept
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub table: Table,
    pub report: LoadReport,
}

//==============================================================================
// Cell coercion
//==============================================================================

/// Parse a currency amount such as `$1,200.50`, `-$3.00` or `($12.50)`
pub fn coerce_currency(raw: &str) -> Result<f64, CoercionError> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    let value = cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CoercionError::new(CoercionKind::Currency, raw))?;

    Ok(if negative { -value } else { value })
}

/// Parse a date with the first matching format. A trailing time component
/// (`01/02/2024 10:30 AM`) is ignored.
pub fn coerce_date(raw: &str, formats: &[String]) -> Result<NaiveDate, CoercionError> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(trimmed);

    for candidate in [trimmed, date_part] {
        for format in formats {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, format) {
                return Ok(date);
            }
        }
    }

    Err(CoercionError::new(CoercionKind::Date, raw))
}

/// Coerce one raw cell. Blank input is `Empty`, never an error.
pub fn coerce_cell(raw: &str, kind: ColumnKind, date_formats: &[String]) -> Result<CellValue, CoercionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(CellValue::Empty);
    }

    match kind {
        ColumnKind::Text => Ok(CellValue::Text(trimmed.to_string())),
        ColumnKind::Customer => CustomerNumber::parse(trimmed).map(CellValue::from),
        ColumnKind::Currency => coerce_currency(trimmed).map(CellValue::Currency),
        ColumnKind::Date => coerce_date(trimmed, date_formats).map(CellValue::Date),
    }
}

//==============================================================================
// Loading
//==============================================================================

/// Load the requested columns of a CSV export.
///
/// Fails only when the file cannot be read or a requested column is missing
/// from the header; bad cells are dropped or blanked and counted.
pub fn load_csv(path: &Path, spec: &LoadSpec) -> SalesUpdateResult<LoadedTable> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let positions: Vec<usize> = spec
        .columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == &column.name)
                .ok_or_else(|| SalesUpdateError::missing_column(&column.name, &source_name))
        })
        .collect::<SalesUpdateResult<_>>()?;

    let filter_idx = match &spec.filter {
        Some(filter) => Some(
            spec.columns
                .iter()
                .position(|c| c.name == filter.column())
                .ok_or_else(|| SalesUpdateError::missing_column(filter.column(), &source_name))?,
        ),
        None => None,
    };

    let mut table = Table::new(spec.columns.iter().map(|c| c.name.clone()).collect());
    let mut report = LoadReport::default();

    for record in reader.records() {
        let record = record?;
        report.rows_read += 1;

        let mut row = Vec::with_capacity(spec.columns.len());
        let mut drop_reason: Option<&str> = None;

        for (column, &pos) in spec.columns.iter().zip(&positions) {
            let raw = record.get(pos).unwrap_or("");
            let value = match coerce_cell(raw, column.kind, &spec.date_formats) {
                Ok(value) => value,
                Err(e) => {
                    debug!(column = %column.name, row = report.rows_read, error = %e, "coercion failed");
                    if !column.required {
                        *report.blanked.entry(column.name.clone()).or_default() += 1;
                    }
                    CellValue::Empty
                }
            };

            if column.required && value.is_empty() && drop_reason.is_none() {
                drop_reason = Some(&column.name);
            }
            row.push(value);
        }

        if let Some(column) = drop_reason {
            *report.dropped.entry(column.to_string()).or_default() += 1;
            continue;
        }

        if let (Some(filter), Some(idx)) = (&spec.filter, filter_idx) {
            if !filter.keeps(&row[idx]) {
                report.filtered += 1;
                continue;
            }
        }

        table.push_row(row);
    }

    report.rows_kept = table.row_count();
    debug!(
        file = %source_name,
        read = report.rows_read,
        kept = report.rows_kept,
        "csv loaded"
    );

    Ok(LoadedTable { table, report })
}

/// Production records of a loaded production or roster table. Gross sales
/// are filled in when the table carries `GrossSalesAmount`.
pub fn production_records(table: &Table) -> Vec<ProductionRecord> {
    let Some(customer_idx) = table.column_index("CustomerNumber") else {
        return Vec::new();
    };
    let gross_idx = table.column_index("GrossSalesAmount");

    table
        .rows
        .iter()
        .filter_map(|row| {
            Some(ProductionRecord {
                customer: row[customer_idx].as_customer()?,
                gross_sales: gross_idx.and_then(|i| row[i].as_f64()),
            })
        })
        .collect()
}

/// A prior-year production roster such as `2023_pbt.csv`
pub fn load_roster(path: &Path) -> SalesUpdateResult<(Vec<ProductionRecord>, LoadReport)> {
    let loaded = load_csv(path, &LoadSpec::roster())?;
    Ok((production_records(&loaded.table), loaded.report))
}
