use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoercionError, CoercionKind, SalesUpdateError};

//==============================================================================
// Column references
//==============================================================================

/// A 1-based worksheet column index.
///
/// Layout files spell columns as letters (`A`, `O`, `AA`); they are parsed once
/// into this index so no stage does character arithmetic on letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Col(u32);

impl Col {
    /// Largest column Excel supports (XFD)
    pub const MAX: u32 = 16_384;

    pub fn new(index: u32) -> Option<Self> {
        (1..=Self::MAX).contains(&index).then_some(Col(index))
    }

    /// 1-based index, as umya-spreadsheet addresses columns
    pub fn index(self) -> u32 {
        self.0
    }

    /// 0-based index, as calamine and rust_xlsxwriter address columns
    pub fn offset(self) -> u32 {
        self.0 - 1
    }

    /// Column letters
    ///
    /// Examples:
    /// - 1 → A
    /// - 26 → Z
    /// - 27 → AA
    pub fn letters(self) -> String {
        let mut result = String::new();
        let mut idx = self.0 - 1;

        loop {
            let remainder = idx % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if idx < 26 {
                break;
            }
            idx = idx / 26 - 1;
        }

        result
    }
}

impl FromStr for Col {
    type Err = SalesUpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letters = s.trim();
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SalesUpdateError::InvalidColumn(s.to_string()));
        }

        let mut index: u32 = 0;
        for c in letters.chars() {
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
            index = index
                .checked_mul(26)
                .and_then(|i| i.checked_add(digit))
                .ok_or_else(|| SalesUpdateError::InvalidColumn(s.to_string()))?;
        }

        Col::new(index).ok_or_else(|| SalesUpdateError::InvalidColumn(s.to_string()))
    }
}

impl TryFrom<String> for Col {
    type Error = SalesUpdateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Col> for String {
    fn from(col: Col) -> Self {
        col.letters()
    }
}

impl fmt::Display for Col {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

//==============================================================================
// Customer numbers
//==============================================================================

/// The join key shared by every export and sheet.
///
/// Sources mix `"100"`, `"100.0"` and numeric cells; all coerce to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomerNumber(pub i64);

impl CustomerNumber {
    pub fn parse(raw: &str) -> Result<Self, CoercionError> {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(CustomerNumber(n));
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Self::from_f64)
            .ok_or_else(|| CoercionError::new(CoercionKind::Customer, raw))
    }

    pub fn from_f64(n: f64) -> Option<Self> {
        (n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15).then(|| CustomerNumber(n as i64))
    }
}

impl fmt::Display for CustomerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//==============================================================================
// Cell values and tables
//==============================================================================

/// Number format applied to monetary cells
pub const CURRENCY_FORMAT: &str = "\"$\"#,##0.00";

/// Number format applied to date cells
pub const DATE_FORMAT: &str = "mm-dd-yyyy";

/// Typed cell content flowing from the loader into the range updater
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Currency(f64),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Number(n) | CellValue::Currency(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_customer(&self) -> Option<CustomerNumber> {
        match self {
            CellValue::Integer(i) => Some(CustomerNumber(*i)),
            CellValue::Number(n) => CustomerNumber::from_f64(*n),
            CellValue::Text(s) => CustomerNumber::parse(s).ok(),
            _ => None,
        }
    }
}

impl From<CustomerNumber> for CellValue {
    fn from(customer: CustomerNumber) -> Self {
        CellValue::Integer(customer.0)
    }
}

fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Excel serial day number for a date (1900 date system)
pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

/// Date for an Excel serial day number; any time-of-day fraction is dropped
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    excel_epoch().checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// An in-memory table: ordered column names plus typed rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Values of one column, top to bottom
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Every coercible customer number in a column, in row order
    pub fn customers(&self, name: &str) -> Vec<CustomerNumber> {
        self.column_values(name)
            .map(|values| values.filter_map(CellValue::as_customer).collect())
            .unwrap_or_default()
    }
}

//==============================================================================
// Domain records
//==============================================================================

/// One estimate lifecycle row, as read back from an estimate summary sheet
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRecord {
    pub customer: CustomerNumber,
    pub size: Option<String>,
    pub residential_or_commercial: String,
    pub branch: Option<String>,
    pub program_code: Option<String>,
    pub price: Option<f64>,
    pub requested: Option<NaiveDate>,
    pub given: Option<NaiveDate>,
    pub rejected: Option<NaiveDate>,
    pub sold: Option<NaiveDate>,
    pub cancelled: Option<NaiveDate>,
}

impl EstimateRecord {
    pub fn new(customer: CustomerNumber, residential_or_commercial: impl Into<String>) -> Self {
        Self {
            customer,
            size: None,
            residential_or_commercial: residential_or_commercial.into(),
            branch: None,
            program_code: None,
            price: None,
            requested: None,
            given: None,
            rejected: None,
            sold: None,
            cancelled: None,
        }
    }

    pub fn with_requested(mut self, date: NaiveDate) -> Self {
        self.requested = Some(date);
        self
    }

    pub fn is_residential(&self) -> bool {
        self.residential_or_commercial.trim().eq_ignore_ascii_case("R")
    }
}

/// A customer with completed production in some period
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRecord {
    pub customer: CustomerNumber,
    pub gross_sales: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letters() {
        assert_eq!(Col::new(1).unwrap().letters(), "A");
        assert_eq!(Col::new(2).unwrap().letters(), "B");
        assert_eq!(Col::new(26).unwrap().letters(), "Z");
        assert_eq!(Col::new(27).unwrap().letters(), "AA");
        assert_eq!(Col::new(28).unwrap().letters(), "AB");
        assert_eq!(Col::new(702).unwrap().letters(), "ZZ");
    }

    #[test]
    fn test_col_parse() {
        assert_eq!("A".parse::<Col>().unwrap().index(), 1);
        assert_eq!("o".parse::<Col>().unwrap().index(), 15);
        assert_eq!("AA".parse::<Col>().unwrap().index(), 27);
        assert_eq!("XFD".parse::<Col>().unwrap().index(), Col::MAX);
        assert!("".parse::<Col>().is_err());
        assert!("A1".parse::<Col>().is_err());
        assert!("XFE".parse::<Col>().is_err());
    }

    #[test]
    fn test_customer_number_parse() {
        assert_eq!(CustomerNumber::parse("100").unwrap(), CustomerNumber(100));
        assert_eq!(CustomerNumber::parse(" 100.0 ").unwrap(), CustomerNumber(100));
        assert!(CustomerNumber::parse("100.5").is_err());
        assert!(CustomerNumber::parse("N/A").is_err());
        assert!(CustomerNumber::parse("").is_err());
    }

    #[test]
    fn test_serial_round_trip_known_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date_to_serial(d), 45292.0);
        assert_eq!(serial_to_date(45292.75), Some(d));
        assert_eq!(serial_to_date(0.0), None);
    }

    #[test]
    fn test_table_customers_skips_non_numeric() {
        let mut table = Table::new(vec!["CustomerNumber".to_string()]);
        table.push_row(vec![CellValue::Integer(10)]);
        table.push_row(vec![CellValue::Text("abc".to_string())]);
        table.push_row(vec![CellValue::Number(30.0)]);
        assert_eq!(
            table.customers("CustomerNumber"),
            vec![CustomerNumber(10), CustomerNumber(30)]
        );
        assert!(table.customers("Missing").is_empty());
    }

    #[test]
    fn test_residential_flag() {
        assert!(EstimateRecord::new(CustomerNumber(1), " r ").is_residential());
        assert!(!EstimateRecord::new(CustomerNumber(1), "C").is_residential());
        assert!(!EstimateRecord::new(CustomerNumber(1), "").is_residential());
    }
}
