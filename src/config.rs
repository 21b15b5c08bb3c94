//! Workbook layout configuration
//!
//! The Sales Update workbook is a contract: sheet names, the columns each stage
//! writes, the columns that hold formulas, and the row where data starts. The
//! defaults here describe the production workbook. A YAML file can override any
//! part of it; missing keys fall back to the defaults.

use crate::error::{SalesUpdateError, SalesUpdateResult};
use crate::types::Col;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "sales-update.yaml";

fn col(letters: &str) -> Col {
    letters.parse().unwrap_or_else(|_| panic!("invalid built-in column {letters}"))
}

fn cols(letters: &[&str]) -> Vec<Col> {
    letters.iter().map(|l| col(l)).collect()
}

/// One spreadsheet column fed from one table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub column: Col,
    pub field: String,
    /// Header text written above the data when the target writes a header row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl ColumnBinding {
    /// Binding for a user-supplied column reference such as `"G"`
    pub fn parse(column: &str, field: &str) -> SalesUpdateResult<Self> {
        Ok(Self {
            column: column.parse()?,
            field: field.to_string(),
            header: None,
        })
    }

    /// Binding for a built-in default; the letters must be valid
    pub(crate) fn new(column: &str, field: &str) -> Self {
        Self {
            column: col(column),
            field: field.to_string(),
            header: None,
        }
    }

    pub fn with_header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    pub fn header_text(&self) -> &str {
        self.header.as_deref().unwrap_or(&self.field)
    }
}

/// Where the estimate summary CSV lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateSheetLayout {
    pub sheet: String,
    pub header_row: u32,
    pub start_row: u32,
    pub columns: Vec<ColumnBinding>,
    pub preserve: Vec<Col>,
}

impl Default for EstimateSheetLayout {
    fn default() -> Self {
        Self {
            sheet: "2024 Estimate Summary".to_string(),
            header_row: 1,
            start_row: 2,
            columns: vec![
                ColumnBinding::new("A", "CustomerNumber"),
                ColumnBinding::new("B", "CustomerSize"),
                ColumnBinding::new("C", "ResidentialOrCommercial"),
                ColumnBinding::new("D", "BranchNumberOfCustomer"),
                ColumnBinding::new("E", "ProgramCode"),
                ColumnBinding::new("G", "TotalPriceFormatted").with_header("TotalPrice"),
                ColumnBinding::new("H", "EstimateRequestedDate"),
                ColumnBinding::new("I", "EstimateGivenDate"),
                ColumnBinding::new("J", "RejectDate"),
                ColumnBinding::new("K", "SoldDate"),
                ColumnBinding::new("L", "CancelDate"),
            ],
            preserve: cols(&["F", "M", "N", "O", "P"]),
        }
    }
}

/// One scoreboard column rebuilt from an estimate sheet and a production roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardLayout {
    pub estimate_sheet: String,
    pub production_csv: String,
    pub column: Col,
    /// Only keep estimates requested at least this many days ago
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_cutoff_days: Option<i64>,
}

impl ScoreboardLayout {
    pub fn current_year() -> Self {
        Self {
            estimate_sheet: "2024 Estimate Summary".to_string(),
            production_csv: "2023_pbt.csv".to_string(),
            column: col("C"),
            age_cutoff_days: None,
        }
    }

    pub fn prior_year() -> Self {
        Self {
            estimate_sheet: "2023 Estimate Summary".to_string(),
            production_csv: "2022_pbt.csv".to_string(),
            column: col("O"),
            age_cutoff_days: Some(367),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreboardSheetLayout {
    pub sheet: String,
    pub start_row: u32,
    pub current_year: ScoreboardLayout,
    pub prior_year: ScoreboardLayout,
}

impl Default for ScoreboardSheetLayout {
    fn default() -> Self {
        Self {
            sheet: "Scoreboard".to_string(),
            start_row: 4,
            current_year: ScoreboardLayout::current_year(),
            prior_year: ScoreboardLayout::prior_year(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesReportLayout {
    pub sheet: String,
    pub start_row: u32,
    pub sales_columns: Vec<ColumnBinding>,
    pub production_columns: Vec<ColumnBinding>,
}

impl Default for SalesReportLayout {
    fn default() -> Self {
        Self {
            sheet: "Updated Sales Report".to_string(),
            start_row: 5,
            sales_columns: vec![
                ColumnBinding::new("C", "CustomerNumber"),
                ColumnBinding::new("D", "BranchNumberOfCustomer"),
                ColumnBinding::new("E", "TotalPrice"),
            ],
            production_columns: vec![
                ColumnBinding::new("H", "CustomerNumber"),
                ColumnBinding::new("I", "BranchNumberOfCustomer"),
                ColumnBinding::new("J", "GrossSalesAmount"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerCountLayout {
    pub sheet: String,
    pub start_row: u32,
    /// Unique customers in the sales report
    pub sales_column: Col,
    /// Production customers missing from the sales report
    pub unmatched_column: Col,
}

impl Default for CustomerCountLayout {
    fn default() -> Self {
        Self {
            sheet: "Customer Count".to_string(),
            start_row: 4,
            sales_column: col("C"),
            unmatched_column: col("H"),
        }
    }
}

/// Name fragments used to find the exports in the working directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePatterns {
    pub workbook: String,
    pub estimate_summary: String,
    pub sales_report: String,
    pub production: String,
}

impl Default for SourcePatterns {
    fn default() -> Self {
        Self {
            workbook: "Sales Update".to_string(),
            estimate_summary: "EstimateSummary".to_string(),
            sales_report: "Updated_Sales_Report".to_string(),
            production: "Production_By_Technician".to_string(),
        }
    }
}

/// The whole workbook contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub sources: SourcePatterns,
    /// Accepted date formats for CSV and sheet text dates, tried in order
    pub date_formats: Vec<String>,
    pub estimate_summary: EstimateSheetLayout,
    pub scoreboard: ScoreboardSheetLayout,
    pub sales_report: SalesReportLayout,
    pub customer_count: CustomerCountLayout,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            sources: SourcePatterns::default(),
            date_formats: vec![
                "%m-%d-%Y".to_string(),
                "%m/%d/%Y".to_string(),
                "%Y-%m-%d".to_string(),
            ],
            estimate_summary: EstimateSheetLayout::default(),
            scoreboard: ScoreboardSheetLayout::default(),
            sales_report: SalesReportLayout::default(),
            customer_count: CustomerCountLayout::default(),
        }
    }
}

impl Layout {
    /// Parse a layout from YAML text
    pub fn from_yaml(content: &str) -> SalesUpdateResult<Self> {
        let layout: Layout = serde_yaml::from_str(content)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load a layout file
    pub fn from_file(path: &Path) -> SalesUpdateResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| SalesUpdateError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Resolve the layout for a run: an explicit file, else `sales-update.yaml`
    /// in the working directory, else the built-in defaults.
    pub fn resolve(dir: &Path, explicit: Option<&Path>) -> SalesUpdateResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Ok((Self::from_file(&candidate)?, Some(candidate)));
        }

        Ok((Self::default(), None))
    }

    /// Every sheet the pipeline touches, in stage order, without duplicates
    pub fn required_sheets(&self) -> Vec<&str> {
        let mut sheets: Vec<&str> = Vec::new();
        for name in [
            self.estimate_summary.sheet.as_str(),
            self.scoreboard.current_year.estimate_sheet.as_str(),
            self.scoreboard.prior_year.estimate_sheet.as_str(),
            self.scoreboard.sheet.as_str(),
            self.sales_report.sheet.as_str(),
            self.customer_count.sheet.as_str(),
        ] {
            if !sheets.contains(&name) {
                sheets.push(name);
            }
        }
        sheets
    }

    fn validate(&self) -> SalesUpdateResult<()> {
        if self.date_formats.is_empty() {
            return Err(SalesUpdateError::Config(
                "date_formats must list at least one format".to_string(),
            ));
        }

        let rows = [
            ("estimate_summary.start_row", self.estimate_summary.start_row),
            ("scoreboard.start_row", self.scoreboard.start_row),
            ("sales_report.start_row", self.sales_report.start_row),
            ("customer_count.start_row", self.customer_count.start_row),
        ];
        for (name, row) in rows {
            if row == 0 {
                return Err(SalesUpdateError::Config(format!("{name} must be 1 or greater")));
            }
        }

        let estimate = &self.estimate_summary;
        if estimate.header_row == 0 || estimate.header_row >= estimate.start_row {
            return Err(SalesUpdateError::Config(
                "estimate_summary.header_row must be 1 or greater and above start_row".to_string(),
            ));
        }
        for binding in &estimate.columns {
            if estimate.preserve.contains(&binding.column) {
                return Err(SalesUpdateError::Config(format!(
                    "estimate_summary column {} is both written and preserved",
                    binding.column
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_layout_matches_workbook_contract() {
        let layout = Layout::default();
        assert_eq!(layout.estimate_summary.sheet, "2024 Estimate Summary");
        assert_eq!(layout.estimate_summary.columns.len(), 11);
        assert_eq!(
            layout
                .estimate_summary
                .preserve
                .iter()
                .map(|c| c.letters())
                .collect::<Vec<_>>(),
            vec!["F", "M", "N", "O", "P"]
        );
        assert_eq!(layout.scoreboard.current_year.column.index(), 3);
        assert_eq!(layout.scoreboard.prior_year.column.index(), 15);
        assert_eq!(layout.scoreboard.prior_year.age_cutoff_days, Some(367));
        assert_eq!(layout.sales_report.start_row, 5);
        assert_eq!(layout.customer_count.unmatched_column.index(), 8);
    }

    #[test]
    fn test_required_sheets_are_unique() {
        let layout = Layout::default();
        assert_eq!(
            layout.required_sheets(),
            vec![
                "2024 Estimate Summary",
                "2023 Estimate Summary",
                "Scoreboard",
                "Updated Sales Report",
                "Customer Count",
            ]
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
scoreboard:
  prior_year:
    estimate_sheet: "2024 Estimate Summary"
    production_csv: "2024_pbt.csv"
    column: Q
    age_cutoff_days: 30
"#;
        let layout = Layout::from_yaml(yaml).unwrap();
        assert_eq!(layout.scoreboard.prior_year.column.letters(), "Q");
        assert_eq!(layout.scoreboard.prior_year.age_cutoff_days, Some(30));
        assert_eq!(layout.scoreboard.sheet, "Scoreboard");
        assert_eq!(layout.estimate_summary, EstimateSheetLayout::default());
    }

    #[test]
    fn test_invalid_column_letter_rejected() {
        let yaml = "customer_count:\n  sales_column: \"C3\"\n";
        let err = Layout::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("C3"), "got: {err}");
    }

    #[test]
    fn test_column_binding_parse_rejects_bad_letters() {
        let binding = ColumnBinding::parse("g", "TotalPrice").unwrap();
        assert_eq!(binding.column.letters(), "G");
        assert_eq!(binding.header_text(), "TotalPrice");

        for bad in ["A1", "", "$B"] {
            assert!(
                matches!(
                    ColumnBinding::parse(bad, "TotalPrice"),
                    Err(SalesUpdateError::InvalidColumn(_))
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_preserved_and_written_overlap_rejected() {
        let yaml = "estimate_summary:\n  preserve: [A]\n";
        let err = Layout::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("both written and preserved"));
    }

    #[test]
    fn test_yaml_round_trip_of_defaults() {
        let yaml = serde_yaml::to_string(&Layout::default()).unwrap();
        assert_eq!(Layout::from_yaml(&yaml).unwrap(), Layout::default());
    }
}
