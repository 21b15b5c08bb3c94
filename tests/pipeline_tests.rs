//! End-to-end runs of the five-stage update against generated workbooks
//!
//! Each test builds a reporting directory in a TempDir: a blank workbook from
//! the template generator plus small CSV exports, then runs the pipeline with
//! a fixed date and reads the saved workbook back.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sales_update::config::Layout;
use sales_update::excel::write_template;
use sales_update::pipeline::{Pipeline, ScoreboardYear, StageReport};
use sales_update::SalesUpdateError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use umya_spreadsheet::{reader, writer, Spreadsheet};

/// Formula columns of the estimate sheet: F and M-P
const PRESERVED: [u32; 5] = [6, 13, 14, 15, 16];
/// Columns written from the estimate export: A-E and G-L
const WRITTEN: [u32; 11] = [1, 2, 3, 4, 5, 7, 8, 9, 10, 11, 12];
/// Last row of the template that carries formulas
const LAST_FORMULA_ROW: u32 = 501;

const TEMPLATE_NAME: &str = "Sales Update 03.01.xlsx";
const OUTPUT_NAME: &str = "Sales Update 03.07.xlsx";

const ESTIMATE_HEADER: &str = "CustomerNumber,CustomerSize,ResidentialOrCommercial,BranchNumberOfCustomer,ProgramCode,TotalPriceFormatted,EstimateRequestedDate,EstimateGivenDate,RejectDate,SoldDate,CancelDate";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
}

fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn write_estimates(dir: &Path, rows: &[&str]) {
    let mut content = String::from(ESTIMATE_HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    write_file(dir, "EstimateSummary_2024.csv", &content);
}

/// Reporting directory with every input the pipeline needs
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_template(&dir.path().join(TEMPLATE_NAME), &Layout::default()).unwrap();

    write_estimates(
        dir.path(),
        &[
            "10,Small,R,1,P1,$500.00,01-10-2024,01-12-2024,,,",
            "20,Small,R,1,P1,$750.00,01-11-2024,,,,",
            "30,Large,R,2,P2,\"$1,200.50\",01-12-2024,,,02-01-2024,",
            "40,Large,C,2,P2,$900.00,01-13-2024,,,,",
            "50,Small,R,1,P1,$0.00,01-14-2024,,,,",
        ],
    );
    write_file(dir.path(), "2023_pbt.csv", "CustomerNumber\n20\n");
    write_file(dir.path(), "2022_pbt.csv", "CustomerNumber\n77\n");
    write_file(
        dir.path(),
        "Updated_Sales_Report_0301.csv",
        "CustomerNumber,BranchNumberOfCustomer,TotalPrice\n500,1,$100.00\n501,1,$0.00\n500,2,$50.00\n",
    );
    write_file(
        dir.path(),
        "Production_By_Technician_0301.csv",
        "CustomerNumber,BranchNumberOfCustomer,GrossSalesAmount\n500,1,$10.00\n600,1,$20.00\n700,1,$0.00\n",
    );

    dir
}

/// Fill the prior-year estimate sheet of the template in place
fn seed_prior_year(dir: &Path, rows: &[(f64, &str, &str)]) {
    let path = dir.join(TEMPLATE_NAME);
    let mut book = reader::xlsx::read(&path).unwrap();
    let sheet = book.get_sheet_by_name_mut("2023 Estimate Summary").unwrap();
    for (offset, (customer, class, requested)) in rows.iter().enumerate() {
        let row = 2 + offset as u32;
        sheet.get_cell_mut((1, row)).set_value_number(*customer);
        sheet.get_cell_mut((3, row)).set_value_string(*class);
        sheet.get_cell_mut((8, row)).set_value_string(*requested);
    }
    writer::xlsx::write(&book, &path).unwrap();
}

fn run(dir: &Path) -> Result<(PathBuf, Vec<StageReport>), SalesUpdateError> {
    let layout = Layout::default();
    let mut stages = Vec::new();
    let saved = Pipeline::new(dir, &layout, today()).run(|stage| stages.push(stage.clone()))?;
    Ok((saved, stages))
}

fn open(path: &Path) -> Spreadsheet {
    reader::xlsx::read(path).unwrap()
}

fn value(book: &Spreadsheet, sheet: &str, col: u32, row: u32) -> String {
    book.get_sheet_by_name(sheet)
        .unwrap()
        .get_cell((col, row))
        .map(|cell| cell.get_value().to_string())
        .unwrap_or_default()
}

fn formula(book: &Spreadsheet, sheet: &str, col: u32, row: u32) -> String {
    book.get_sheet_by_name(sheet)
        .unwrap()
        .get_cell((col, row))
        .map(|cell| cell.get_formula().to_string())
        .unwrap_or_default()
}

/// Formula text of the preserved estimate columns, rows 1 to `last_row`
fn preserved_formulas(book: &Spreadsheet, last_row: u32) -> Vec<String> {
    PRESERVED
        .iter()
        .flat_map(|&col| (1..=last_row).map(move |row| (col, row)))
        .map(|(col, row)| formula(book, "2024 Estimate Summary", col, row))
        .collect()
}

/// Non-empty values of one column from `start_row` down
fn column(book: &Spreadsheet, sheet: &str, col: u32, start_row: u32) -> Vec<String> {
    let last = book.get_sheet_by_name(sheet).unwrap().get_highest_row();
    (start_row..=last)
        .map(|row| value(book, sheet, col, row))
        .filter(|v| !v.is_empty())
        .collect()
}

fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ═══════════════════════════════════════════════════════════════════════════
// FULL RUN
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_run_saves_dated_copy_and_reports_every_stage() {
    let dir = workspace();
    let (saved, stages) = run(dir.path()).unwrap();

    assert_eq!(saved, dir.path().join(OUTPUT_NAME));
    assert!(saved.exists());
    assert!(dir.path().join(TEMPLATE_NAME).exists());

    assert_eq!(stages.len(), 6);
    assert!(matches!(stages[0], StageReport::Opened { .. }));
    assert!(matches!(stages[1], StageReport::Estimates(_)));
    assert!(matches!(&stages[2], StageReport::Scoreboard(s) if s.year == ScoreboardYear::Current));
    assert!(matches!(&stages[3], StageReport::Scoreboard(s) if s.year == ScoreboardYear::Prior));
    assert!(matches!(stages[4], StageReport::SalesReport(_)));
    assert!(matches!(stages[5], StageReport::Saved { .. }));
}

#[test]
fn test_estimate_rows_with_zero_price_are_excluded() {
    let dir = workspace();
    let (saved, stages) = run(dir.path()).unwrap();
    let book = open(&saved);

    let StageReport::Estimates(estimates) = &stages[1] else {
        panic!("expected the estimate stage");
    };
    assert_eq!(estimates.load.rows_read, 5);
    assert_eq!(estimates.load.rows_kept, 4);
    assert_eq!(estimates.load.filtered, 1);

    let sheet = "2024 Estimate Summary";
    assert_eq!(column(&book, sheet, 1, 2), vec!["10", "20", "30", "40"]);
    assert_eq!(value(&book, sheet, 7, 1), "TotalPrice");
    assert_eq!(value(&book, sheet, 7, 4), "1200.5");
}

#[test]
fn test_currency_cells_carry_dollar_format() {
    let dir = TempDir::new().unwrap();
    write_template(&dir.path().join(TEMPLATE_NAME), &Layout::default()).unwrap();
    let layout = Layout::default();
    write_estimates(
        dir.path(),
        &["100,Small,R,1,P1,\"$1,200.50\",01-10-2024,,,,", "200,Small,R,1,P1,$0.00,01-10-2024,,,,"],
    );

    let pipeline = Pipeline::new(dir.path(), &layout, today());
    let mut session = pipeline.open_session().unwrap();
    let stage = pipeline.process_estimates(&mut session).unwrap();
    assert_eq!(stage.update.rows_written, 1);

    let sheet = session.sheet("2024 Estimate Summary").unwrap();
    assert_eq!(sheet.get_cell((1, 2)).unwrap().get_value().to_string(), "100");
    let price = sheet.get_cell((7, 2)).unwrap();
    assert_eq!(price.get_value().to_string(), "1200.5");
    assert_eq!(
        price.get_style().get_number_format().unwrap().get_format_code(),
        "\"$\"#,##0.00"
    );
    assert!(sheet.get_cell((1, 3)).map_or(true, |c| c.get_value().is_empty()));
}

#[test]
fn test_formula_columns_survive_the_update() {
    let dir = workspace();
    let before = preserved_formulas(&open(&dir.path().join(TEMPLATE_NAME)), LAST_FORMULA_ROW);
    assert!(before.iter().any(|f| !f.is_empty()));

    let (saved, _) = run(dir.path()).unwrap();
    assert_eq!(before, preserved_formulas(&open(&saved), LAST_FORMULA_ROW));
}

#[test]
fn test_export_longer_than_formula_range() {
    let dir = workspace();
    let before = preserved_formulas(&open(&dir.path().join(TEMPLATE_NAME)), LAST_FORMULA_ROW);

    let rows: Vec<String> = (0..650)
        .map(|i| format!("{},Small,R,1,P1,$10.00,01-10-2024,01-11-2024,01-12-2024,01-13-2024,01-14-2024", 1000 + i))
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    write_estimates(dir.path(), &rows);

    let (saved, stages) = run(dir.path()).unwrap();
    let book = open(&saved);
    let sheet = "2024 Estimate Summary";

    let StageReport::Estimates(estimates) = &stages[1] else {
        panic!("expected the estimate stage");
    };
    assert_eq!(estimates.update.rows_written, 650);

    for col in WRITTEN {
        assert_eq!(column(&book, sheet, col, 2).len(), 650, "column {col}");
    }
    assert_eq!(value(&book, sheet, 1, 651), "1649");
    assert_eq!(value(&book, sheet, 7, 651), "10");

    assert_eq!(before, preserved_formulas(&book, LAST_FORMULA_ROW));
    for col in PRESERVED {
        for row in (LAST_FORMULA_ROW + 1)..=651 {
            assert_eq!(formula(&book, sheet, col, row), "", "formula at column {col} row {row}");
            assert_eq!(value(&book, sheet, col, row), "", "value at column {col} row {row}");
        }
    }
}

#[test]
fn test_empty_export_clears_old_rows() {
    let dir = workspace();
    let (saved, _) = run(dir.path()).unwrap();
    assert_eq!(column(&open(&saved), "2024 Estimate Summary", 1, 2).len(), 4);

    let before = preserved_formulas(&open(&saved), LAST_FORMULA_ROW);
    assert!(before.iter().any(|f| !f.is_empty()));

    write_estimates(dir.path(), &[]);
    let (saved, stages) = run(dir.path()).unwrap();

    let StageReport::Estimates(estimates) = &stages[1] else {
        panic!("expected the estimate stage");
    };
    assert_eq!(estimates.update.rows_written, 0);
    let book = open(&saved);
    for col in WRITTEN {
        assert!(column(&book, "2024 Estimate Summary", col, 2).is_empty(), "column {col}");
    }
    assert_eq!(before, preserved_formulas(&book, LAST_FORMULA_ROW));
}

#[test]
fn test_rerun_on_unchanged_inputs_is_identical() {
    let dir = workspace();
    let sheet = "2024 Estimate Summary";

    let snapshot = |path: &Path| -> Vec<String> {
        let book = open(path);
        (1..=16)
            .flat_map(|col| (1..=10).map(move |row| (col, row)))
            .map(|(col, row)| format!("{}|{}", value(&book, sheet, col, row), formula(&book, sheet, col, row)))
            .collect()
    };

    let (saved, _) = run(dir.path()).unwrap();
    let first = snapshot(&saved);

    let (saved, _) = run(dir.path()).unwrap();
    assert_eq!(first, snapshot(&saved));
}

// ═══════════════════════════════════════════════════════════════════════════
// SCOREBOARD
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_current_scoreboard_excludes_produced_customers() {
    let dir = workspace();
    let (saved, stages) = run(dir.path()).unwrap();

    // 10, 20, 30 residential; 20 produced in 2023; 40 commercial; 50 priced at zero
    assert_eq!(column(&open(&saved), "Scoreboard", 3, 4), vec!["10", "30"]);

    let StageReport::Scoreboard(current) = &stages[2] else {
        panic!("expected the current-year scoreboard");
    };
    assert_eq!(current.customers, 2);
    assert_eq!(current.cutoff, None);
}

#[test]
fn test_prior_scoreboard_keeps_only_aged_requests() {
    let dir = workspace();
    seed_prior_year(
        dir.path(),
        &[
            (61.0, "R", "03-06-2023"), // exactly 367 days before 03-07-2024
            (62.0, "R", "03-07-2023"), // 366 days
            (63.0, "C", "01-01-2022"),
            (77.0, "R", "01-01-2022"), // produced in 2022
            (64.0, "r", "2022-06-30"),
            (65.0, "R", ""),
        ],
    );

    let (saved, stages) = run(dir.path()).unwrap();
    assert_eq!(column(&open(&saved), "Scoreboard", 15, 4), vec!["61", "64"]);

    let StageReport::Scoreboard(prior) = &stages[3] else {
        panic!("expected the prior-year scoreboard");
    };
    assert_eq!(prior.cutoff, NaiveDate::from_ymd_opt(2023, 3, 6));
    assert_eq!(prior.estimate_rows, 6);
}

// ═══════════════════════════════════════════════════════════════════════════
// SALES REPORT AND CUSTOMER COUNT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sales_report_and_customer_count() {
    let dir = workspace();
    let (saved, stages) = run(dir.path()).unwrap();
    let book = open(&saved);

    let report = "Updated Sales Report";
    assert_eq!(column(&book, report, 3, 5), vec!["500", "500"]);
    assert_eq!(column(&book, report, 5, 5), vec!["100", "50"]);
    assert_eq!(column(&book, report, 8, 5), vec!["500", "600"]);
    assert_eq!(column(&book, report, 10, 5), vec!["10", "20"]);

    assert_eq!(column(&book, "Customer Count", 3, 4), vec!["500"]);
    assert_eq!(column(&book, "Customer Count", 8, 4), vec!["600"]);

    let StageReport::SalesReport(sales) = &stages[4] else {
        panic!("expected the sales report stage");
    };
    assert_eq!(sales.sales_load.filtered, 1);
    assert_eq!(sales.production_load.filtered, 1);
    assert_eq!(sales.production_gross, 30.0);
    assert_eq!(sales.sales_customers, 1);
    assert_eq!(sales.unmatched_customers, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// FAILURES LEAVE THE DIRECTORY UNTOUCHED
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_workbook_is_file_not_found() {
    let dir = workspace();
    fs::remove_file(dir.path().join(TEMPLATE_NAME)).unwrap();
    let before = dir_listing(dir.path());

    let result = run(dir.path());
    assert!(matches!(
        result,
        Err(SalesUpdateError::FileNotFound { ref pattern, .. }) if pattern == "*Sales Update*.xlsx"
    ));
    assert_eq!(before, dir_listing(dir.path()));
}

#[test]
fn test_missing_export_writes_nothing() {
    let dir = workspace();
    fs::remove_file(dir.path().join("Production_By_Technician_0301.csv")).unwrap();
    let template_bytes = fs::read(dir.path().join(TEMPLATE_NAME)).unwrap();
    let before = dir_listing(dir.path());

    let result = run(dir.path());
    assert!(matches!(result, Err(SalesUpdateError::FileNotFound { .. })));
    assert_eq!(before, dir_listing(dir.path()));
    assert_eq!(template_bytes, fs::read(dir.path().join(TEMPLATE_NAME)).unwrap());
}

#[test]
fn test_missing_roster_is_file_not_found() {
    let dir = workspace();
    fs::remove_file(dir.path().join("2022_pbt.csv")).unwrap();

    let result = run(dir.path());
    assert!(matches!(
        result,
        Err(SalesUpdateError::FileNotFound { ref pattern, .. }) if pattern == "2022_pbt.csv"
    ));
    assert!(!dir.path().join(OUTPUT_NAME).exists());
}

#[test]
fn test_missing_sheet_fails_before_any_stage() {
    let dir = workspace();
    let mut layout = Layout::default();
    layout.customer_count.sheet = "Customer Totals".to_string();

    let mut stages = 0;
    let result = Pipeline::new(dir.path(), &layout, today()).run(|_| stages += 1);

    assert!(matches!(result, Err(SalesUpdateError::SheetNotFound(ref s)) if s == "Customer Totals"));
    assert_eq!(stages, 0);
    assert!(!dir.path().join(OUTPUT_NAME).exists());
}

#[test]
fn test_missing_estimate_column_is_reported() {
    let dir = workspace();
    write_file(
        dir.path(),
        "EstimateSummary_2024.csv",
        "CustomerNumber,ResidentialOrCommercial\n10,R\n",
    );

    let result = run(dir.path());
    assert!(matches!(result, Err(SalesUpdateError::MissingColumn { .. })));
}
