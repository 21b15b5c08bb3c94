use crate::config::Layout;
use crate::error::{SalesUpdateError, SalesUpdateResult};
use crate::excel::{dated_file_name, inspect_workbook, write_template};
use crate::loader::LoadReport;
use crate::locator;
use crate::pipeline::{Pipeline, ScoreboardYear, StageReport};
use chrono::NaiveDate;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Format a dollar amount the way the workbook shows it: `$1,200.50`
fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// `1 row`, `2 rows`
fn count_of(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// One line per column that lost rows or cells, e.g.
/// `TotalPriceFormatted: 2 rows dropped`
fn describe_load(report: &LoadReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (column, count) in &report.dropped {
        lines.push(format!("{column}: {} dropped", count_of(*count, "row")));
    }
    for (column, count) in &report.blanked {
        lines.push(format!("{column}: {} blanked", count_of(*count, "cell")));
    }
    if report.filtered > 0 {
        lines.push(format!("{} filtered out", count_of(report.filtered, "row")));
    }
    lines
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_load(label: &str, path: &Path, report: &LoadReport) {
    println!(
        "   {} {} ({} of {} rows kept)",
        label,
        file_name(path).bright_blue(),
        report.rows_kept,
        report.rows_read
    );
    for line in describe_load(report) {
        println!("      {}", line.yellow());
    }
}

fn load_layout(dir: &Path, config: Option<&Path>) -> SalesUpdateResult<Layout> {
    let (layout, source) = Layout::resolve(dir, config)?;
    if let Some(path) = source {
        println!("   Layout: {}", path.display());
    }
    Ok(layout)
}

fn print_stage(stage: &StageReport) {
    match stage {
        StageReport::Opened { source, target } => {
            println!("{}", "1. 📂 Opened workbook".cyan());
            println!("   Source: {}", file_name(source).bright_blue());
            println!("   Target: {}", file_name(target).bright_blue());
        }
        StageReport::Estimates(stage) => {
            println!("{}", "2. 📋 Estimate summary updated".cyan());
            print_load("CSV:", &stage.csv, &stage.load);
            println!(
                "   Sheet '{}': {} rows written, {} formula cells kept",
                stage.sheet, stage.update.rows_written, stage.update.preserved_cells
            );
        }
        StageReport::Scoreboard(stage) => {
            let step = match stage.year {
                ScoreboardYear::Current => "3.",
                ScoreboardYear::Prior => "4.",
            };
            println!("{}", format!("{step} 🏆 Scoreboard ({}) updated", stage.year).cyan());
            println!(
                "   {} estimate rows from '{}', {} customers in {}",
                stage.estimate_rows, stage.estimate_sheet, stage.production_customers, stage.production_csv
            );
            if stage.dropped_rows > 0 {
                println!(
                    "      {}",
                    format!("CustomerNumber: {} dropped", count_of(stage.dropped_rows, "row")).yellow()
                );
            }
            if let Some(cutoff) = stage.cutoff {
                println!("   Requested on or before {}", cutoff.format("%m-%d-%Y"));
            }
            println!(
                "   Column {}: {} customers",
                stage.column.to_string().bold(),
                stage.customers
            );
        }
        StageReport::SalesReport(stage) => {
            println!("{}", "5. 💰 Sales report updated".cyan());
            print_load("Sales:", &stage.sales_csv, &stage.sales_load);
            print_load("Production:", &stage.production_csv, &stage.production_load);
            println!(
                "   Gross production: {}",
                format_currency(stage.production_gross).bold()
            );
            println!(
                "   {} sales customers, {} production customers without sales",
                stage.sales_customers, stage.unmatched_customers
            );
        }
        StageReport::Saved { path } => {
            println!("{}", "💾 Workbook saved".cyan());
            println!("   {}", path.display());
        }
    }
}

/// Execute the full update against `dir`
pub fn run(dir: PathBuf, config: Option<PathBuf>, today: NaiveDate) -> SalesUpdateResult<()> {
    println!("{}", "📊 Sales Update".bold().green());
    println!("   Directory: {}", dir.display());
    let layout = load_layout(&dir, config.as_deref())?;
    println!();

    let pipeline = Pipeline::new(&dir, &layout, today);
    let saved = match pipeline.run(print_stage) {
        Ok(path) => path,
        Err(e) => {
            println!("\n{}", format!("❌ Update failed: {e}").bold().red());
            println!("{}", "   No workbook was written".yellow());
            return Err(e);
        }
    };

    println!();
    println!("{}", "✅ Sales update complete!".bold().green());
    println!("   {}", file_name(&saved).bright_blue().bold());
    Ok(())
}

/// Execute the check command; reads the latest workbook without modifying it
pub fn check(dir: PathBuf, config: Option<PathBuf>) -> SalesUpdateResult<()> {
    println!("{}", "🔍 Sales Update - Workbook Check".bold().green());
    println!("   Directory: {}", dir.display());
    let layout = load_layout(&dir, config.as_deref())?;

    let workbook = locator::find_latest(&dir, &layout.sources.workbook, Some("xlsx"))?;
    println!("   Workbook: {}\n", file_name(&workbook).bright_blue());

    let report = inspect_workbook(&workbook, &layout)?;

    for extent in &report.extents {
        println!("   📄 {} (last row {})", extent.sheet.bright_blue(), extent.last_row);
    }
    for column in &report.formula_columns {
        println!(
            "      {}!{}: {} formulas",
            column.sheet, column.column, column.formulas
        );
    }

    let empty: Vec<_> = report.empty_formula_columns().collect();
    if !empty.is_empty() {
        println!();
        for column in &empty {
            println!(
                "{}",
                format!("⚠️  {}!{} has no formulas left", column.sheet, column.column).yellow()
            );
        }
    }

    println!();
    if report.is_ok() {
        println!("{}", "✅ Workbook matches the layout!".bold().green());
        Ok(())
    } else {
        for sheet in &report.missing_sheets {
            println!("{}", format!("❌ Missing sheet '{sheet}'").bold().red());
        }
        Err(SalesUpdateError::SheetNotFound(report.missing_sheets.join(", ")))
    }
}

/// Execute the init command; writes a blank workbook named for `today`
pub fn init(dir: PathBuf, config: Option<PathBuf>, force: bool, today: NaiveDate) -> SalesUpdateResult<()> {
    println!("{}", "🆕 Sales Update - New Workbook".bold().green());
    let layout = load_layout(&dir, config.as_deref())?;

    let path = dir.join(dated_file_name(&layout.sources.workbook, today));
    if path.exists() && !force {
        println!(
            "{}",
            format!("❌ {} already exists", path.display()).bold().red()
        );
        println!("{}", "💡 Use --force to overwrite it".bold().yellow());
        return Err(SalesUpdateError::Template(format!(
            "{} already exists",
            path.display()
        )));
    }

    write_template(&path, &layout)?;

    println!("{}", "✅ Template written!".bold().green());
    println!("   {}", path.display());
    for sheet in layout.required_sheets() {
        println!("   ✅ {sheet}");
    }
    Ok(())
}
