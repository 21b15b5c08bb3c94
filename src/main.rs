use anyhow::Context;
use clap::{Parser, Subcommand};
use sales_update::cli;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sales-update")]
#[command(about = "Merge the latest CSV exports into the Sales Update workbook")]
#[command(long_about = "Sales Update - CSV exports merged into the Sales Update workbook

Finds the newest '*Sales Update*.xlsx' in DIR, rewrites its data ranges from
the latest exports and saves a copy named for today ('Sales Update MM.DD.xlsx').
Formula columns are left untouched. Nothing is written if any stage fails.

STAGES:
  1. Open the latest workbook
  2. Estimate summary    - *EstimateSummary*.csv
  3. Scoreboard (current) - unconverted residential customers vs 2023_pbt.csv
  4. Scoreboard (prior)   - same, aged 367+ days, vs 2022_pbt.csv
  5. Sales report         - *Updated_Sales_Report* and *Production_By_Technician*

LAYOUT:
  Sheet names, columns and start rows come from DIR/sales-update.yaml when
  present, or from --config. Every field has a default.

EXAMPLES:
  sales-update ~/reports               # Run the update
  sales-update check ~/reports         # Verify the workbook layout
  sales-update init ~/reports          # Write a blank workbook

LOGGING:
  -v enables debug logs; RUST_LOG overrides (e.g. RUST_LOG=sales_update=trace)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding the workbook and CSV exports
    dir: Option<PathBuf>,

    /// Layout file (defaults to DIR/sales-update.yaml)
    #[arg(short, long, global = true, env = "SALES_UPDATE_CONFIG")]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Check the latest workbook against the layout.

Reports missing sheets, the last used row of each sheet and how many
formulas each preserved column still holds. The workbook is only read.")]
    /// Check the latest workbook without modifying it
    Check {
        /// Directory holding the workbook
        dir: PathBuf,
    },

    /// Write a blank workbook matching the layout
    Init {
        /// Directory to write the workbook into
        dir: PathBuf,

        /// Overwrite an existing workbook for today
        #[arg(short, long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "sales_update=debug"
    } else {
        "sales_update=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let today = chrono::Local::now().date_naive();

    match cli.command {
        Some(Commands::Check { dir }) => cli::check(dir, cli.config).context("workbook check failed"),

        Some(Commands::Init { dir, force }) => {
            cli::init(dir, cli.config, force, today).context("could not write the workbook")
        }

        None => {
            let dir = cli
                .dir
                .context("missing DIR: pass the directory holding the workbook and exports")?;
            cli::run(dir, cli.config, today).context("sales update failed")
        }
    }
}
