//! Sales Update - CSV exports merged into the Sales Update workbook
//!
//! This library rebuilds the data ranges of the Sales Update workbook from the
//! periodic CSV exports (estimate summaries, production by technician, sales
//! reports, prior-year production rosters) while leaving its formula columns
//! untouched.
//!
//! # Features
//!
//! - Latest-file discovery by modification time
//! - Typed CSV loading with per-column drop counts
//! - Clear-and-rewrite of sheet ranges that preserves formula columns
//! - Scoreboard and customer-count set arithmetic
//! - YAML-configurable workbook layout
//!
//! # Example
//!
//! ```no_run
//! use sales_update::config::Layout;
//! use sales_update::pipeline::Pipeline;
//! use std::path::Path;
//!
//! let layout = Layout::default();
//! let today = chrono::Local::now().date_naive();
//! let pipeline = Pipeline::new(Path::new("reports"), &layout, today);
//!
//! let saved = pipeline.run(|stage| println!("{:?}", stage))?;
//! println!("Saved {}", saved.display());
//! # Ok::<(), sales_update::error::SalesUpdateError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod excel;
pub mod filter;
pub mod loader;
pub mod locator;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use error::{SalesUpdateError, SalesUpdateResult};
pub use types::{CellValue, Col, CustomerNumber, EstimateRecord, ProductionRecord, Table};
