//! Output generation: the CSV dataset, its checkpoints, and the run summary.
//!
//! # Submodules
//!
//! - [`dataset`]: Writes and reads BOM-prefixed CSV files of records
//! - [`report`]: Aggregates value distributions for the end-of-run log

pub mod dataset;
pub mod report;
