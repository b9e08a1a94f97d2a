#![doc = include_str!("../README.md")]

pub mod classify;
pub mod cli;
pub mod dtc;
pub mod filter;
pub mod params;
pub mod progress;
pub mod report;
pub mod scan;
pub mod smart_reader;
pub mod tally;

pub use classify::{Classification, FileClassifier, FileGroupRule};
pub use dtc::{Format, Record};
pub use filter::Selection;
pub use scan::{ScanConfig, ScanOutput, ScanSummary, Scanner};
pub use tally::ResultSet;
