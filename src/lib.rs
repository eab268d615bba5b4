//! Inventario Organizador
//!
//! Turns a branch asset inventory CSV export (semicolon-delimited) into a
//! categorized multi-sheet Excel workbook.
//!
//! This library provides:
//! - `classify`: Ordered rule table mapping each record to a destination sheet
//! - `pipeline`: Parse, partition, render and assemble workflow
//! - `error`: Typed pipeline errors
//!
//! Binaries:
//! - `inventario`: CLI for converting exports, previewing the breakdown and
//!   exporting the rule table

pub mod classify;
pub mod error;
pub mod pipeline;

// Re-export the types callers touch most
pub use classify::{ClassifyInput, Rule, RuleSet};
pub use error::{AssemblyError, ParseError, ReportError};
pub use pipeline::{generate_workbook, plan_report, ReportConfig, ReportPlan, SheetPlan};
