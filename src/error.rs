//! Error types for the inventory report pipeline.
//!
//! The pipeline is all-or-nothing: any failure aborts the whole run with a
//! single descriptive error and no partial workbook is produced.

use thiserror::Error;

// ============================================================================
// Parse Errors
// ============================================================================

/// Errors while parsing the semicolon-delimited inventory export.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input had no bytes, or only whitespace.
    #[error("input is empty")]
    EmptyInput,

    /// The first row yielded no usable column names.
    #[error("no header row found")]
    NoHeader,

    /// A column required for classification is absent.
    #[error("required column '{name}' not found (available: {available})")]
    MissingColumn { name: String, available: String },

    /// The underlying CSV reader rejected the input.
    #[error("invalid CSV input: {0}")]
    Csv(#[from] csv::Error),
}

// ============================================================================
// Assembly Errors
// ============================================================================

/// Errors while combining rendered sheets into one workbook.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Two distinct labels shorten to the same sheet tab name. Reported
    /// instead of letting one sheet silently overwrite the other.
    #[error("labels '{first}' and '{second}' both shorten to sheet name '{sheet_name}'")]
    SheetNameCollision {
        first: String,
        second: String,
        sheet_name: String,
    },

    /// A label sanitized down to nothing.
    #[error("label '{label}' produces an empty sheet name")]
    EmptySheetName { label: String },
}

// ============================================================================
// Top-level Pipeline Error
// ============================================================================

/// Any failure of one report run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// Catch-all for unexpected failures while rendering the workbook.
    #[error("processing error: {0}")]
    Processing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rust_xlsxwriter::XlsxError> for ReportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ReportError::Processing(err.to_string())
    }
}
