//! Pipeline functions for turning a raw inventory CSV export into an
//! organized multi-sheet XLSX workbook.
//!
//! The whole run is a stateless transformation: bytes in, workbook bytes out.
//! Parsing, classification, partitioning and rendering build an in-memory
//! [`ReportPlan`]; only [`convert_file`] touches the filesystem, on behalf of
//! the CLI.

use crate::classify::{ClassifyInput, RuleSet};
use crate::error::{AssemblyError, ParseError, ReportError};
use csv::ReaderBuilder;
use regex::Regex;
use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for one report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Title prefix written into each sheet's merged first row.
    pub report_title: String,
    /// Column holding the branch identifier (dropped from display).
    pub branch_column: String,
    /// Column holding the device type (required for classification).
    pub type_column: String,
    /// Column holding the device sub-type.
    pub subtype_column: String,
    /// Column holding the free-text complement.
    pub complement_column: String,
    /// Column used to order rows within a sheet.
    pub priority_column: String,
    /// Extra character width added to every column.
    pub width_padding: f64,
    /// Ordered classification rule table.
    pub rules: RuleSet,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report_title: "INVENTÁRIO".to_string(),
            branch_column: "FILIAL".to_string(),
            type_column: "TIPO".to_string(),
            subtype_column: "SUB TIPO".to_string(),
            complement_column: "COMPLEMENTO".to_string(),
            priority_column: "PIP".to_string(),
            width_padding: 4.0,
            rules: RuleSet::default(),
        }
    }
}

// ============================================================================
// Record Parsing
// ============================================================================

/// A parsed inventory export.
#[derive(Debug, Clone)]
pub struct Inventory {
    /// Column names, trimmed and upper-cased, in file order.
    pub columns: Vec<String>,
    /// Row values, padded or truncated to the column count.
    pub rows: Vec<Vec<String>>,
    /// Rows whose field count did not match the header.
    pub malformed_rows: usize,
}

impl Inventory {
    /// Index of a column by its normalized name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Decode raw bytes as UTF-8, falling back to Windows-1252 for legacy exports.
fn decode_input(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            log::warn!("input is not valid UTF-8, decoding as Windows-1252");
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Parse a semicolon-delimited inventory export with a header row.
///
/// Column names are trimmed and upper-cased. Rows shorter than the header are
/// padded with empty fields and longer rows are cut; both count as malformed
/// and are reported via [`Inventory::malformed_rows`] rather than failing the
/// run. Fully blank rows are skipped.
pub fn parse_inventory(bytes: &[u8], config: &ReportConfig) -> Result<Inventory, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    let text = decode_input(bytes);
    if text.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_uppercase())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(ParseError::NoHeader);
    }

    let mut rows = Vec::new();
    let mut malformed = 0usize;
    for result in reader.records() {
        let record = result?;
        let mut values: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        if values.len() != columns.len() {
            malformed += 1;
            values.resize(columns.len(), String::new());
        }
        rows.push(values);
    }
    if malformed > 0 {
        log::warn!(
            "{malformed} row(s) had a field count different from the header; missing fields treated as empty"
        );
    }

    let inventory = Inventory {
        columns,
        rows,
        malformed_rows: malformed,
    };
    if inventory.column_index(&config.type_column).is_none() {
        return Err(ParseError::MissingColumn {
            name: config.type_column.clone(),
            available: inventory.columns.join(", "),
        });
    }
    Ok(inventory)
}

// ============================================================================
// Partition & Sort
// ============================================================================

/// Sort key for the priority column: blanks first, then numbers in numeric
/// order, then text lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PriorityKey {
    Blank,
    Number(i64),
    Text(String),
}

impl PriorityKey {
    fn parse(raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).unwrap_or("");
        if raw.is_empty() {
            PriorityKey::Blank
        } else if let Ok(n) = raw.parse::<i64>() {
            PriorityKey::Number(n)
        } else {
            PriorityKey::Text(raw.to_uppercase())
        }
    }
}

/// Group row indices by destination label, sorted by priority within each
/// group.
///
/// The `BTreeMap` keys give the ascending label order used for sheet output.
/// The within-group sort is stable, so rows with equal priority keep their
/// input order.
pub fn partition_rows(
    inventory: &Inventory,
    config: &ReportConfig,
) -> BTreeMap<String, Vec<usize>> {
    let type_idx = inventory.column_index(&config.type_column);
    let subtype_idx = inventory.column_index(&config.subtype_column);
    let complement_idx = inventory.column_index(&config.complement_column);
    let priority_idx = inventory.column_index(&config.priority_column);

    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row_idx, row) in inventory.rows.iter().enumerate() {
        let field = |idx: Option<usize>| idx.map(|i| row[i].as_str());
        let input = ClassifyInput {
            tipo: field(type_idx),
            sub_tipo: field(subtype_idx),
            complemento: field(complement_idx),
        };
        groups
            .entry(config.rules.classify(&input))
            .or_default()
            .push(row_idx);
    }

    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| {
            PriorityKey::parse(priority_idx.map(|p| inventory.rows[i][p].as_str()))
        });
    }
    groups
}

// ============================================================================
// Sheet Rendering
// ============================================================================

/// One rendered sheet, ready for workbook assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPlan {
    /// Destination label as computed by the classifier.
    pub label: String,
    /// Sanitized, length-limited sheet tab name.
    pub sheet_name: String,
    /// Merged title row text.
    pub title: String,
    /// Display column headers, in original file order.
    pub columns: Vec<String>,
    /// Display values, one inner vec per row, in final row order.
    pub rows: Vec<Vec<String>>,
    /// Column widths in characters, padding included.
    pub widths: Vec<f64>,
}

/// Maximum sheet name length allowed by the XLSX format.
pub const MAX_SHEET_NAME_LEN: usize = 31;

lazy_static::lazy_static! {
    /// Characters XLSX forbids in sheet names outright.
    static ref FORBIDDEN_SHEET_CHARS: Regex = Regex::new(r"[\[\]:*?]").unwrap();
}

/// Sanitize a label into a legal sheet tab name.
///
/// Slashes become dashes, bracket/wildcard characters are stripped, and the
/// result is cut to 31 characters on a character boundary.
pub fn sanitize_sheet_name(label: &str) -> String {
    let replaced = label.replace(['/', '\\'], "-");
    let stripped = FORBIDDEN_SHEET_CHARS.replace_all(&replaced, "");
    stripped.trim().chars().take(MAX_SHEET_NAME_LEN).collect()
}

/// Column width: widest of header and cells in characters, plus padding.
fn column_width(header: &str, rows: &[Vec<String>], col: usize, padding: f64) -> f64 {
    let mut width = header.chars().count();
    for row in rows {
        width = width.max(row[col].chars().count());
    }
    width as f64 + padding
}

/// Render one label's group of rows into a [`SheetPlan`].
///
/// Classification-only columns (branch, type, sub-type, complement) are
/// dropped here; everything else keeps its original relative order.
pub fn render_sheet(
    inventory: &Inventory,
    label: &str,
    row_indices: &[usize],
    config: &ReportConfig,
) -> Result<SheetPlan, ReportError> {
    let hidden = [
        config.branch_column.as_str(),
        config.type_column.as_str(),
        config.subtype_column.as_str(),
        config.complement_column.as_str(),
    ];
    let display_cols: Vec<usize> = inventory
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !hidden.contains(&name.as_str()))
        .map(|(i, _)| i)
        .collect();
    if display_cols.is_empty() {
        return Err(ReportError::Processing(format!(
            "no display columns remain for sheet '{label}' after dropping classification columns"
        )));
    }

    let columns: Vec<String> = display_cols
        .iter()
        .map(|&i| inventory.columns[i].clone())
        .collect();
    let rows: Vec<Vec<String>> = row_indices
        .iter()
        .map(|&r| {
            display_cols
                .iter()
                .map(|&c| inventory.rows[r][c].clone())
                .collect()
        })
        .collect();
    let widths: Vec<f64> = columns
        .iter()
        .enumerate()
        .map(|(i, header)| column_width(header, &rows, i, config.width_padding))
        .collect();

    Ok(SheetPlan {
        label: label.to_string(),
        sheet_name: sanitize_sheet_name(label),
        title: format!("{} - {}", config.report_title, label),
        columns,
        rows,
        widths,
    })
}

// ============================================================================
// Report Planning
// ============================================================================

/// The fully planned report: ordered sheets plus run counters.
#[derive(Debug, Clone)]
pub struct ReportPlan {
    /// Rendered sheets in ascending label order.
    pub sheets: Vec<SheetPlan>,
    /// Records read from the input.
    pub total_rows: usize,
    /// Rows with a field count mismatch (parsed leniently).
    pub malformed_rows: usize,
}

/// Parse, classify, partition and render, without touching the filesystem.
pub fn plan_report(bytes: &[u8], config: &ReportConfig) -> Result<ReportPlan, ReportError> {
    let inventory = parse_inventory(bytes, config)?;
    let groups = partition_rows(&inventory, config);

    let mut sheets = Vec::with_capacity(groups.len());
    for (label, indices) in &groups {
        log::debug!("label '{label}': {} row(s)", indices.len());
        sheets.push(render_sheet(&inventory, label, indices, config)?);
    }

    Ok(ReportPlan {
        sheets,
        total_rows: inventory.rows.len(),
        malformed_rows: inventory.malformed_rows,
    })
}

// ============================================================================
// Workbook Assembly
// ============================================================================

/// Combine the rendered sheets into XLSX bytes.
///
/// Sheet order follows the plan order. Two labels shortening to the same tab
/// name abort the run instead of silently overwriting one another; the
/// comparison is case-insensitive because sheet names are.
pub fn assemble_workbook(plan: &ReportPlan) -> Result<Vec<u8>, ReportError> {
    if plan.sheets.is_empty() {
        return Err(ReportError::Processing(
            "no data rows to organize".to_string(),
        ));
    }

    let mut seen: HashMap<String, &str> = HashMap::new();
    for sheet in &plan.sheets {
        if sheet.sheet_name.is_empty() {
            return Err(AssemblyError::EmptySheetName {
                label: sheet.label.clone(),
            }
            .into());
        }
        if let Some(first) = seen.insert(sheet.sheet_name.to_lowercase(), sheet.label.as_str()) {
            return Err(AssemblyError::SheetNameCollision {
                first: first.to_string(),
                second: sheet.label.clone(),
                sheet_name: sheet.sheet_name.clone(),
            }
            .into());
        }
    }

    let mut workbook = Workbook::new();
    let title_fmt = Format::new()
        .set_bold()
        .set_background_color("#D9D9D9")
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let header_fmt = Format::new()
        .set_bold()
        .set_font_color("#FFFFFF")
        .set_background_color("#1F4E78")
        .set_align(FormatAlign::Center);

    for plan_sheet in &plan.sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(plan_sheet.sheet_name.as_str())?;

        let last_col = (plan_sheet.columns.len() - 1) as u16;
        if last_col == 0 {
            // merge_range rejects a single-cell merge
            sheet.write_string_with_format(0, 0, &plan_sheet.title, &title_fmt)?;
        } else {
            sheet.merge_range(0, 0, 0, last_col, &plan_sheet.title, &title_fmt)?;
        }

        for (col, name) in plan_sheet.columns.iter().enumerate() {
            sheet.write_string_with_format(1, col as u16, name.as_str(), &header_fmt)?;
        }
        for (row, values) in plan_sheet.rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                sheet.write_string((row + 2) as u32, col as u16, value.as_str())?;
            }
        }
        for (col, width) in plan_sheet.widths.iter().enumerate() {
            sheet.set_column_width(col as u16, *width)?;
        }
    }

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

// ============================================================================
// Entry Points
// ============================================================================

/// Full pipeline: raw CSV bytes in, workbook bytes out.
pub fn generate_workbook(bytes: &[u8], config: &ReportConfig) -> Result<Vec<u8>, ReportError> {
    let plan = plan_report(bytes, config)?;
    assemble_workbook(&plan)
}

/// Summary of a completed conversion.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Sheets written to the workbook.
    pub sheets: usize,
    /// Records read from the input.
    pub total_rows: usize,
    /// Rows with a field count mismatch (parsed leniently).
    pub malformed_rows: usize,
    /// Size of the written workbook.
    pub output_bytes: usize,
}

/// Convert an inventory CSV file into an organized workbook file.
pub fn convert_file(
    input: &Path,
    output: &Path,
    config: &ReportConfig,
) -> Result<RunSummary, ReportError> {
    let bytes = std::fs::read(input)?;
    let plan = plan_report(&bytes, config)?;
    let buffer = assemble_workbook(&plan)?;
    std::fs::write(output, &buffer)?;
    log::info!(
        "wrote {} sheet(s) ({} row(s)) to {}",
        plan.sheets.len(),
        plan.total_rows,
        output.display()
    );

    Ok(RunSummary {
        sheets: plan.sheets.len(),
        total_rows: plan.total_rows,
        malformed_rows: plan.malformed_rows,
        output_bytes: buffer.len(),
    })
}
