//! Inventario CLI - organize branch inventory CSV exports into Excel workbooks
//!
//! Reads a semicolon-delimited inventory export, classifies every row into a
//! category via the rule table, and writes one styled worksheet per category.
//! The `preview` subcommand shows the breakdown without writing anything.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inventario_organizador::pipeline::{convert_file, plan_report, ReportConfig};
use inventario_organizador::RuleSet;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "inventario")]
#[command(about = "Organize branch inventory CSV exports into categorized Excel workbooks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV export into an organized XLSX workbook
    Convert {
        /// Input CSV file (semicolon-delimited, with header row)
        #[arg(short, long)]
        input: PathBuf,

        /// Output XLSX file
        #[arg(short, long, default_value = "Inventario_Organizado.xlsx")]
        output: PathBuf,

        /// Title prefix for each sheet's merged first row
        #[arg(long, default_value = "INVENTÁRIO")]
        title: String,

        /// JSON file with a custom rule table (see the `rules` subcommand)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Append the current date to the output filename
        #[arg(long)]
        timestamp: bool,
    },

    /// Print the per-category row breakdown without writing a file
    Preview {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Rows to show per category
        #[arg(long, default_value = "5")]
        limit: usize,

        /// JSON file with a custom rule table
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Print the built-in rule table as JSON, ready to edit
    Rules,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            title,
            rules,
            timestamp,
        } => {
            convert(&input, &output, title, rules.as_deref(), timestamp)?;
        }
        Commands::Preview {
            input,
            limit,
            rules,
        } => {
            preview(&input, limit, rules.as_deref())?;
        }
        Commands::Rules => {
            println!("{}", serde_json::to_string_pretty(&RuleSet::default())?);
        }
    }

    Ok(())
}

fn load_config(title: Option<String>, rules: Option<&Path>) -> Result<ReportConfig> {
    let mut config = ReportConfig::default();
    if let Some(title) = title {
        config.report_title = title;
    }
    if let Some(path) = rules {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule table: {}", path.display()))?;
        config.rules = RuleSet::from_json(&text)
            .with_context(|| format!("Invalid rule table: {}", path.display()))?;
    }
    Ok(config)
}

/// Append the current date to the output filename, keeping the extension.
fn stamped(output: &Path) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Inventario_Organizado");
    let ext = output.extension().and_then(|s| s.to_str()).unwrap_or("xlsx");
    output.with_file_name(format!("{stem}_{date}.{ext}"))
}

fn convert(
    input: &Path,
    output: &Path,
    title: String,
    rules: Option<&Path>,
    timestamp: bool,
) -> Result<()> {
    let config = load_config(Some(title), rules)?;
    let output = if timestamp {
        stamped(output)
    } else {
        output.to_path_buf()
    };

    let summary = convert_file(input, &output, &config)
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    println!(
        "Wrote {} with {} sheet(s), {} row(s)",
        output.display(),
        summary.sheets,
        summary.total_rows
    );
    if summary.malformed_rows > 0 {
        println!(
            "  {} malformed row(s) were padded with empty fields",
            summary.malformed_rows
        );
    }
    Ok(())
}

fn preview(input: &Path, limit: usize, rules: Option<&Path>) -> Result<()> {
    let config = load_config(None, rules)?;
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let plan = plan_report(&bytes, &config)?;

    println!("{} row(s) across {} sheet(s):", plan.total_rows, plan.sheets.len());
    if plan.malformed_rows > 0 {
        println!("  {} malformed row(s)", plan.malformed_rows);
    }
    for sheet in &plan.sheets {
        println!();
        println!(
            "{} - {} row(s) [tab: {}]",
            sheet.label,
            sheet.rows.len(),
            sheet.sheet_name
        );
        println!("  {}", sheet.columns.join(" | "));
        for row in sheet.rows.iter().take(limit) {
            println!("  {}", row.join(" | "));
        }
        if sheet.rows.len() > limit {
            println!("  ... {} more row(s)", sheet.rows.len() - limit);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamped_keeps_stem_and_extension() {
        let path = stamped(Path::new("Inventario_Organizado.xlsx"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Inventario_Organizado_"));
        assert!(name.ends_with(".xlsx"));
    }
}
