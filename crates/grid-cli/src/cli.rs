//! CLI argument definitions for the grid tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "grid",
    version,
    about = "Data-grid query and export tool",
    long_about = "Run filtered, sorted, paginated queries over JSON or CSV row\n\
                  files, and export the matching rows to CSV or a spreadsheet\n\
                  workbook."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Query a row file and print one page as a table.
    Query(QueryArgs),

    /// Export every matching row to an artifact file.
    Export(ExportArgs),
}

/// Flags shared by `query` and `export`: everything that shapes the
/// canonical query.
#[derive(Parser)]
pub struct ViewArgs {
    /// Path to the row file (.json array of objects, or .csv).
    #[arg(value_name = "DATA_FILE")]
    pub data_file: PathBuf,

    /// Column filter as `column:operator:value`, repeatable.
    ///
    /// Operators use the wire names: contains, equals, startsWith,
    /// endsWith, greaterThan, lessThan, greaterThanOrEqual,
    /// lessThanOrEqual, notEquals, isEmpty, isNotEmpty, is, after,
    /// before, in, notIn. `in`/`notIn` take comma-separated values.
    #[arg(long = "filter", value_name = "RULE")]
    pub filters: Vec<String>,

    /// Combine filters with OR instead of AND.
    #[arg(long = "any")]
    pub any: bool,

    /// Free-text filter across all columns.
    #[arg(long = "search", value_name = "TEXT")]
    pub search: Option<String>,

    /// Sort as `column` (ascending) or `column:desc`, repeatable.
    #[arg(long = "sort", value_name = "ORDER")]
    pub sort: Vec<String>,

    /// Include soft-deleted rows (those with `deleted: true`).
    #[arg(long = "show-deleted")]
    pub show_deleted: bool,
}

#[derive(Parser)]
pub struct QueryArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Page to display (zero-based).
    #[arg(long = "page", default_value_t = 0)]
    pub page: usize,

    /// Rows per page.
    #[arg(long = "page-size", default_value_t = 25)]
    pub page_size: usize,
}

#[derive(Parser)]
pub struct ExportArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Output file path.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: PathBuf,

    /// Artifact format.
    #[arg(long = "format", value_enum, default_value = "csv")]
    pub format: ExportFormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormatArg {
    Csv,
    Workbook,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
