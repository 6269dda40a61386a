//! Command implementations: `query` and `export`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use grid_engine::{EngineConfig, GridEngine};
use grid_export::{ExportFormat, ExportUpdate};
use grid_fetch::{ClientSource, FetchUpdate};
use grid_model::{
    ColumnType, FilterLogic, FilterOperator, FilterRule, SortDirection, SortEntry,
};
use serde_json::{Value, json};

use crate::cli::{ExportArgs, ExportFormatArg, QueryArgs, ViewArgs};
use crate::data::{derive_columns, load_rows};
use crate::render::{page_footer, page_table};

/// A short debounce keeps one-shot commands responsive while still
/// coalescing the construction fetch with the flag-driven mutations.
const CLI_DEBOUNCE: Duration = Duration::from_millis(25);
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub fn run_query(args: &QueryArgs) -> Result<()> {
    let (mut engine, updates) = build_engine(&args.view, args.page_size)?;
    engine.set_page_index(args.page);
    apply_view(&mut engine, &args.view)?;
    wait_for_rows(&engine, &updates)?;

    let rows = engine.rows();
    let total = engine.total();
    let pagination = engine.state().pagination;
    println!("{}", page_table(engine.columns(), &rows));
    println!(
        "{}",
        page_footer(
            pagination.page_index,
            pagination.total_pages(total as usize),
            rows.len(),
            total,
        )
    );
    Ok(())
}

pub fn run_export(args: &ExportArgs) -> Result<()> {
    let (mut engine, updates) = build_engine(&args.view, 25)?;
    apply_view(&mut engine, &args.view)?;
    // The engine pages through the source itself; the interactive
    // fetch result is irrelevant, but waiting avoids exporting before
    // a fetch failure would have surfaced.
    wait_for_rows(&engine, &updates)?;

    let format = match args.format {
        ExportFormatArg::Csv => ExportFormat::Csv,
        ExportFormatArg::Workbook => ExportFormat::Workbook,
    };

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")?
            .progress_chars("=> "),
    );

    let (sender, receiver) = unbounded();
    let _handle = engine.start_export(format, &args.output, sender)?;

    let result = loop {
        match receiver.recv() {
            Ok(ExportUpdate::Progress(progress)) => {
                bar.set_position(u64::from(progress.percentage));
                bar.set_message(format!("{} rows", progress.processed_rows));
            }
            Ok(ExportUpdate::Complete(result)) => break result,
            Ok(ExportUpdate::Error(error)) => {
                bar.abandon();
                bail!("export failed: {error}");
            }
            Ok(ExportUpdate::Cancelled) => {
                bar.abandon();
                bail!("export cancelled");
            }
            Err(_) => bail!("export worker stopped unexpectedly"),
        }
    };
    bar.finish_and_clear();

    info!(rows = result.rows_exported, "export finished");
    println!(
        "exported {} rows to {} in {} ms",
        result.rows_exported,
        result.path.display(),
        result.elapsed_ms
    );
    Ok(())
}

// ============================================================================
// Engine Setup
// ============================================================================

fn build_engine(view: &ViewArgs, page_size: usize) -> Result<(GridEngine, Receiver<FetchUpdate>)> {
    let rows = load_rows(&view.data_file)?;
    let columns = derive_columns(&rows);
    info!(
        rows = rows.len(),
        columns = columns.len(),
        file = %view.data_file.display(),
        "loaded row file"
    );

    let source = Arc::new(ClientSource::new(rows, columns.clone()));
    let config = EngineConfig {
        debounce: CLI_DEBOUNCE,
        page_size,
        ..EngineConfig::default()
    };
    let (sender, receiver) = unbounded();
    let engine = GridEngine::with_updates(source, columns, config, sender);
    Ok((engine, receiver))
}

fn apply_view(engine: &mut GridEngine, view: &ViewArgs) -> Result<()> {
    for spec in &view.filters {
        let rule = parse_filter(spec)?;
        engine.add_filter(rule);
    }
    if view.any {
        engine.set_filter_logic(FilterLogic::Or);
    }
    if !view.filters.is_empty() || view.any {
        engine.apply_filters();
    }
    let sorting: Vec<SortEntry> = view
        .sort
        .iter()
        .map(|spec| parse_sort(spec))
        .collect::<Result<_>>()?;
    if !sorting.is_empty() {
        engine.set_sorting(sorting);
    }
    if let Some(search) = &view.search {
        engine.set_global_filter(search.clone());
    }
    if view.show_deleted {
        engine.set_show_deleted(true);
    }
    Ok(())
}

/// Block until the coalesced fetch for the applied view completes.
fn wait_for_rows(engine: &GridEngine, updates: &Receiver<FetchUpdate>) -> Result<()> {
    let deadline = Instant::now() + LOAD_TIMEOUT;
    let mut loaded = false;
    loop {
        match updates.recv_timeout(Duration::from_millis(50)) {
            Ok(FetchUpdate::Loaded { .. }) => loaded = true,
            Ok(FetchUpdate::Failed { message }) => bail!("fetch failed: {message}"),
            Ok(FetchUpdate::Started) => {}
            Err(RecvTimeoutError::Timeout) => {
                if loaded && !engine.is_loading() {
                    return Ok(());
                }
                if Instant::now() > deadline {
                    bail!("timed out waiting for rows");
                }
            }
            Err(RecvTimeoutError::Disconnected) => bail!("fetch worker stopped"),
        }
    }
}

// ============================================================================
// Flag Parsing
// ============================================================================

/// Parse `column:operator[:value]` into a filter rule, inferring the
/// column type from the operator and value shape.
fn parse_filter(spec: &str) -> Result<FilterRule> {
    let mut parts = spec.splitn(3, ':');
    let column = parts
        .next()
        .filter(|s| !s.is_empty())
        .with_context(|| format!("filter {spec:?}: missing column"))?;
    let operator_name = parts
        .next()
        .filter(|s| !s.is_empty())
        .with_context(|| format!("filter {spec:?}: missing operator"))?;
    let operator: FilterOperator = serde_json::from_value(Value::String(operator_name.into()))
        .map_err(|_| anyhow::anyhow!("filter {spec:?}: unknown operator {operator_name:?}"))?;
    let raw_value = parts.next();

    let needs_value = !matches!(operator, FilterOperator::IsEmpty | FilterOperator::IsNotEmpty);
    if needs_value && raw_value.is_none() {
        bail!("filter {spec:?}: operator {operator_name} needs a value");
    }
    let raw = raw_value.unwrap_or_default();

    let (value, column_type) = match operator {
        FilterOperator::IsEmpty | FilterOperator::IsNotEmpty => (Value::Null, ColumnType::Text),
        FilterOperator::Is => (json!(raw), ColumnType::Boolean),
        FilterOperator::After | FilterOperator::Before => (json!(raw), ColumnType::Date),
        FilterOperator::In | FilterOperator::NotIn => {
            let members: Vec<Value> = raw.split(',').map(|m| json!(m.trim())).collect();
            (Value::Array(members), ColumnType::Select)
        }
        FilterOperator::GreaterThan
        | FilterOperator::GreaterThanOrEqual
        | FilterOperator::LessThan
        | FilterOperator::LessThanOrEqual => {
            let number: f64 = raw
                .parse()
                .with_context(|| format!("filter {spec:?}: {raw:?} is not a number"))?;
            (json!(number), ColumnType::Number)
        }
        FilterOperator::Equals | FilterOperator::NotEquals => match raw.parse::<f64>() {
            Ok(number) => (json!(number), ColumnType::Number),
            Err(_) => (json!(raw), ColumnType::Text),
        },
        FilterOperator::Contains
        | FilterOperator::NotContains
        | FilterOperator::StartsWith
        | FilterOperator::EndsWith => (json!(raw), ColumnType::Text),
    };

    Ok(FilterRule::new(column, operator, value, column_type))
}

/// Parse `column` or `column:asc|desc`.
fn parse_sort(spec: &str) -> Result<SortEntry> {
    let (column, direction) = match spec.split_once(':') {
        None => (spec, SortDirection::Asc),
        Some((column, "asc")) => (column, SortDirection::Asc),
        Some((column, "desc")) => (column, SortDirection::Desc),
        Some((_, other)) => bail!("sort {spec:?}: unknown direction {other:?}"),
    };
    if column.is_empty() {
        bail!("sort {spec:?}: missing column");
    }
    Ok(SortEntry::new(column, direction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_specs_parse_with_inferred_types() {
        let rule = parse_filter("age:greaterThan:30").unwrap();
        assert_eq!(rule.operator, FilterOperator::GreaterThan);
        assert_eq!(rule.column_type, ColumnType::Number);
        assert_eq!(rule.value, json!(30.0));

        let rule = parse_filter("name:contains:jo").unwrap();
        assert_eq!(rule.column_type, ColumnType::Text);

        let rule = parse_filter("status:in:active,pending").unwrap();
        assert_eq!(rule.column_type, ColumnType::Select);
        assert_eq!(rule.value, json!(["active", "pending"]));

        let rule = parse_filter("notes:isEmpty").unwrap();
        assert_eq!(rule.value, Value::Null);
    }

    #[test]
    fn bad_filter_specs_are_rejected() {
        assert!(parse_filter("age").is_err());
        assert!(parse_filter("age:squintsAt:3").is_err());
        assert!(parse_filter("age:greaterThan").is_err());
        assert!(parse_filter("age:greaterThan:abc").is_err());
        assert!(parse_filter(":contains:x").is_err());
    }

    #[test]
    fn sort_specs_parse() {
        assert_eq!(
            parse_sort("age").unwrap(),
            SortEntry::new("age", SortDirection::Asc)
        );
        assert_eq!(
            parse_sort("age:desc").unwrap(),
            SortEntry::new("age", SortDirection::Desc)
        );
        assert!(parse_sort("age:upwards").is_err());
    }
}
