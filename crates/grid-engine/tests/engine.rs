//! Facade behavior: a state mutation on the engine is all it takes to
//! load data, select rows, and export the matching set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use grid_engine::{EngineConfig, GridEngine};
use grid_export::{ExportFormat, ExportUpdate};
use grid_fetch::{ClientSource, Page, ServerSource};
use grid_model::{ColumnSpec, ColumnType, FilterOperator, FilterRule, SortDirection};
use serde_json::json;

fn config() -> EngineConfig {
    EngineConfig {
        debounce: Duration::from_millis(10),
        page_size: 10,
        ..EngineConfig::default()
    }
}

fn people_engine(n: usize) -> GridEngine {
    let rows = (0..n)
        .map(|i| {
            grid_model::Row::from_value(json!({
                "id": format!("r{i}"),
                "name": format!("Person {i}"),
                "age": 20 + (i % 50),
            }))
        })
        .collect();
    let columns = vec![
        ColumnSpec::new("name", "Name"),
        ColumnSpec::new("age", "Age"),
    ];
    let source = Arc::new(ClientSource::new(rows, columns.clone()));
    GridEngine::new(source, columns, config())
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn construction_schedules_the_initial_fetch() {
    let engine = people_engine(30);
    assert!(wait_until(|| engine.total() == 30));
    assert_eq!(engine.rows().len(), 10);
}

#[test]
fn global_filter_change_refetches() {
    let mut engine = people_engine(30);
    assert!(wait_until(|| engine.total() == 30));

    engine.set_global_filter("Person 1");
    // Matches "Person 1" and "Person 10".."Person 19".
    assert!(wait_until(|| engine.total() == 11));
}

#[test]
fn cycle_sort_walks_asc_desc_unsorted() {
    let mut engine = people_engine(5);

    engine.cycle_sort("age");
    assert_eq!(engine.state().sorting.len(), 1);
    assert_eq!(engine.state().sorting[0].direction, SortDirection::Asc);

    engine.cycle_sort("age");
    assert_eq!(engine.state().sorting[0].direction, SortDirection::Desc);

    engine.cycle_sort("age");
    assert!(engine.state().sorting.is_empty());
}

#[test]
fn draft_filters_fetch_only_on_apply() {
    let mut engine = people_engine(30);
    assert!(wait_until(|| engine.total() == 30));

    let rule_id = engine.add_filter(FilterRule::new(
        "age",
        FilterOperator::LessThan,
        json!(25),
        ColumnType::Number,
    ));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(engine.total(), 30);

    engine.apply_filters();
    // Ages run 20..49, so age < 25 keeps five rows.
    assert!(wait_until(|| engine.total() == 5));

    engine.set_filter_value(&rule_id, json!(30));
    engine.apply_filters();
    assert!(wait_until(|| engine.total() == 10));
}

#[test]
fn select_all_on_page_then_count() {
    let mut engine = people_engine(30);
    assert!(wait_until(|| engine.rows().len() == 10));

    engine.select_all();
    assert!(engine.is_all_selected());
    assert_eq!(engine.selected_count(), 10);

    let first = engine.rows()[0].clone();
    engine.toggle_row(&first);
    assert!(engine.is_some_selected());
    assert!(!engine.is_all_selected());
    assert_eq!(engine.selected_count(), 9);
}

#[test]
fn pagination_clamps_at_the_last_page() {
    let mut engine = people_engine(25);
    assert!(wait_until(|| engine.total() == 25));

    engine.next_page();
    engine.next_page();
    assert_eq!(engine.state().pagination.page_index, 2);
    engine.next_page(); // already on the last of 3 pages
    assert_eq!(engine.state().pagination.page_index, 2);

    engine.previous_page();
    assert_eq!(engine.state().pagination.page_index, 1);
}

#[test]
fn export_covers_all_pages_and_honors_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let mut engine = people_engine(25);
    assert!(wait_until(|| engine.rows().len() == 10));

    // Select the loaded page, minus one row.
    engine.select_all();
    let first = engine.rows()[0].clone();
    engine.deselect_row(&first);

    let (sender, receiver) = crossbeam_channel::unbounded();
    let _handle = engine
        .start_export(ExportFormat::Csv, &path, sender)
        .unwrap();

    let result = loop {
        match receiver.recv().unwrap() {
            ExportUpdate::Progress(_) => {}
            ExportUpdate::Complete(result) => break result,
            other => panic!("unexpected update: {other:?}"),
        }
    };
    assert_eq!(result.rows_exported, 9);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 10); // header + 9 rows
}

#[test]
fn session_round_trip_through_the_facade() {
    let mut engine = people_engine(30);
    assert!(wait_until(|| engine.total() == 30));

    engine.set_global_filter("Person 2");
    engine.cycle_sort("age");
    assert!(wait_until(|| engine.total() == 11));
    let session = engine.session_snapshot();

    let mut restored = people_engine(30);
    restored.restore_session(&session);
    assert!(wait_until(|| restored.total() == 11));
    assert_eq!(restored.state().global_filter, "Person 2");
    assert_eq!(restored.state().sorting, engine.state().sorting);
}

#[test]
fn refresh_bypasses_dedup() {
    let mut engine = people_engine(5);
    assert!(wait_until(|| engine.total() == 5));

    // Same query again would normally be suppressed.
    assert_eq!(
        engine.refresh(),
        grid_fetch::RequestOutcome::Scheduled
    );
}

#[test]
fn store_notification_after_refresh_with_selection_is_deduped() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let source = Arc::new(ServerSource::new(
        move |_query: &grid_model::CanonicalQuery| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Page {
                rows: vec![grid_model::Row::from_value(json!({"id": "r0"}))],
                total: 1,
            })
        },
    ));
    let mut engine = GridEngine::new(source, vec![ColumnSpec::new("id", "Id")], config());
    assert!(wait_until(|| calls.load(Ordering::SeqCst) == 1));
    assert!(wait_until(|| !engine.is_loading()));

    engine.select_id("r0");
    assert_eq!(engine.refresh(), grid_fetch::RequestOutcome::Scheduled);
    assert!(wait_until(|| calls.load(Ordering::SeqCst) == 2));
    assert!(wait_until(|| !engine.is_loading()));

    // A state change re-deriving the same query must be suppressed
    // even while a selection is active.
    engine.apply_filters();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
