//! Coordinator behavior: debounce coalescing, dedup suppression,
//! stale-result discard, and failure retention.
//!
//! Timing-sensitive tests use a short debounce window and poll for
//! outcomes instead of sleeping fixed amounts.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use grid_fetch::{
    ClientSource, DataSource, FetchCoordinator, FetchError, Page, RequestOutcome, ServerSource,
};
use grid_model::row::Row;
use grid_model::{CanonicalQuery, ColumnSpec};
use serde_json::json;

const DEBOUNCE: Duration = Duration::from_millis(20);

fn query_with_filter(text: &str) -> CanonicalQuery {
    CanonicalQuery {
        global_filter: text.to_string(),
        ..Default::default()
    }
}

fn echo_row(text: &str) -> Row {
    Row::from_value(json!({"echo": text}))
}

/// Poll until the condition holds or two seconds pass.
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

/// Source that records every executed fetch and echoes the query's
/// global filter back as the single row.
fn counting_source(calls: Arc<AtomicUsize>) -> Arc<dyn DataSource> {
    Arc::new(ServerSource::new(move |query: &CanonicalQuery| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Page {
            rows: vec![echo_row(&query.global_filter)],
            total: 1,
        })
    }))
}

#[test]
fn rapid_requests_coalesce_to_one_fetch_with_last_query() {
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator = FetchCoordinator::new(counting_source(Arc::clone(&calls)), DEBOUNCE);

    for text in ["a", "ab", "abc", "abcd", "abcde"] {
        assert_eq!(
            coordinator.request(&query_with_filter(text)),
            RequestOutcome::Scheduled
        );
    }

    assert!(wait_until(|| coordinator.total() == 1));
    // Let any (incorrect) extra fetches surface.
    std::thread::sleep(DEBOUNCE * 4);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.rows()[0].get("echo"), Some(&json!("abcde")));
}

#[test]
fn identical_query_after_completion_is_suppressed() {
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator = FetchCoordinator::new(counting_source(Arc::clone(&calls)), DEBOUNCE);

    let query = query_with_filter("same");
    assert_eq!(coordinator.request(&query), RequestOutcome::Scheduled);
    assert!(wait_until(|| calls.load(Ordering::SeqCst) == 1));
    assert!(wait_until(|| !coordinator.is_loading()));

    assert_eq!(coordinator.request(&query), RequestOutcome::Suppressed);
    std::thread::sleep(DEBOUNCE * 4);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn stale_result_never_overwrites_newer_one() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_source = Arc::clone(&calls);
    let source = Arc::new(ServerSource::new(move |query: &CanonicalQuery| {
        calls_in_source.fetch_add(1, Ordering::SeqCst);
        if query.global_filter == "slow" {
            std::thread::sleep(Duration::from_millis(150));
        }
        Ok(Page {
            rows: vec![echo_row(&query.global_filter)],
            total: 1,
        })
    }));
    let coordinator = FetchCoordinator::new(source, DEBOUNCE);

    coordinator.request(&query_with_filter("slow"));
    // Wait for the slow fetch to start executing, then supersede it.
    assert!(wait_until(|| coordinator.is_loading()));
    coordinator.request(&query_with_filter("fast"));

    assert!(wait_until(|| calls.load(Ordering::SeqCst) == 2));
    assert!(wait_until(|| {
        let rows = coordinator.rows();
        !rows.is_empty() && rows[0].get("echo") == Some(&json!("fast"))
    }));
    // The slow result must not reappear.
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(coordinator.rows()[0].get("echo"), Some(&json!("fast")));
}

#[test]
fn failed_fetch_keeps_previous_rows_and_clears_loading() {
    let source = Arc::new(ServerSource::new(|query: &CanonicalQuery| {
        if query.global_filter == "boom" {
            Err(FetchError::source("backend unavailable"))
        } else {
            Ok(Page {
                rows: vec![echo_row(&query.global_filter)],
                total: 1,
            })
        }
    }));
    let coordinator = FetchCoordinator::new(source, DEBOUNCE);

    coordinator.request(&query_with_filter("good"));
    assert!(wait_until(|| coordinator.total() == 1));

    coordinator.request(&query_with_filter("boom"));
    assert!(wait_until(|| !coordinator.is_loading()));
    std::thread::sleep(DEBOUNCE * 4);
    assert_eq!(coordinator.rows()[0].get("echo"), Some(&json!("good")));
    assert_eq!(coordinator.total(), 1);
}

#[test]
fn failed_query_is_not_dedup_suppressed_on_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_source = Arc::clone(&calls);
    let source = Arc::new(ServerSource::new(move |_: &CanonicalQuery| {
        calls_in_source.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::source("down"))
    }));
    let coordinator = FetchCoordinator::new(source, DEBOUNCE);

    let query = query_with_filter("q");
    coordinator.request(&query);
    assert!(wait_until(|| calls.load(Ordering::SeqCst) == 1));
    assert!(wait_until(|| !coordinator.is_loading()));

    // Dedup compares against the last *completed* request only.
    assert_eq!(coordinator.request(&query), RequestOutcome::Scheduled);
    assert!(wait_until(|| calls.load(Ordering::SeqCst) == 2));
}

#[test]
fn client_source_plugs_in_unchanged() {
    let rows: Vec<Row> = (0..30)
        .map(|i| Row::from_value(json!({"id": i.to_string(), "n": i})))
        .collect();
    let source = Arc::new(ClientSource::new(
        rows,
        vec![ColumnSpec::new("n", "N")],
    ));
    let coordinator = FetchCoordinator::new(source, DEBOUNCE);

    let mut query = CanonicalQuery::default();
    query.pagination = grid_model::PaginationState::new(1, 10);
    coordinator.request(&query);

    assert!(wait_until(|| coordinator.total() == 30));
    let page = coordinator.rows();
    assert_eq!(page.len(), 10);
    assert_eq!(page[0].get("n"), Some(&json!(10)));
}

#[test]
fn pull_mode_rejects_stale_tickets() {
    use std::sync::Mutex;

    let tickets = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&tickets);
    let coordinator = FetchCoordinator::pull(
        move |ticket, _query| sink.lock().unwrap().push(ticket),
        DEBOUNCE,
    );

    coordinator.request(&query_with_filter("first"));
    assert!(wait_until(|| tickets.lock().unwrap().len() == 1));
    let first = tickets.lock().unwrap()[0].clone();

    coordinator.request(&query_with_filter("second"));
    assert!(wait_until(|| tickets.lock().unwrap().len() == 2));
    let second = tickets.lock().unwrap()[1].clone();

    // The first ticket is now stale.
    assert!(!coordinator.apply_result(
        &first,
        Page {
            rows: vec![echo_row("first")],
            total: 1,
        }
    ));
    assert!(coordinator.apply_result(
        &second,
        Page {
            rows: vec![echo_row("second")],
            total: 1,
        }
    ));
    assert_eq!(coordinator.rows()[0].get("echo"), Some(&json!("second")));
    assert!(!coordinator.is_loading());
}

#[test]
fn stale_pull_resolution_leaves_loading_set_for_the_newer_fetch() {
    use std::sync::Mutex;

    let tickets = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&tickets);
    let coordinator = FetchCoordinator::pull(
        move |ticket, _query| sink.lock().unwrap().push(ticket),
        DEBOUNCE,
    );

    coordinator.request(&query_with_filter("first"));
    assert!(wait_until(|| tickets.lock().unwrap().len() == 1));
    let first = tickets.lock().unwrap()[0].clone();

    coordinator.request(&query_with_filter("second"));
    assert!(wait_until(|| tickets.lock().unwrap().len() == 2));
    let second = tickets.lock().unwrap()[1].clone();
    assert!(coordinator.is_loading());

    // Neither a stale result nor a stale failure may clear the flag
    // while the second fetch is still outstanding.
    assert!(!coordinator.apply_result(
        &first,
        Page {
            rows: vec![echo_row("first")],
            total: 1,
        }
    ));
    assert!(coordinator.is_loading());
    coordinator.report_failure(&first, "abandoned backend call");
    assert!(coordinator.is_loading());

    assert!(coordinator.apply_result(
        &second,
        Page {
            rows: vec![echo_row("second")],
            total: 1,
        }
    ));
    assert!(!coordinator.is_loading());
}
