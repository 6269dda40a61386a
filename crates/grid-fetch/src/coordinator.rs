//! The debounced fetch coordinator.
//!
//! State changes arrive as canonical queries; the coordinator owes the
//! grid three guarantees:
//!
//! 1. rapid successive changes within the debounce window coalesce into
//!    one fetch, using the newest query;
//! 2. a query equal to the last *completed* one is suppressed entirely
//!    (re-renders that re-derive an identical query cost nothing);
//! 3. only the result matching the most-recently-issued request is ever
//!    applied - an older, slower request that resolves late is
//!    discarded, so result application is monotonic.
//!
//! Guarantee 3 is a generation counter, not a lock: every request bumps
//! it, every resolution compares against it. Fetch failures are logged
//! and swallowed here; previously loaded rows stay put so the grid
//! never flashes empty.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, warn};

use grid_model::CanonicalQuery;
use grid_model::row::Row;

use crate::source::{DataSource, Page};

/// Outcome of asking the coordinator to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Query equals the last completed one; nothing scheduled.
    Suppressed,
    /// A (debounced) fetch was scheduled.
    Scheduled,
}

/// Token handed to pull-mode hosts with each query notification. The
/// host must present it when applying results so stale responses can
/// be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    key: String,
}

impl FetchTicket {
    /// The comparison key of the query this ticket was issued for.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Notifications emitted as fetches progress.
#[derive(Debug, Clone)]
pub enum FetchUpdate {
    /// A fetch started executing (debounce elapsed).
    Started,
    /// Rows and total were replaced.
    Loaded { total: u64 },
    /// The source failed; loaded rows were retained.
    Failed { message: String },
}

/// Who does the fetching.
enum Mode {
    /// The coordinator invokes the source itself.
    Push(Arc<dyn DataSource>),
    /// The host is notified and fetches on its own, applying results
    /// back with the ticket.
    Pull(Box<dyn Fn(FetchTicket, &CanonicalQuery) + Send>),
}

struct Job {
    query: CanonicalQuery,
    key: String,
    generation: u64,
}

enum Msg {
    Request(Job),
    Shutdown,
}

#[derive(Default)]
struct LoadedData {
    rows: Vec<Row>,
    total: u64,
}

struct Shared {
    data: Mutex<LoadedData>,
    last_completed_key: Mutex<Option<String>>,
    loading: AtomicBool,
    generation: AtomicU64,
}

/// Debounces, deduplicates, and serializes fetches for one table.
pub struct FetchCoordinator {
    shared: Arc<Shared>,
    sender: Sender<Msg>,
    worker: Option<JoinHandle<()>>,
}

impl FetchCoordinator {
    /// Push-mode coordinator: fetches run on the worker thread.
    pub fn new(source: Arc<dyn DataSource>, debounce: Duration) -> Self {
        Self::spawn(Mode::Push(source), debounce, None)
    }

    /// Push-mode coordinator that also emits `FetchUpdate`s.
    pub fn with_updates(
        source: Arc<dyn DataSource>,
        debounce: Duration,
        updates: Sender<FetchUpdate>,
    ) -> Self {
        Self::spawn(Mode::Push(source), debounce, Some(updates))
    }

    /// Pull-mode coordinator: the host fetches on notification.
    pub fn pull(
        on_query: impl Fn(FetchTicket, &CanonicalQuery) + Send + 'static,
        debounce: Duration,
    ) -> Self {
        Self::spawn(Mode::Pull(Box::new(on_query)), debounce, None)
    }

    fn spawn(mode: Mode, debounce: Duration, updates: Option<Sender<FetchUpdate>>) -> Self {
        let shared = Arc::new(Shared {
            data: Mutex::new(LoadedData::default()),
            last_completed_key: Mutex::new(None),
            loading: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        });
        let (sender, receiver) = unbounded();
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || {
            run_worker(&worker_shared, &receiver, &mode, debounce, updates.as_ref());
        });

        Self {
            shared,
            sender,
            worker: Some(worker),
        }
    }

    /// Schedule a fetch for a new canonical query.
    ///
    /// Returns `Suppressed` when the query deep-equals the last
    /// completed one - redundant re-renders produce no traffic.
    pub fn request(&self, query: &CanonicalQuery) -> RequestOutcome {
        let key = query.comparison_key();
        {
            let last = self
                .shared
                .last_completed_key
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if last.as_deref() == Some(key.as_str()) {
                debug!("query unchanged since last completed fetch; suppressing");
                return RequestOutcome::Suppressed;
            }
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let job = Job {
            query: query.clone(),
            key,
            generation,
        };
        if self.sender.send(Msg::Request(job)).is_err() {
            warn!("fetch worker is gone; request dropped");
            return RequestOutcome::Suppressed;
        }
        RequestOutcome::Scheduled
    }

    /// Apply a pull-mode result. Returns `false` (and changes nothing)
    /// when the ticket is stale.
    pub fn apply_result(&self, ticket: &FetchTicket, page: Page) -> bool {
        let current = self.shared.generation.load(Ordering::SeqCst);
        if ticket.generation != current {
            // A stale resolution changes nothing, including the
            // loading flag: the current request is still outstanding.
            debug!(
                ticket = ticket.generation,
                current, "stale pull result discarded"
            );
            return false;
        }
        self.shared.loading.store(false, Ordering::SeqCst);
        apply_page(&self.shared, &ticket.key, page);
        true
    }

    /// Record a pull-mode failure: loading clears, rows stay. Stale
    /// tickets change nothing.
    pub fn report_failure(&self, ticket: &FetchTicket, message: &str) {
        warn!(ticket = ticket.generation, message, "pull fetch failed");
        if ticket.generation == self.shared.generation.load(Ordering::SeqCst) {
            self.shared.loading.store(false, Ordering::SeqCst);
        }
    }

    /// Forget the last completed query so the next `request` is never
    /// dedup-suppressed. Used by forced refreshes.
    pub fn invalidate(&self) {
        let mut last = self
            .shared
            .last_completed_key
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *last = None;
    }

    /// Currently loaded page rows.
    pub fn rows(&self) -> Vec<Row> {
        self.shared
            .data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rows
            .clone()
    }

    /// Last known matching-row total (feeds `selected_count`).
    pub fn total(&self) -> u64 {
        self.shared
            .data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .total
    }

    /// Whether a fetch is executing.
    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst)
    }
}

impl Drop for FetchCoordinator {
    fn drop(&mut self) {
        let _ = self.sender.send(Msg::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("loading", &self.is_loading())
            .field("total", &self.total())
            .finish()
    }
}

// ============================================================================
// Worker
// ============================================================================

fn run_worker(
    shared: &Arc<Shared>,
    receiver: &Receiver<Msg>,
    mode: &Mode,
    debounce: Duration,
    updates: Option<&Sender<FetchUpdate>>,
) {
    while let Ok(msg) = receiver.recv() {
        let mut job = match msg {
            Msg::Request(job) => job,
            Msg::Shutdown => return,
        };

        // Debounce: keep absorbing newer requests until the window is
        // quiet. Only the newest job survives.
        loop {
            match receiver.recv_timeout(debounce) {
                Ok(Msg::Request(newer)) => job = newer,
                Ok(Msg::Shutdown) => return,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        // A request may have landed between the timeout and here.
        if job.generation != shared.generation.load(Ordering::SeqCst) {
            continue;
        }

        shared.loading.store(true, Ordering::SeqCst);
        notify(updates, FetchUpdate::Started);

        match mode {
            Mode::Push(source) => {
                let result = source.fetch(&job.query);
                match result {
                    Ok(page) => {
                        if job.generation == shared.generation.load(Ordering::SeqCst) {
                            let total = page.total;
                            apply_page(shared, &job.key, page);
                            notify(updates, FetchUpdate::Loaded { total });
                        } else {
                            debug!(
                                generation = job.generation,
                                "stale fetch result discarded"
                            );
                        }
                    }
                    Err(error) => {
                        // Loaded rows are retained; the host surfaces
                        // the failure through its own channel.
                        warn!(%error, "fetch failed; keeping previous rows");
                        notify(
                            updates,
                            FetchUpdate::Failed {
                                message: error.to_string(),
                            },
                        );
                    }
                }
                shared.loading.store(false, Ordering::SeqCst);
            }
            Mode::Pull(on_query) => {
                let ticket = FetchTicket {
                    generation: job.generation,
                    key: job.key.clone(),
                };
                // Loading stays set until the host applies or reports.
                on_query(ticket, &job.query);
            }
        }
    }
}

fn apply_page(shared: &Arc<Shared>, key: &str, page: Page) {
    {
        let mut data = shared.data.lock().unwrap_or_else(|e| e.into_inner());
        data.rows = page.rows;
        data.total = page.total;
    }
    let mut last = shared
        .last_completed_key
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    *last = Some(key.to_string());
}

fn notify(updates: Option<&Sender<FetchUpdate>>, update: FetchUpdate) {
    if let Some(sender) = updates {
        let _ = sender.send(update);
    }
}
