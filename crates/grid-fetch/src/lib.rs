//! Fetch coordination for the data-grid engine.
//!
//! - **source**: the `DataSource` contract plus the two built-in
//!   implementations - `ClientSource` (local filter/sort/paginate over
//!   resident rows) and `ServerSource` (host callback)
//! - **coordinator**: the debounced worker that turns canonical-query
//!   changes into at most one fetch per quiet period, discards stale
//!   results by generation token, and retains loaded rows across
//!   failures
//!
//! The coordinator does not care whether data is local or remote; it
//! only cares *who* evaluates the query, which is the source's job.

pub mod coordinator;
pub mod error;
pub mod source;

pub use coordinator::{FetchCoordinator, FetchTicket, FetchUpdate, RequestOutcome};
pub use error::FetchError;
pub use source::{ClientSource, DataSource, Page, ServerSource};

/// Default debounce window between a state change and the fetch it
/// triggers.
pub const DEFAULT_DEBOUNCE: std::time::Duration = std::time::Duration::from_millis(300);
