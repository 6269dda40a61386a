//! Canonical state and query types for the data-grid engine.
//!
//! This crate defines the data model shared by every engine component:
//!
//! - **row**: dynamic row records and cell value helpers
//! - **column**: column specifications with value resolution and formatting
//! - **filter**: filter rules, groups, operators, and column types
//! - **sort**: multi-key sort descriptors
//! - **pagination**: page index/size state
//! - **selection**: include/exclude selection state and host snapshots
//! - **query**: the derived canonical query handed to fetch and export
//! - **snapshot**: persisted layout and session shapes

pub mod column;
pub mod filter;
pub mod pagination;
pub mod query;
pub mod row;
pub mod selection;
pub mod snapshot;
pub mod sort;

pub use column::ColumnSpec;
pub use filter::{ColumnType, FilterGroup, FilterLogic, FilterOperator, FilterRule};
pub use pagination::PaginationState;
pub use query::CanonicalQuery;
pub use row::{Row, value_display, value_is_empty, value_to_f64};
pub use selection::{SelectionKind, SelectionSnapshot, SelectionState};
pub use snapshot::{ColumnPinning, LayoutSnapshot, SessionSnapshot};
pub use sort::{SortDirection, SortEntry};
