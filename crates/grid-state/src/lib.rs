//! Table state store and selection engine.
//!
//! - **store**: the single source of truth for sorting, pagination,
//!   global filter, draft/applied column filters, and column layout;
//!   pure update operations with synchronous listener notification
//! - **selection**: the include/exclude selection engine, a second
//!   independent store with page/all scoping
//! - **feature**: the extension seam composed into the store at
//!   construction

pub mod feature;
pub mod selection;
pub mod store;

pub use feature::{ColumnFilterFeature, ShowDeletedFeature, TableFeature};
pub use selection::{SelectionEngine, SelectionMode};
pub use store::{TableState, TableStore};
