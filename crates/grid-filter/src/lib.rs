//! Filter rule compilation for the data-grid engine.
//!
//! This crate turns `FilterRule`s into executable row predicates and
//! combines them under AND/OR logic:
//!
//! - **operators**: the registration-validated operator table mapping
//!   `(ColumnType, FilterOperator)` pairs to predicate builders
//! - **compile**: rule compilation and group combination
//! - **query_node**: the declarative `{and|or: [...]}` tree emitted for
//!   server-delegated evaluation
//!
//! Compilation is fail-open throughout: an incomplete rule (missing or
//! empty value for a value-requiring operator) or an unregistered
//! operator/type pair compiles to "no constraint", never to "match
//! nothing" and never to an error.

pub mod compile;
pub mod operators;
pub mod query_node;

pub use compile::{CompiledGroup, combine, compile_group};
pub use operators::{OperatorTable, OperatorTableError, RowPredicate};
pub use query_node::QueryNode;
