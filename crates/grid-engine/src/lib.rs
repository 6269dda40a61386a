//! Facade over the data-grid engine.
//!
//! `GridEngine` wires the table store, selection engine, and fetch
//! coordinator into one service object, constructed once per table.
//! State setters schedule debounced fetches automatically; exports run
//! in the background against the same canonical query the grid shows.

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::GridEngine;
