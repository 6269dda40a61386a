//! Library components for the grid CLI.

pub mod logging;
