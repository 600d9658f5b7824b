//! Single-cell simulation units for gridscan.
//!
//! Provides:
//! - UpdateRule trait for pluggable per-step update rules
//! - The reference trigonometric recurrence
//! - Fixed-step trajectory runner with whole-cell failure semantics

pub mod error;
pub mod rule;
pub mod trajectory;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use rule::{TrigRule, UpdateRule};
pub use trajectory::{run_cell, time_points, CellOptions, Trajectory};
