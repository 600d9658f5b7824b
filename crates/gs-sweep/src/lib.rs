//! gs-sweep: concurrent (p, a) parameter-sweep scheduler.
//!
//! Builds the parameter grid, sizes a fixed worker pool from the CPU
//! probe, dispatches every grid cell as an independent simulation task,
//! and merges completed trajectories into the dataset store through a
//! single aggregation path. Simulation is fully parallel; store writes
//! never are.

pub mod config;
pub mod engine;
pub mod error;
pub mod grid;

// Re-exports for public API
pub use config::{FailurePolicy, SweepConfig};
pub use engine::{
    clamp_workers, run_sweep, run_sweep_with_cancel, run_sweep_with_rule, CancelFlag, SkippedCell,
    SweepPhase, SweepReport,
};
pub use error::{SweepError, SweepResult};
pub use grid::{Grid, GridCell};
