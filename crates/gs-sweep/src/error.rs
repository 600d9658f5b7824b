//! Error types for sweep scheduling.

use thiserror::Error;

pub type SweepResult<T> = Result<T, SweepError>;

#[derive(Error, Debug)]
pub enum SweepError {
    /// Invalid sweep parameters, detected before any file is created.
    #[error("Invalid sweep configuration: {what}")]
    Config { what: String },

    /// Dataset creation or write failure; fatal to the sweep.
    #[error("Store error: {0}")]
    Store(#[from] gs_store::StoreError),

    #[error("Worker pool error: {message}")]
    Pool { message: String },

    /// Surfaced under `FailurePolicy::FailFast` for the first failed cell.
    #[error("Cell (p={p_index}, a={a_index}) failed: {source}")]
    CellFailed {
        p_index: usize,
        a_index: usize,
        #[source]
        source: gs_sim::SimError,
    },
}
