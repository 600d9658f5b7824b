//! Error types for simulation units.

use thiserror::Error;

/// Errors encountered while running one cell.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite state value at time index {time_index}: {value}")]
    NonFinite { time_index: usize, value: f64 },
}

pub type SimResult<T> = Result<T, SimError>;
