//! gs-store: growable 4-D dataset storage.
//!
//! One sweep produces one file: a dense variable `u[p][a][time][x]` plus
//! units-tagged coordinate arrays and free-text provenance. The spatial
//! dimension is fixed at creation; time, p and a grow as slices are
//! appended.

pub mod store;
pub mod types;

pub use store::{CreateOptions, DatasetStore};
pub use types::*;

use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataset already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("Dataset not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("State vector has {len} points, spatial extent is {extent}")]
    ShapeMismatch { len: usize, extent: usize },

    #[error(
        "Coordinate {name}[{index}] already holds {existing}, refusing to overwrite with {new}"
    )]
    CoordinateConflict {
        name: &'static str,
        index: usize,
        existing: f64,
        new: f64,
    },

    #[error("Slice u[{p}][{a}][{time}] was already written with different data")]
    SliceConflict { p: usize, a: usize, time: usize },
}
