//! Dataset storage API.

use crate::types::{CellSlice, Coordinate, Dataset, Dimensions};
use crate::{StoreError, StoreResult};
use gs_core::ParamRange;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Options for dataset creation.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub spatial_extent: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub x_units: String,
    pub time_units: String,
    pub p_units: String,
    pub a_units: String,
    pub description: String,
    /// Free-text provenance; callers include the creation timestamp.
    pub history: String,
    pub overwrite: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            spatial_extent: 1024,
            x_min: 0.0,
            x_max: 100.0,
            x_units: "m".to_string(),
            time_units: "year".to_string(),
            p_units: "nondim_mmtoyear".to_string(),
            a_units: "nondim_strength".to_string(),
            description: "p/a grid scan dataset".to_string(),
            history: String::new(),
            overwrite: false,
        }
    }
}

/// Handle on one dataset file.
///
/// The handle holds only the path; every operation performs a full
/// open/flush/close cycle. This bounds memory and makes each write
/// durable on its own, at the cost of write throughput.
#[derive(Clone, Debug)]
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    /// Create the dataset file: define all dimensions and variables and
    /// write the spatial coordinate array immediately.
    ///
    /// Fails with `StoreError::AlreadyExists` unless `overwrite` was
    /// requested. Writes go through a temp file and an atomic rename, so
    /// a failed create never leaves a malformed file behind.
    pub fn create(path: impl Into<PathBuf>, opts: &CreateOptions) -> StoreResult<Self> {
        let path = path.into();
        if path.exists() && !opts.overwrite {
            return Err(StoreError::AlreadyExists { path });
        }
        if opts.spatial_extent == 0 {
            return Err(StoreError::InvalidArg {
                what: "spatial extent must be positive",
            });
        }
        if !opts.x_min.is_finite() || !opts.x_max.is_finite() {
            return Err(StoreError::InvalidArg {
                what: "spatial range must be finite",
            });
        }

        let x_values = ParamRange {
            min: opts.x_min,
            max: opts.x_max,
            points: opts.spatial_extent,
        }
        .values();

        let dataset = Dataset {
            description: opts.description.clone(),
            history: opts.history.clone(),
            dims: Dimensions {
                x: opts.spatial_extent,
                time: 0,
                p: 0,
                a: 0,
            },
            x: Coordinate::filled(opts.x_units.clone(), x_values),
            time: Coordinate::empty(opts.time_units.clone()),
            p: Coordinate::empty(opts.p_units.clone()),
            a: Coordinate::empty(opts.a_units.clone()),
            u: Vec::new(),
        };

        let store = Self { path };
        store.replace(&dataset)?;
        Ok(store)
    }

    /// Open an existing dataset file.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(StoreError::NotFound { path });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole dataset back into memory.
    pub fn read(&self) -> StoreResult<Dataset> {
        let content = fs::read_to_string(&self.path)?;
        let dataset = serde_json::from_str(&content)?;
        Ok(dataset)
    }

    /// Append one spatial slice: coordinate scalars at the given indices
    /// plus the state vector at `u[p][a][time][:]`.
    ///
    /// Each call is a full open/mutate/flush/close cycle. The underlying
    /// file is not safe under concurrent writers, so this must never be
    /// invoked from more than one logical writer at a time.
    pub fn write_slice(&self, slice: &CellSlice<'_>) -> StoreResult<()> {
        let mut dataset = self.read()?;
        dataset.apply_slice(slice)?;
        self.replace(&dataset)
    }

    /// Serialize to a temp file, fsync, and rename over the target.
    fn replace(&self, dataset: &Dataset) -> StoreResult<()> {
        let json = serde_json::to_string(dataset)?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
