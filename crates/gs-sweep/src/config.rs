//! Sweep configuration and validation.

use crate::error::{SweepError, SweepResult};
use gs_core::ParamRange;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// What to do when a single cell fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure, leave the cell unset, keep sweeping. Grid
    /// cells are independent, so one bad cell does not invalidate the
    /// rest.
    #[default]
    SkipCell,
    /// Cancel outstanding work and surface the first error.
    FailFast,
}

/// Full description of one sweep.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    pub p_range: ParamRange,
    pub a_range: ParamRange,
    /// Fixed time step; `None` means one sample at t = 0 (dt = horizon).
    pub dt: Option<f64>,
    pub horizon: f64,
    /// Requested worker count, clamped against the CPU probe.
    pub workers: usize,
    /// Processors left idle to avoid saturating the host.
    pub reserved_margin: usize,
    pub failure_policy: FailurePolicy,
    /// Shared initial state; length must equal `spatial_extent`. Cloned
    /// per cell, never shared by reference.
    pub initial_state: Vec<f64>,
    pub spatial_extent: usize,
    pub x_min: f64,
    pub x_max: f64,
    /// Dataset file to create.
    pub output: PathBuf,
    pub overwrite: bool,
    pub description: String,
}

impl SweepConfig {
    /// Defaults matching the reference entry point: a 10x10 grid over
    /// `[p_min, p_max] x [0, 1]`, horizon 500, ten requested workers,
    /// uniform unit initial state over 1024 spatial points.
    pub fn new(p_min: f64, p_max: f64, output: impl Into<PathBuf>) -> Self {
        Self {
            p_range: ParamRange {
                min: p_min,
                max: p_max,
                points: 10,
            },
            a_range: ParamRange {
                min: 0.0,
                max: 1.0,
                points: 10,
            },
            dt: None,
            horizon: 500.0,
            workers: 10,
            reserved_margin: 2,
            failure_policy: FailurePolicy::default(),
            initial_state: vec![1.0; 1024],
            spatial_extent: 1024,
            x_min: 0.0,
            x_max: 100.0,
            output: output.into(),
            overwrite: false,
            description: "p/a grid scan dataset".to_string(),
        }
    }

    /// Effective time step: explicit, or the full horizon.
    pub fn effective_dt(&self) -> f64 {
        self.dt.unwrap_or(self.horizon)
    }

    /// Check everything that must hold before any file is touched.
    pub fn validate(&self) -> SweepResult<()> {
        if self.p_range.points == 0 {
            return Err(config_error("Np must be positive"));
        }
        if self.a_range.points == 0 {
            return Err(config_error("Na must be positive"));
        }
        for (name, range) in [("p", &self.p_range), ("a", &self.a_range)] {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(SweepError::Config {
                    what: format!("{name} range bounds must be finite"),
                });
            }
        }
        if let Some(dt) = self.dt {
            if !(dt > 0.0) {
                return Err(config_error("time step must be positive"));
            }
        }
        if !(self.horizon > 0.0) || !self.horizon.is_finite() {
            return Err(config_error("horizon must be positive and finite"));
        }
        if self.spatial_extent == 0 {
            return Err(config_error("spatial extent must be positive"));
        }
        if !self.x_min.is_finite() || !self.x_max.is_finite() {
            return Err(config_error("spatial range must be finite"));
        }
        if self.initial_state.len() != self.spatial_extent {
            return Err(SweepError::Config {
                what: format!(
                    "initial state has {} points, spatial extent is {}",
                    self.initial_state.len(),
                    self.spatial_extent
                ),
            });
        }
        if self.initial_state.iter().any(|v| !v.is_finite()) {
            return Err(config_error("initial state must be finite"));
        }
        Ok(())
    }

    /// Content hash of everything that determines the dataset contents.
    /// Recorded in the dataset history line for provenance.
    pub fn fingerprint(&self) -> String {
        #[derive(Serialize)]
        struct Fingerprint<'a> {
            p_min: f64,
            p_max: f64,
            np: usize,
            a_min: f64,
            a_max: f64,
            na: usize,
            dt: f64,
            horizon: f64,
            spatial_extent: usize,
            x_min: f64,
            x_max: f64,
            initial_state: &'a [f64],
        }

        let summary = Fingerprint {
            p_min: self.p_range.min,
            p_max: self.p_range.max,
            np: self.p_range.points,
            a_min: self.a_range.min,
            a_max: self.a_range.max,
            na: self.a_range.points,
            dt: self.effective_dt(),
            horizon: self.horizon,
            spatial_extent: self.spatial_extent,
            x_min: self.x_min,
            x_max: self.x_max,
            initial_state: &self.initial_state,
        };

        let mut hasher = Sha256::new();
        let json = serde_json::to_string(&summary).unwrap_or_default();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn config_error(what: &str) -> SweepError {
    SweepError::Config {
        what: what.to_string(),
    }
}
