//! Linearly spaced parameter ranges.

use crate::error::{CoreError, CoreResult};
use crate::numeric::Real;
use std::fmt;

/// An evenly spaced range of parameter values, endpoints inclusive.
///
/// Grid indices into `values()` are stable for the lifetime of one sweep;
/// dataset coordinate arrays must be written at exactly these indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: Real,
    pub max: Real,
    /// Number of points to generate
    pub points: usize,
}

impl ParamRange {
    /// Create a range, rejecting empty or non-finite bounds.
    pub fn new(min: Real, max: Real, points: usize) -> CoreResult<Self> {
        if points == 0 {
            return Err(CoreError::InvalidArg {
                what: "range must have at least 1 point",
            });
        }
        if !min.is_finite() {
            return Err(CoreError::NonFinite {
                what: "range min",
                value: min,
            });
        }
        if !max.is_finite() {
            return Err(CoreError::NonFinite {
                what: "range max",
                value: max,
            });
        }
        Ok(Self { min, max, points })
    }

    /// Generate all points in the range.
    pub fn values(&self) -> Vec<Real> {
        if self.points <= 1 {
            return vec![self.min];
        }

        let mut points = Vec::with_capacity(self.points);
        let delta = (self.max - self.min) / (self.points - 1) as Real;

        for i in 0..self.points {
            points.push(self.min + i as Real * delta);
        }

        // Ensure exact endpoint
        points[self.points - 1] = self.max;
        points
    }
}

impl fmt::Display for ParamRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} points from {} to {}", self.points, self.min, self.max)
    }
}
