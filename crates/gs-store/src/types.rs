//! Dataset data model.

use crate::{StoreError, StoreResult};
use gs_core::{nearly_equal, Tolerances};
use serde::{Deserialize, Serialize};

/// Named dimension sizes. `x` is fixed at creation; the others grow as
/// slices are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub x: usize,
    pub time: usize,
    pub p: usize,
    pub a: usize,
}

/// A 1-D coordinate variable tagged with a physical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub units: String,
    /// One entry per index; `None` until the owning slice is written.
    pub values: Vec<Option<f64>>,
}

impl Coordinate {
    pub fn empty(units: impl Into<String>) -> Self {
        Self {
            units: units.into(),
            values: Vec::new(),
        }
    }

    pub fn filled(units: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            units: units.into(),
            values: values.into_iter().map(Some).collect(),
        }
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}

/// One spatial state vector addressed by its grid and time indices,
/// together with the coordinate scalars for those indices.
#[derive(Debug, Clone, Copy)]
pub struct CellSlice<'a> {
    pub p_index: usize,
    pub a_index: usize,
    pub time_index: usize,
    pub p_value: f64,
    pub a_value: f64,
    pub time_value: f64,
    pub state: &'a [f64],
}

/// The on-disk dataset: attributes, dimensions, coordinates, and the
/// dense 4-D variable `u[p][a][time][x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub description: String,
    pub history: String,
    pub dims: Dimensions,
    pub x: Coordinate,
    pub time: Coordinate,
    pub p: Coordinate,
    pub a: Coordinate,
    /// `u[p][a][time]` is one spatial state vector; `None` marks an
    /// unset slice.
    pub u: Vec<Vec<Vec<Option<Vec<f64>>>>>,
}

impl Dataset {
    /// Apply one slice write: coordinate scalars plus the state vector.
    ///
    /// Redundant writes of an already-correct value are accepted;
    /// conflicting values are a caller error.
    pub fn apply_slice(&mut self, slice: &CellSlice<'_>) -> StoreResult<()> {
        if slice.state.len() != self.dims.x {
            return Err(StoreError::ShapeMismatch {
                len: slice.state.len(),
                extent: self.dims.x,
            });
        }

        self.grow_to(slice.p_index, slice.a_index, slice.time_index);

        set_coord(&mut self.p, "p", slice.p_index, slice.p_value)?;
        set_coord(&mut self.a, "a", slice.a_index, slice.a_value)?;
        set_coord(&mut self.time, "time", slice.time_index, slice.time_value)?;

        let target = &mut self.u[slice.p_index][slice.a_index][slice.time_index];
        match target {
            None => *target = Some(slice.state.to_vec()),
            Some(existing) if existing.as_slice() == slice.state => {}
            Some(_) => {
                return Err(StoreError::SliceConflict {
                    p: slice.p_index,
                    a: slice.a_index,
                    time: slice.time_index,
                });
            }
        }
        Ok(())
    }

    /// Grow the growable dimensions to cover the given indices.
    fn grow_to(&mut self, p_index: usize, a_index: usize, time_index: usize) {
        self.dims.p = self.dims.p.max(p_index + 1);
        self.dims.a = self.dims.a.max(a_index + 1);
        self.dims.time = self.dims.time.max(time_index + 1);

        self.p.values.resize(self.dims.p, None);
        self.a.values.resize(self.dims.a, None);
        self.time.values.resize(self.dims.time, None);

        self.u.resize_with(self.dims.p, Vec::new);
        for per_p in &mut self.u {
            per_p.resize_with(self.dims.a, Vec::new);
            for per_a in per_p {
                per_a.resize_with(self.dims.time, || None);
            }
        }
    }

    /// Spatial state at `u[p][a][time]`, if that slice has been written.
    pub fn slice(&self, p_index: usize, a_index: usize, time_index: usize) -> Option<&[f64]> {
        self.u
            .get(p_index)?
            .get(a_index)?
            .get(time_index)?
            .as_deref()
    }

    /// True when every time slice of the cell has been written.
    pub fn cell_complete(&self, p_index: usize, a_index: usize) -> bool {
        self.dims.time > 0
            && (0..self.dims.time).all(|k| self.slice(p_index, a_index, k).is_some())
    }

    /// True when no time slice of the cell has been written.
    pub fn cell_unset(&self, p_index: usize, a_index: usize) -> bool {
        (0..self.dims.time).all(|k| self.slice(p_index, a_index, k).is_none())
    }

    /// Number of cells with a full set of time slices.
    pub fn complete_cells(&self) -> usize {
        let mut count = 0;
        for i in 0..self.dims.p {
            for j in 0..self.dims.a {
                if self.cell_complete(i, j) {
                    count += 1;
                }
            }
        }
        count
    }
}

fn set_coord(
    coord: &mut Coordinate,
    name: &'static str,
    index: usize,
    value: f64,
) -> StoreResult<()> {
    match coord.values[index] {
        None => {
            coord.values[index] = Some(value);
            Ok(())
        }
        Some(existing) if nearly_equal(existing, value, Tolerances::default()) => Ok(()),
        Some(existing) => Err(StoreError::CoordinateConflict {
            name,
            index,
            existing,
            new: value,
        }),
    }
}
