//! The (p, a) parameter grid.

use gs_core::ParamRange;

/// Cartesian product of the p and a ranges.
///
/// Indices into `p_values`/`a_values` are stable for the lifetime of one
/// sweep and are exactly the indices written into the dataset's p/a
/// coordinate arrays.
#[derive(Clone, Debug)]
pub struct Grid {
    pub p_values: Vec<f64>,
    pub a_values: Vec<f64>,
}

/// One unit of work: a single (p, a) pair addressed by its grid indices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridCell {
    pub p_index: usize,
    pub a_index: usize,
    pub p: f64,
    pub a: f64,
}

impl Grid {
    pub fn new(p_range: &ParamRange, a_range: &ParamRange) -> Self {
        Self {
            p_values: p_range.values(),
            a_values: a_range.values(),
        }
    }

    pub fn len(&self) -> usize {
        self.p_values.len() * self.a_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major (p-major, a-minor) cell enumeration.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.p_values.iter().enumerate().flat_map(move |(i, &p)| {
            self.a_values
                .iter()
                .enumerate()
                .map(move |(j, &a)| GridCell {
                    p_index: i,
                    a_index: j,
                    p,
                    a,
                })
        })
    }
}
