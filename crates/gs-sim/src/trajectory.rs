//! Fixed-step trajectory runner.

use crate::error::{SimError, SimResult};
use crate::rule::UpdateRule;

/// Options for one cell run.
#[derive(Clone, Debug)]
pub struct CellOptions {
    /// Fixed time step
    pub dt: f64,
    /// Exclusive horizon; sampling stops before it
    pub horizon: f64,
    /// Shared initial state, copied into the trajectory at t = 0
    pub initial_state: Vec<f64>,
}

/// Full time series for one grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    /// Time points, starting at 0
    pub times: Vec<f64>,
    /// One spatial state per time point
    pub states: Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Time points `k * dt` for every `k` with `k * dt < horizon`.
///
/// The multiply form avoids an accumulating sum drifting off the grid.
/// With `dt == horizon` this is a single sample at t = 0.
pub fn time_points(dt: f64, horizon: f64) -> Vec<f64> {
    let mut times = Vec::new();
    let mut k = 0usize;
    loop {
        let t = k as f64 * dt;
        if t >= horizon {
            break;
        }
        times.push(t);
        k += 1;
    }
    times
}

/// Run one cell to its horizon.
///
/// Returns one `(time, state)` entry per time point; entry 0's state is
/// the initial condition. The cell either completes its full time series
/// or fails as a whole — a non-finite value at any step discards
/// everything.
pub fn run_cell<R: UpdateRule + ?Sized>(
    rule: &R,
    p: f64,
    a: f64,
    opts: &CellOptions,
) -> SimResult<Trajectory> {
    if opts.dt <= 0.0 {
        return Err(SimError::InvalidArg {
            what: "dt must be positive",
        });
    }
    if opts.horizon <= 0.0 {
        return Err(SimError::InvalidArg {
            what: "horizon must be positive",
        });
    }
    if opts.initial_state.is_empty() {
        return Err(SimError::InvalidArg {
            what: "initial state must not be empty",
        });
    }
    if let Some(&bad) = opts.initial_state.iter().find(|v| !v.is_finite()) {
        return Err(SimError::NonFinite {
            time_index: 0,
            value: bad,
        });
    }

    let times = time_points(opts.dt, opts.horizon);
    let mut states = Vec::with_capacity(times.len());
    states.push(opts.initial_state.clone());

    for (k, &t) in times.iter().enumerate().skip(1) {
        let next = rule.step(t, p, a, &states[k - 1]);
        if next.len() != opts.initial_state.len() {
            return Err(SimError::InvalidArg {
                what: "update rule changed the state length",
            });
        }
        if let Some(&bad) = next.iter().find(|v| !v.is_finite()) {
            return Err(SimError::NonFinite {
                time_index: k,
                value: bad,
            });
        }
        states.push(next);
    }

    Ok(Trajectory { times, states })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::TrigRule;

    fn opts(dt: f64, horizon: f64, extent: usize) -> CellOptions {
        CellOptions {
            dt,
            horizon,
            initial_state: vec![1.0; extent],
        }
    }

    #[test]
    fn time_points_match_arange() {
        assert_eq!(time_points(1.0, 2.0), vec![0.0, 1.0]);
        assert_eq!(time_points(1.0, 2.5), vec![0.0, 1.0, 2.0]);
        assert_eq!(time_points(0.5, 2.0), vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn dt_equal_to_horizon_gives_single_sample() {
        assert_eq!(time_points(500.0, 500.0), vec![0.0]);

        let trajectory = run_cell(&TrigRule, 0.5, 0.5, &opts(500.0, 500.0, 8)).unwrap();
        assert_eq!(trajectory.len(), 1);
        assert_eq!(trajectory.times[0], 0.0);
    }

    #[test]
    fn first_state_is_the_initial_condition() {
        let initial = vec![0.25; 16];
        let trajectory = run_cell(
            &TrigRule,
            0.7,
            0.3,
            &CellOptions {
                dt: 1.0,
                horizon: 3.0,
                initial_state: initial.clone(),
            },
        )
        .unwrap();
        assert_eq!(trajectory.states[0], initial);
    }

    #[test]
    fn rerun_is_bit_identical() {
        let options = opts(0.25, 5.0, 32);
        let first = run_cell(&TrigRule, 0.4, 0.8, &options).unwrap();
        let second = run_cell(&TrigRule, 0.4, 0.8, &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn recurrence_matches_direct_evaluation() {
        let trajectory = run_cell(&TrigRule, 0.5, 0.25, &opts(1.0, 3.0, 2)).unwrap();
        let f1 = 1.0_f64.cos() * 0.25_f64.sin() * 0.5_f64.sin();
        let f2 = 2.0_f64.cos() * 0.25_f64.sin() * 0.5_f64.sin();
        assert_eq!(trajectory.states[1][0], f1);
        assert_eq!(trajectory.states[2][0], f1 * f2);
    }

    #[test]
    fn non_finite_step_fails_the_whole_cell() {
        struct Poison;
        impl UpdateRule for Poison {
            fn step(&self, t: f64, _p: f64, _a: f64, prev: &[f64]) -> Vec<f64> {
                if t >= 2.0 {
                    vec![f64::NAN; prev.len()]
                } else {
                    prev.to_vec()
                }
            }
        }

        let err = run_cell(&Poison, 0.5, 0.5, &opts(1.0, 4.0, 4)).unwrap_err();
        assert!(matches!(err, SimError::NonFinite { time_index: 2, .. }));
    }

    #[test]
    fn invalid_options_are_rejected() {
        assert!(run_cell(&TrigRule, 0.5, 0.5, &opts(0.0, 1.0, 4)).is_err());
        assert!(run_cell(&TrigRule, 0.5, 0.5, &opts(-1.0, 1.0, 4)).is_err());
        assert!(run_cell(&TrigRule, 0.5, 0.5, &opts(1.0, 0.0, 4)).is_err());
        assert!(run_cell(&TrigRule, 0.5, 0.5, &opts(1.0, 1.0, 0)).is_err());
    }

    #[test]
    fn non_finite_initial_state_is_rejected() {
        let err = run_cell(
            &TrigRule,
            0.5,
            0.5,
            &CellOptions {
                dt: 1.0,
                horizon: 2.0,
                initial_state: vec![1.0, f64::INFINITY],
            },
        )
        .unwrap_err();
        assert!(matches!(err, SimError::NonFinite { time_index: 0, .. }));
    }
}
