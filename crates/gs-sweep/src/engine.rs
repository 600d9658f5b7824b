//! Sweep execution: worker pool dispatch and single-writer aggregation.
//!
//! The dataset file is not safe under concurrent writers, so workers
//! never touch it. Each worker runs one cell's time integration and sends
//! the whole trajectory back over a bounded channel; the caller thread is
//! the only writer and applies each cell's time slices in order.

use crate::config::{FailurePolicy, SweepConfig};
use crate::error::{SweepError, SweepResult};
use crate::grid::Grid;
use crossbeam_channel::{bounded, RecvTimeoutError};
use gs_sim::{run_cell, CellOptions, SimError, Trajectory, TrigRule, UpdateRule};
use gs_store::{CellSlice, CreateOptions, DatasetStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Emit a warning if the aggregation path sits idle this long while
/// cells are still outstanding.
const STALL_WARNING: Duration = Duration::from_secs(30);

/// Lifecycle of one sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepPhase {
    Configuring,
    Running,
    Draining,
    Done,
    Failed,
}

/// Cooperative cancellation handle for a running sweep.
///
/// Cancelling stops execution of not-yet-started cells immediately;
/// in-flight cells run to completion and their results are discarded, so
/// the dataset only ever holds whole cells.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A cell that failed and was left unset in the dataset.
#[derive(Debug)]
pub struct SkippedCell {
    pub p_index: usize,
    pub a_index: usize,
    pub error: SimError,
}

/// Outcome of a finished sweep.
#[derive(Debug)]
pub struct SweepReport {
    /// Workers actually used after clamping against the probe
    pub workers: usize,
    pub cells_total: usize,
    pub cells_written: usize,
    /// Cells never started, or discarded in flight, because the sweep
    /// was cancelled
    pub cells_cancelled: usize,
    /// Cells skipped under `FailurePolicy::SkipCell`, with their errors
    pub skipped: Vec<SkippedCell>,
    /// Total wall-clock duration of the sweep
    pub elapsed: Duration,
}

/// What one worker reports back to the aggregation path.
enum CellStatus {
    Done(Trajectory),
    Failed(SimError),
    /// Cancelled before the cell started; nothing to write.
    NotRun,
}

struct CellOutcome {
    p_index: usize,
    a_index: usize,
    status: CellStatus,
}

/// Clamp the requested worker count against the probe result, keeping
/// `reserved_margin` processors free for the host. Never zero.
pub fn clamp_workers(requested: usize, probe: usize, reserved_margin: usize) -> usize {
    requested.min(probe.saturating_sub(reserved_margin)).max(1)
}

fn resolve_workers(config: &SweepConfig) -> usize {
    let probe = match gs_core::available_cpu_count() {
        Ok(n) => n,
        Err(err) => {
            warn!(%err, "CPU probe failed, falling back to a single worker");
            return 1;
        }
    };
    clamp_workers(config.workers, probe, config.reserved_margin)
}

/// Run a full sweep to completion with the reference update rule.
pub fn run_sweep(config: &SweepConfig) -> SweepResult<SweepReport> {
    run_sweep_with_rule(config, &TrigRule)
}

/// Run a full sweep with a caller-supplied update rule.
pub fn run_sweep_with_rule<R: UpdateRule>(
    config: &SweepConfig,
    rule: &R,
) -> SweepResult<SweepReport> {
    run_sweep_with_cancel(config, rule, &CancelFlag::new())
}

/// Run a full sweep with a caller-supplied update rule and cancellation
/// handle.
///
/// Returns once the sweep is done, failed, or drained after cancellation.
/// Per-cell errors are handled according to `config.failure_policy`;
/// configuration and store errors are always fatal, and configuration
/// errors are raised before any file is created.
pub fn run_sweep_with_cancel<R: UpdateRule>(
    config: &SweepConfig,
    rule: &R,
    cancel: &CancelFlag,
) -> SweepResult<SweepReport> {
    let start = Instant::now();
    let mut phase = SweepPhase::Configuring;

    config.validate()?;
    let workers = resolve_workers(config);
    let grid = Grid::new(&config.p_range, &config.a_range);
    let cell_opts = CellOptions {
        dt: config.effective_dt(),
        horizon: config.horizon,
        initial_state: config.initial_state.clone(),
    };
    info!(
        ?phase,
        workers,
        cells = grid.len(),
        output = %config.output.display(),
        "sweep configured"
    );

    let store = DatasetStore::create(
        &config.output,
        &CreateOptions {
            spatial_extent: config.spatial_extent,
            x_min: config.x_min,
            x_max: config.x_max,
            description: config.description.clone(),
            history: format!(
                "Created {} config {}",
                chrono::Utc::now().to_rfc3339(),
                config.fingerprint()
            ),
            overwrite: config.overwrite,
            ..CreateOptions::default()
        },
    )?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("sweep-worker-{i}"))
        .build()
        .map_err(|e| SweepError::Pool {
            message: e.to_string(),
        })?;

    // One pending result per worker bounds memory without stalling the pool.
    let (tx, rx) = bounded::<CellOutcome>(workers);

    let mut cells_written = 0usize;
    let mut cells_cancelled = 0usize;
    let mut skipped: Vec<SkippedCell> = Vec::new();
    let mut fatal: Option<SweepError> = None;

    // The closure runs on this thread while spawned tasks run on the
    // pool, so the writer below never competes with workers for a slot.
    pool.in_place_scope(|scope| {
        phase = SweepPhase::Running;
        debug!(?phase, "submitting cells");
        for cell in grid.cells() {
            let tx = tx.clone();
            let cell_opts = &cell_opts;
            scope.spawn(move |_| {
                let status = if cancel.is_cancelled() {
                    CellStatus::NotRun
                } else {
                    info!(p = cell.p, a = cell.a, "calculating cell");
                    match run_cell(rule, cell.p, cell.a, cell_opts) {
                        Ok(trajectory) => CellStatus::Done(trajectory),
                        Err(err) => CellStatus::Failed(err),
                    }
                };
                // The receiver only hangs up after a fatal error, at
                // which point remaining outcomes are discarded anyway.
                let _ = tx.send(CellOutcome {
                    p_index: cell.p_index,
                    a_index: cell.a_index,
                    status,
                });
            });
        }
        drop(tx);
        phase = SweepPhase::Draining;
        debug!(?phase, "all cells submitted");

        // Single aggregation path: the only writer of the store.
        let mut outstanding = grid.len();
        while outstanding > 0 {
            let CellOutcome {
                p_index,
                a_index,
                status,
            } = match rx.recv_timeout(STALL_WARNING) {
                Ok(outcome) => outcome,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(outstanding, "no cell result for {:?}", STALL_WARNING);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };
            outstanding -= 1;

            match status {
                CellStatus::Done(trajectory) => {
                    if fatal.is_some() || cancel.is_cancelled() {
                        debug!(p_index, a_index, "discarding result of cancelled sweep");
                        cells_cancelled += 1;
                        continue;
                    }
                    match write_trajectory(&store, &grid, p_index, a_index, &trajectory) {
                        Ok(()) => cells_written += 1,
                        Err(err) => {
                            // A store failure poisons every further write.
                            cancel.cancel();
                            fatal = Some(SweepError::Store(err));
                        }
                    }
                }
                CellStatus::Failed(err) => {
                    warn!(p_index, a_index, %err, "cell failed");
                    match config.failure_policy {
                        FailurePolicy::SkipCell => skipped.push(SkippedCell {
                            p_index,
                            a_index,
                            error: err,
                        }),
                        FailurePolicy::FailFast => {
                            cancel.cancel();
                            if fatal.is_none() {
                                fatal = Some(SweepError::CellFailed {
                                    p_index,
                                    a_index,
                                    source: err,
                                });
                            }
                        }
                    }
                }
                CellStatus::NotRun => cells_cancelled += 1,
            }
        }
    });

    if let Some(err) = fatal {
        phase = SweepPhase::Failed;
        debug!(?phase, "sweep aborted");
        return Err(err);
    }

    phase = SweepPhase::Done;
    let elapsed = start.elapsed();
    info!(
        ?phase,
        elapsed_s = elapsed.as_secs_f64(),
        cells_written,
        cells_cancelled,
        cells_skipped = skipped.len(),
        "sweep complete"
    );

    Ok(SweepReport {
        workers,
        cells_total: grid.len(),
        cells_written,
        cells_cancelled,
        skipped,
        elapsed,
    })
}

/// Apply one cell's trajectory to the store, time slices in order.
fn write_trajectory(
    store: &DatasetStore,
    grid: &Grid,
    p_index: usize,
    a_index: usize,
    trajectory: &Trajectory,
) -> gs_store::StoreResult<()> {
    for (time_index, (time_value, state)) in
        trajectory.times.iter().zip(&trajectory.states).enumerate()
    {
        store.write_slice(&CellSlice {
            p_index,
            a_index,
            time_index,
            p_value: grid.p_values[p_index],
            a_value: grid.a_values[a_index],
            time_value: *time_value,
            state: state.as_slice(),
        })?;
    }
    Ok(())
}
