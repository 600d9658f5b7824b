//! Pluggable per-step update rules.

/// A per-step map from the previous spatial state to the next one.
///
/// Implementations must be deterministic and side-effect-free: re-running
/// a cell with identical inputs has to reproduce the same trajectory bit
/// for bit. That property is what makes cells retryable and testable.
pub trait UpdateRule: Send + Sync {
    /// State at time `t` for the cell at parameters `(p, a)`, given the
    /// state at the previous time point.
    fn step(&self, t: f64, p: f64, a: f64, prev: &[f64]) -> Vec<f64>;
}

/// Reference recurrence: element-wise `u' = u * cos(t) * sin(a) * sin(p)`.
///
/// A placeholder with no physical meaning; bounded but oscillatory. Swap
/// it out for a real model without touching the rest of the engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrigRule;

impl UpdateRule for TrigRule {
    fn step(&self, t: f64, p: f64, a: f64, prev: &[f64]) -> Vec<f64> {
        let factor = t.cos() * a.sin() * p.sin();
        prev.iter().map(|u| u * factor).collect()
    }
}
