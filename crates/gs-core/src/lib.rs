//! gs-core: stable foundation for gridscan.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - range (linearly spaced parameter ranges)
//! - cpu (usable-processor probe)
//! - error (shared error types)

pub mod cpu;
pub mod error;
pub mod numeric;
pub mod range;

// Re-exports: nice ergonomics for downstream crates
pub use cpu::available_cpu_count;
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use range::*;
