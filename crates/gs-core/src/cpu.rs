//! Usable-processor detection.
//!
//! A cgroup or affinity mask can restrict this process to fewer processors
//! than the machine has, so the probe checks the kernel's allowance first
//! and only then falls back to progressively cruder host queries.

use crate::error::{CoreError, CoreResult};

/// Number of processors usable by this process.
///
/// The result is an upper bound on useful parallelism, not a guarantee of
/// exclusivity. Strategies are tried in order; `CoreError::ResourceUnknown`
/// is returned only if every one of them fails. Pure function with no
/// retained state; callers may memoize it for the process lifetime.
pub fn available_cpu_count() -> CoreResult<usize> {
    if let Some(n) = cpus_allowed() {
        return Ok(n);
    }
    if let Ok(n) = std::thread::available_parallelism() {
        return Ok(n.get());
    }
    let n = num_cpus::get();
    if n > 0 {
        return Ok(n);
    }
    if let Some(n) = proc_cpuinfo() {
        return Ok(n);
    }
    if let Some(n) = env_processor_count() {
        return Ok(n);
    }
    if let Some(n) = sysctl_ncpu() {
        return Ok(n);
    }
    Err(CoreError::ResourceUnknown)
}

/// Popcount of the `Cpus_allowed` mask, if the kernel exposes one.
fn cpus_allowed() -> Option<usize> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("Cpus_allowed:"))?;
    parse_cpus_allowed(line)
}

/// The mask is comma-separated 32-bit hex words, widest first.
fn parse_cpus_allowed(line: &str) -> Option<usize> {
    let mask = line.split_once(':')?.1.trim();
    let mut bits = 0usize;
    for word in mask.split(',') {
        bits += u64::from_str_radix(word, 16).ok()?.count_ones() as usize;
    }
    (bits > 0).then_some(bits)
}

fn proc_cpuinfo() -> Option<usize> {
    let info = std::fs::read_to_string("/proc/cpuinfo").ok()?;
    let n = info
        .lines()
        .filter(|l| l.starts_with("processor"))
        .count();
    (n > 0).then_some(n)
}

fn env_processor_count() -> Option<usize> {
    let n: usize = std::env::var("NUMBER_OF_PROCESSORS")
        .ok()?
        .trim()
        .parse()
        .ok()?;
    (n > 0).then_some(n)
}

/// BSD / macOS fallback.
fn sysctl_ncpu() -> Option<usize> {
    let output = std::process::Command::new("sysctl")
        .args(["-n", "hw.ncpu"])
        .output()
        .ok()?;
    let n: usize = String::from_utf8(output.stdout)
        .ok()?
        .trim()
        .parse()
        .ok()?;
    (n > 0).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reports_at_least_one_processor() {
        let n = available_cpu_count().unwrap();
        assert!(n >= 1);
    }

    #[test]
    fn parse_cpus_allowed_single_word() {
        assert_eq!(parse_cpus_allowed("Cpus_allowed:\tff"), Some(8));
        assert_eq!(parse_cpus_allowed("Cpus_allowed:\t1"), Some(1));
    }

    #[test]
    fn parse_cpus_allowed_multi_word() {
        // 64-way box: two full 32-bit words
        assert_eq!(
            parse_cpus_allowed("Cpus_allowed:\tffffffff,ffffffff"),
            Some(64)
        );
    }

    #[test]
    fn parse_cpus_allowed_rejects_garbage() {
        assert_eq!(parse_cpus_allowed("Cpus_allowed:\tnot-hex"), None);
        assert_eq!(parse_cpus_allowed("Cpus_allowed:\t0"), None);
    }
}
