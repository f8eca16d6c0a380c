//! Resource probes.

use std::time::Instant;

use parking_lot::Mutex;

use autoflow_protocols::{ProbeError, ResourceProbe, ResourceReading};

/// Reads resident memory and CPU usage of the current process.
///
/// CPU is the share of one core used since the previous sample; the first
/// sample reports 0.
pub struct ProcessProbe {
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    last: Mutex<Option<(Instant, u64)>>,
}

/// Kernel clock ticks per second on every mainstream Linux target.
#[cfg(target_os = "linux")]
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

impl ProcessProbe {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    #[cfg(target_os = "linux")]
    fn read_memory_mb() -> Result<f64, ProbeError> {
        let status = std::fs::read_to_string("/proc/self/status")
            .map_err(|e| ProbeError::ReadFailed(e.to_string()))?;
        parse_vm_rss_kb(&status)
            .map(|kb| kb as f64 / 1024.0)
            .ok_or_else(|| ProbeError::ReadFailed("VmRSS missing".to_string()))
    }

    #[cfg(target_os = "linux")]
    fn read_cpu_ticks() -> Result<u64, ProbeError> {
        let stat = std::fs::read_to_string("/proc/self/stat")
            .map_err(|e| ProbeError::ReadFailed(e.to_string()))?;
        parse_cpu_ticks(&stat)
            .ok_or_else(|| ProbeError::ReadFailed("malformed /proc/self/stat".to_string()))
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
impl ResourceProbe for ProcessProbe {
    fn sample(&self) -> Result<ResourceReading, ProbeError> {
        let memory_mb = Self::read_memory_mb()?;
        let ticks = Self::read_cpu_ticks()?;
        let now = Instant::now();

        let mut last = self.last.lock();
        let cpu_percent = match *last {
            Some((prev_at, prev_ticks)) => {
                let wall = now.duration_since(prev_at).as_secs_f64();
                if wall > 0.0 {
                    let used = ticks.saturating_sub(prev_ticks) as f64 / CLOCK_TICKS_PER_SEC;
                    used / wall * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        *last = Some((now, ticks));

        Ok(ResourceReading::new(memory_mb, cpu_percent))
    }
}

#[cfg(not(target_os = "linux"))]
impl ResourceProbe for ProcessProbe {
    fn sample(&self) -> Result<ResourceReading, ProbeError> {
        Err(ProbeError::Unsupported(std::env::consts::OS.to_string()))
    }
}

/// Value of the `VmRSS:` line in kB.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss_kb(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|l| l.starts_with("VmRSS:"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
}

/// utime + stime from `/proc/<pid>/stat`.
///
/// The command name may contain spaces, so fields are counted after the
/// closing parenthesis.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpu_ticks(stat: &str) -> Option<u64> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // fields[0] is state (field 3); utime and stime are fields 14 and 15.
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

/// Probe that always returns the same reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProbe {
    reading: ResourceReading,
}

impl FixedProbe {
    pub fn new(memory_mb: f64, cpu_percent: f64) -> Self {
        Self {
            reading: ResourceReading::new(memory_mb, cpu_percent),
        }
    }
}

impl ResourceProbe for FixedProbe {
    fn sample(&self) -> Result<ResourceReading, ProbeError> {
        Ok(self.reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\tautoflow\nVmPeak:\t  20000 kB\nVmRSS:\t   10240 kB\nThreads:\t4\n";
        assert_eq!(parse_vm_rss_kb(status), Some(10240));
        assert_eq!(parse_vm_rss_kb("Name:\tx\n"), None);
    }

    #[test]
    fn test_parse_cpu_ticks_with_spaces_in_name() {
        let stat = "1234 (my proc) S 1 1234 1234 0 -1 4194560 100 0 0 0 250 50 0 0 20 0 1 0";
        assert_eq!(parse_cpu_ticks(stat), Some(300));
        assert_eq!(parse_cpu_ticks("garbage"), None);
    }

    #[test]
    fn test_fixed_probe() {
        let probe = FixedProbe::new(1500.0, 42.0);
        let reading = probe.sample().unwrap();
        assert_eq!(reading.memory_mb, 1500.0);
        assert_eq!(reading.cpu_percent, 42.0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_probe_linux() {
        let probe = ProcessProbe::new();
        let first = probe.sample().unwrap();
        assert!(first.memory_mb > 0.0);
        assert_eq!(first.cpu_percent, 0.0);
        let second = probe.sample().unwrap();
        assert!(second.cpu_percent >= 0.0);
    }
}
