//! Process resource usage sampling for periodic diagnostics.

use crate::{Error, Result};
use std::fmt;
use sysinfo::{Pid, System};

/// CPU and memory usage of this process
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    /// CPU time since the previous sample as a percentage of one core
    pub cpu_percent: f64,
    /// Resident set size in MiB
    pub resident_mb: f64,
}

impl fmt::Display for ResourceUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[resource usage] CPU: {:.2}%, RAM: {:.2} MB",
            self.cpu_percent, self.resident_mb
        )
    }
}

/// Source of resource usage samples
pub trait ResourceMonitor {
    /// Take a sample
    ///
    /// # Errors
    ///
    /// Returns [`Error::Diagnostics`] when the platform cannot report usage.
    fn sample(&mut self) -> Result<ResourceUsage>;
}

/// Samples the current process through `sysinfo`
pub struct ProcessMonitor {
    system: System,
    pid: Option<Pid>,
}

impl ProcessMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceMonitor for ProcessMonitor {
    fn sample(&mut self) -> Result<ResourceUsage> {
        let pid = self
            .pid
            .ok_or_else(|| Error::Diagnostics("Cannot determine own process id".to_string()))?;

        // CPU usage is relative to the previous refresh, so the first sample reads 0
        if !self.system.refresh_process(pid) {
            return Err(Error::Diagnostics(format!("Process {pid} is not visible")));
        }
        let process = self
            .system
            .process(pid)
            .ok_or_else(|| Error::Diagnostics(format!("Process {pid} is not visible")))?;

        Ok(ResourceUsage {
            cpu_percent: f64::from(process.cpu_usage()),
            resident_mb: bytes_to_mb(process.memory()),
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let usage = ResourceUsage {
            cpu_percent: 12.345,
            resident_mb: 50.0,
        };
        assert_eq!(usage.to_string(), "[resource usage] CPU: 12.35%, RAM: 50.00 MB");
    }

    #[test]
    fn test_bytes_to_mb() {
        assert_eq!(bytes_to_mb(0), 0.0);
        assert_eq!(bytes_to_mb(52_428_800), 50.0);
    }

    #[test]
    fn test_process_monitor_samples() {
        let mut monitor = ProcessMonitor::new();
        let first = monitor.sample().unwrap();
        assert!(first.cpu_percent >= 0.0);
        assert!(first.resident_mb > 0.0);

        let second = monitor.sample().unwrap();
        assert!(second.cpu_percent >= 0.0);
        assert!(second.resident_mb > 0.0);
    }
}
