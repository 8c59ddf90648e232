//! Host CPU and memory sampling.

use parking_lot::Mutex;
use sysinfo::System;
use thiserror::Error;

/// CPU load and memory utilization, both as percentages rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SampleError {
    #[error("operating system reported no logical CPUs")]
    NoCpus,
    #[error("operating system reported zero total memory")]
    NoMemory,
}

/// Source of host resource readings for the exporter.
pub trait HostSampler: Send + Sync {
    fn sample(&self) -> Result<HostSample, SampleError>;
}

/// Reads load average and memory from the operating system via `sysinfo`.
pub struct SystemSampler {
    system: Mutex<System>,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSampler for SystemSampler {
    fn sample(&self) -> Result<HostSample, SampleError> {
        let mut system = self.system.lock();
        system.refresh_cpu();
        system.refresh_memory();

        let load = System::load_average();
        Ok(HostSample {
            cpu_percent: cpu_percent(load.one, system.cpus().len())?,
            memory_percent: memory_percent(system.total_memory(), system.free_memory())?,
        })
    }
}

/// `(load ÷ cores) × 100`, rounded to 2 decimals.
pub fn cpu_percent(load_one: f64, logical_cores: usize) -> Result<f64, SampleError> {
    if logical_cores == 0 {
        return Err(SampleError::NoCpus);
    }
    Ok(round2(load_one / logical_cores as f64 * 100.0))
}

/// `((total − free) ÷ total) × 100`, rounded to 2 decimals.
pub fn memory_percent(total: u64, free: u64) -> Result<f64, SampleError> {
    if total == 0 {
        return Err(SampleError::NoMemory);
    }
    let used = total.saturating_sub(free);
    Ok(round2(used as f64 / total as f64 * 100.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
