//! Resource probe trait.

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// One memory/CPU observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceReading {
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

impl ResourceReading {
    pub fn new(memory_mb: f64, cpu_percent: f64) -> Self {
        Self {
            memory_mb,
            cpu_percent,
        }
    }
}

/// Source of resource readings.
pub trait ResourceProbe: Send + Sync {
    /// Take a reading of current usage.
    fn sample(&self) -> Result<ResourceReading, ProbeError>;
}
