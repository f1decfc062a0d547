use std::time::Duration;

use anyhow::{anyhow, Result};

/// Delay policy between consecutive attempts of one run.
///
/// Successes wait `success_base`, plus `success_step` on odd attempt indexes.
/// Failures wait `failure`, which is never shorter than the longest success
/// delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    success_base: Duration,
    success_step: Duration,
    failure: Duration,
}

impl Pacing {
    pub fn new(success_base: Duration, success_step: Duration, failure: Duration) -> Result<Self> {
        if failure < success_base + success_step {
            return Err(anyhow!(
                "failure delay ({failure:?}) must be >= success delay ceiling ({:?})",
                success_base + success_step
            ));
        }
        Ok(Self {
            success_base,
            success_step,
            failure,
        })
    }

    pub fn none() -> Self {
        Self {
            success_base: Duration::ZERO,
            success_step: Duration::ZERO,
            failure: Duration::ZERO,
        }
    }

    /// Delay to wait after attempt `index` (0-based) before starting the next one.
    pub fn delay_after(&self, index: u32, succeeded: bool) -> Duration {
        if succeeded {
            self.success_base + self.success_step * (index % 2)
        } else {
            self.failure
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            success_base: Duration::from_secs(3),
            success_step: Duration::from_secs(1),
            failure: Duration::from_secs(5),
        }
    }
}
