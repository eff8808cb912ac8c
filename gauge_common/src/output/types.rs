//! Output value types.
//!
//! - `PwmMode` - How the driver interprets a duty value
//! - `DriverDiagnostics` - Counters reported by a driver on request

use serde::{Deserialize, Serialize};

/// PWM modulation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PwmMode {
    /// Pulses spread evenly over the period.
    #[default]
    Balanced,
    /// One contiguous high pulse per period.
    MarkSpace,
}

impl std::fmt::Display for PwmMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Balanced => write!(f, "balanced"),
            Self::MarkSpace => write!(f, "mark-space"),
        }
    }
}

/// Optional driver diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverDiagnostics {
    /// Number of successful duty writes
    pub write_count: u64,
    /// Number of rejected or failed duty writes
    pub failed_writes: u64,
    /// Last value applied to the channel
    pub last_value: Option<u32>,
}
