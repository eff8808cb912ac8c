//! Prelude module for common re-exports.
//!
//! ```rust
//! use gauge_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, GaugeConfig, SharedConfig};
pub use crate::mqtt::MqttConfig;
pub use crate::output::{OutputConfig, SysfsConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{FULL_SCALE, INPUT_SCALE_FACTOR, MAX_INPUT_VALUE, PWM_MODE, TICK_PERIOD};

// ─── Output drivers ─────────────────────────────────────────────────
pub use crate::output::{DriverDiagnostics, DriverFactory, GaugeError, OutputDriver, PwmMode};
