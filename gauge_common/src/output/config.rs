//! Output configuration types.
//!
//! - `OutputConfig` - The `[output]` section of `gauge.toml`
//! - `SysfsConfig` - Location of the Linux PWM channel for the `sysfs` driver

use crate::config::ConfigError;
use crate::consts::{DEFAULT_PWM_CHANNEL, DEFAULT_PWM_FREQUENCY_HZ, DEFAULT_SYSFS_PWM_ROOT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_driver() -> String {
    "simulation".to_string()
}

fn default_frequency_hz() -> u32 {
    DEFAULT_PWM_FREQUENCY_HZ
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_PWM_ROOT)
}

fn default_channel() -> u32 {
    DEFAULT_PWM_CHANNEL
}

/// Output channel configuration.
///
/// # TOML Example
///
/// ```toml
/// [output]
/// driver = "sysfs"
/// frequency_hz = 64000
///
/// [output.sysfs]
/// chip = 0
/// channel = 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Driver to load when none is given on the command line.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// PWM carrier frequency in Hz.
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: u32,

    /// Settings for the `sysfs` driver.
    #[serde(default)]
    pub sysfs: SysfsConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            frequency_hz: default_frequency_hz(),
            sysfs: SysfsConfig::default(),
        }
    }
}

impl OutputConfig {
    /// PWM period in nanoseconds derived from `frequency_hz`.
    pub fn period_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.frequency_hz.max(1))
    }

    /// Validate the output configuration.
    ///
    /// # Validation Rules
    /// 1. `driver` is not empty
    /// 2. `frequency_hz` > 0 and yields a period of at least 1 ns
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "output.driver cannot be empty".to_string(),
            ));
        }
        if self.frequency_hz == 0 || self.frequency_hz > 1_000_000_000 {
            return Err(ConfigError::ValidationError(format!(
                "output.frequency_hz out of range: {}",
                self.frequency_hz
            )));
        }
        Ok(())
    }
}

/// Linux sysfs PWM channel location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SysfsConfig {
    /// sysfs PWM class directory.
    #[serde(default = "default_sysfs_root")]
    pub root: PathBuf,

    /// `pwmchipN` index.
    #[serde(default)]
    pub chip: u32,

    /// Channel index within the chip.
    #[serde(default = "default_channel")]
    pub channel: u32,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            root: default_sysfs_root(),
            chip: 0,
            channel: default_channel(),
        }
    }
}

impl SysfsConfig {
    /// `<root>/pwmchip<chip>`
    pub fn chip_dir(&self) -> PathBuf {
        self.root.join(format!("pwmchip{}", self.chip))
    }

    /// `<root>/pwmchip<chip>/pwm<channel>`
    pub fn channel_dir(&self) -> PathBuf {
        self.chip_dir().join(format!("pwm{}", self.channel))
    }
}
