//! System-wide constants for the gauge workspace.
//!
//! Single source of truth for the output scale, the input domain and the
//! smoothing cadence. Imported by all crates.

use crate::output::PwmMode;
use static_assertions::const_assert_eq;
use std::time::Duration;

/// Full-scale denominator of the output channel (duty resolution).
pub const FULL_SCALE: u32 = 128;

/// Largest raw reading accepted from the input domain (wind speed units).
pub const MAX_INPUT_VALUE: i64 = 32;

/// Multiplier mapping the input domain onto the output scale.
pub const INPUT_SCALE_FACTOR: u32 = 4;

// 0..=32 must land exactly on 0..=128.
const_assert_eq!(MAX_INPUT_VALUE as u32 * INPUT_SCALE_FACTOR, FULL_SCALE);

/// Fixed smoothing tick period (10 Hz).
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// Units the actual value moves per tick.
pub const STEP: u32 = 1;

/// Modulation mode used for every output write.
pub const PWM_MODE: PwmMode = PwmMode::Balanced;

/// Default PWM carrier frequency in Hz.
pub const DEFAULT_PWM_FREQUENCY_HZ: u32 = 64_000;

/// Default sysfs PWM root.
pub const DEFAULT_SYSFS_PWM_ROOT: &str = "/sys/class/pwm";

/// Default PWM channel (GPIO19 on a Raspberry Pi is PWM channel 1).
pub const DEFAULT_PWM_CHANNEL: u32 = 1;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gauge/gauge.toml";

/// Default service / MQTT client identifier.
pub const DEFAULT_SERVICE_NAME: &str = "analog-wind";

/// Default MQTT broker address (`host:port`).
pub const DEFAULT_MQTT_BROKER: &str = "mq.edjusted.com:1883";

/// Default MQTT topic carrying wind speed readings.
pub const DEFAULT_MQTT_TOPIC: &str = "/ws/4/ind/wind_speed";

/// Default MQTT keep-alive in seconds.
pub const DEFAULT_MQTT_KEEP_ALIVE_SECS: u16 = 30;

/// Upper bound of the reconnect backoff in seconds.
pub const DEFAULT_MQTT_RECONNECT_MAX_SECS: u64 = 30;
