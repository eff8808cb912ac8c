//! Linux sysfs PWM driver module.

mod driver;

pub use driver::SysfsPwmDriver;

use gauge_common::output::OutputDriver;

/// Factory function to create a sysfs PWM driver instance.
pub fn create_driver() -> Box<dyn OutputDriver> {
    Box::new(SysfsPwmDriver::new())
}
