//! Output driver implementations.
//!
//! - [`simulation`] - In-memory PWM channel for development and testing
//! - [`sysfs`] - Linux sysfs PWM channel (e.g. Raspberry Pi GPIO19 / PWM1)
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `OutputDriver` trait from `gauge_common::output`
//! 3. Register the driver in [`register_all_drivers`]

pub mod simulation;
pub mod sysfs;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register(
        "simulation",
        "In-memory PWM channel, no hardware",
        simulation::create_driver,
    );
    registry.register(
        "sysfs",
        "Linux /sys/class/pwm channel (Raspberry Pi GPIO19 = PWM1)",
        sysfs::create_driver,
    );
}
