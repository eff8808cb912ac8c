//! Simulation driver module.
//!
//! Software PWM channel for running the gauge without hardware.

mod driver;

pub use driver::SimulationDriver;

use gauge_common::output::OutputDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn OutputDriver> {
    Box::new(SimulationDriver::new())
}
