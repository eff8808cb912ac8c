//! # Gauge HAL Library
//!
//! Drives a PWM-controlled analog gauge from asynchronously arriving
//! readings, moving the needle at most one unit per tick.
//!
//! # Module Structure
//!
//! - [`core`] - GaugeCore struct, loop thread lifecycle
//! - [`setpoint`] - Setpoint register shared by input and loop
//! - [`smoothing`] - Smoothing loop and ticker abstraction
//! - [`input`] - Payload parsing, clamping and scaling
//! - [`source`] - Line-delimited message source
//! - [`driver_registry`] - Output driver catalogue
//! - [`drivers`] - Output driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          gauge_hal                                │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐   │
//! │  │ InputAdapter │──►│ SetpointRegister │──►│  SmoothingLoop   │   │
//! │  │ (MQTT/stdin) │   │    (atomic)      │   │ (thread, ticker) │   │
//! │  └──────────────┘   └──────────────────┘   └────────┬─────────┘   │
//! │                                                     │             │
//! │                                                     ▼             │
//! │                                            ┌────────────────┐     │
//! │                                            │  OutputDriver  │     │
//! │                                            │  (trait)       │     │
//! │                                            └────────────────┘     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod input;
pub mod setpoint;
pub mod smoothing;
pub mod source;

// Re-export key types for convenience
pub use crate::core::GaugeCore;
pub use crate::driver_registry::DriverRegistry;
pub use crate::input::{InputAdapter, InputError};
pub use crate::setpoint::SetpointRegister;
pub use crate::smoothing::{IntervalTicker, LoopOutcome, LoopStats, SmoothingLoop, Ticker};
