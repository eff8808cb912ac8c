//! Gauge Common Library
//!
//! This crate provides shared constants, configuration loading and the
//! output driver contract for all gauge workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Output scale, input domain and timing constants
//! - [`config`] - Configuration loading traits and types
//! - [`output`] - Output driver trait, errors and configuration
//! - [`mqtt`] - MQTT message source configuration
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use gauge_common::prelude::*;
//!
//! assert_eq!(FULL_SCALE, 128);
//! ```

pub mod config;
pub mod consts;
pub mod mqtt;
pub mod output;
pub mod prelude;
