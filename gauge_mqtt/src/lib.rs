//! # Gauge MQTT Subscriber
//!
//! Minimal MQTT 3.1.1 client: one broker, one topic subscription,
//! payloads delivered to a callback. Only what the gauge needs is
//! implemented (QoS 0/1 receive, keep-alive, reconnect).
//!
//! ```text
//! broker ──TCP──► Subscriber::run ──(topic, payload)──► callback
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod error;
pub mod packet;

pub use client::{DEFAULT_POLL_INTERVAL, Subscriber};
pub use error::{MqttError, MqttResult};
