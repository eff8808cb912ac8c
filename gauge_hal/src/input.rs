//! Input adapter: turns raw wind-speed messages into setpoints.
//!
//! Payloads look like `{"id": 4, "timestamp": 1700000000, "value": "17"}`.
//! Only `value` is used; it is parsed as a base-10 integer, clamped to
//! `0..=MAX_INPUT_VALUE` and multiplied by `INPUT_SCALE_FACTOR`.
//!
//! Malformed messages are logged and dropped. Nothing here can stop the
//! smoothing loop or the message source.

use gauge_common::consts::{INPUT_SCALE_FACTOR, MAX_INPUT_VALUE};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::setpoint::SetpointRegister;

/// Rejected input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Payload is not valid JSON or lacks the `value` field.
    #[error("invalid payload: {0}")]
    InvalidJson(String),

    /// `value` is not a base-10 integer.
    #[error("invalid value '{value}': {reason}")]
    InvalidValue {
        /// The offending `value` string.
        value: String,
        /// Parser error.
        reason: String,
    },
}

/// One wind-speed reading as published by the station.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindReading {
    /// Station identifier.
    #[serde(default)]
    pub id: f64,
    /// Sample time (station clock).
    #[serde(default)]
    pub timestamp: f64,
    /// Speed as a decimal string.
    pub value: String,
}

impl WindReading {
    /// Parse `value` as a base-10 integer.
    pub fn speed(&self) -> Result<i64, InputError> {
        self.value
            .parse::<i64>()
            .map_err(|e| InputError::InvalidValue {
                value: self.value.clone(),
                reason: e.to_string(),
            })
    }
}

/// Decode a JSON payload.
pub fn parse_reading(payload: &[u8]) -> Result<WindReading, InputError> {
    serde_json::from_slice(payload).map_err(|e| InputError::InvalidJson(e.to_string()))
}

/// Map a raw speed onto the output scale.
///
/// Out-of-range speeds are clamped, not rejected; negative speeds read as 0.
pub fn scale_speed(raw: i64) -> u32 {
    raw.clamp(0, MAX_INPUT_VALUE) as u32 * INPUT_SCALE_FACTOR
}

/// Writes validated readings into the setpoint register.
#[derive(Debug, Clone)]
pub struct InputAdapter {
    setpoint: Arc<SetpointRegister>,
}

impl InputAdapter {
    /// Create an adapter writing to `setpoint`.
    pub fn new(setpoint: Arc<SetpointRegister>) -> Self {
        Self { setpoint }
    }

    /// Parse, scale and apply one message.
    ///
    /// Returns the new setpoint. On error the register is untouched.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> Result<u32, InputError> {
        let reading = parse_reading(payload)?;
        let speed = reading.speed()?;
        let setpoint = scale_speed(speed);
        self.setpoint.update(setpoint);
        info!(
            topic,
            id = reading.id,
            speed,
            setpoint,
            "Received reading"
        );
        Ok(setpoint)
    }

    /// Message-source callback: like [`handle_message`], but errors are
    /// logged and the message is discarded.
    ///
    /// Returns whether the reading was applied.
    ///
    /// [`handle_message`]: InputAdapter::handle_message
    pub fn on_message(&self, topic: &str, payload: &[u8]) -> bool {
        match self.handle_message(topic, payload) {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    topic,
                    payload = %String::from_utf8_lossy(payload),
                    "Dropping message: {}",
                    e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> (InputAdapter, Arc<SetpointRegister>) {
        let reg = Arc::new(SetpointRegister::default());
        (InputAdapter::new(Arc::clone(&reg)), reg)
    }

    #[test]
    fn parses_full_payload() {
        let reading = parse_reading(br#"{"id": 4, "timestamp": 1700000000, "value": "17"}"#).unwrap();
        assert_eq!(reading.id, 4.0);
        assert_eq!(reading.timestamp, 1_700_000_000.0);
        assert_eq!(reading.speed(), Ok(17));
    }

    #[test]
    fn id_and_timestamp_are_optional() {
        let reading = parse_reading(br#"{"value": "3"}"#).unwrap();
        assert_eq!(reading.id, 0.0);
        assert_eq!(reading.speed(), Ok(3));
    }

    #[test]
    fn missing_value_is_rejected() {
        let err = parse_reading(br#"{"id": 1, "timestamp": 2}"#).unwrap_err();
        assert!(matches!(err, InputError::InvalidJson(_)));
    }

    #[test]
    fn numeric_json_value_is_rejected() {
        // The station sends the speed as a string.
        let err = parse_reading(br#"{"value": 12}"#).unwrap_err();
        assert!(matches!(err, InputError::InvalidJson(_)));
    }

    #[test]
    fn scale_clamps_both_ends() {
        assert_eq!(scale_speed(0), 0);
        assert_eq!(scale_speed(1), 4);
        assert_eq!(scale_speed(32), 128);
        assert_eq!(scale_speed(40), 128);
        assert_eq!(scale_speed(-5), 0);
        assert_eq!(scale_speed(i64::MAX), 128);
    }

    #[test]
    fn handle_message_updates_register() {
        let (adapter, reg) = adapter();
        let set = adapter
            .handle_message("/ws/4/ind/wind_speed", br#"{"id":1,"timestamp":2,"value":"40"}"#)
            .unwrap();
        assert_eq!(set, 128);
        assert_eq!(reg.read(), 128);
    }

    #[test]
    fn non_numeric_value_leaves_register_unchanged() {
        let (adapter, reg) = adapter();
        reg.update(44);
        let err = adapter
            .handle_message("t", br#"{"value":"calm"}"#)
            .unwrap_err();
        assert!(matches!(err, InputError::InvalidValue { ref value, .. } if value == "calm"));
        assert_eq!(reg.read(), 44);
    }

    #[test]
    fn on_message_swallows_errors_and_keeps_processing() {
        let (adapter, reg) = adapter();
        assert!(!adapter.on_message("t", b"not json"));
        assert!(!adapter.on_message("t", br#"{"value":"1.5"}"#));
        assert_eq!(reg.read(), 0);
        assert!(adapter.on_message("t", br#"{"value":"8"}"#));
        assert_eq!(reg.read(), 32);
    }
}
