//! MQTT message source configuration.

use crate::config::ConfigError;
use crate::consts::{
    DEFAULT_MQTT_BROKER, DEFAULT_MQTT_KEEP_ALIVE_SECS, DEFAULT_MQTT_RECONNECT_MAX_SECS,
    DEFAULT_MQTT_TOPIC, DEFAULT_SERVICE_NAME,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_broker() -> String {
    DEFAULT_MQTT_BROKER.to_string()
}

fn default_client_id() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_topic() -> String {
    DEFAULT_MQTT_TOPIC.to_string()
}

fn default_true() -> bool {
    true
}

fn default_keep_alive_secs() -> u16 {
    DEFAULT_MQTT_KEEP_ALIVE_SECS
}

fn default_reconnect_max_secs() -> u64 {
    DEFAULT_MQTT_RECONNECT_MAX_SECS
}

/// The `[mqtt]` section of `gauge.toml`.
///
/// # TOML Example
///
/// ```toml
/// [mqtt]
/// broker = "mq.edjusted.com:1883"
/// client_id = "analog-wind"
/// topic = "/ws/4/ind/wind_speed"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttConfig {
    /// Broker address as `host:port`.
    #[serde(default = "default_broker")]
    pub broker: String,

    /// Client identifier sent in CONNECT.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Topic filter to subscribe to.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Ask the broker to discard any previous session.
    #[serde(default = "default_true")]
    pub clean_session: bool,

    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u16,

    /// Upper bound of the reconnect backoff in seconds.
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            client_id: default_client_id(),
            topic: default_topic(),
            clean_session: true,
            keep_alive_secs: default_keep_alive_secs(),
            reconnect_max_secs: default_reconnect_max_secs(),
        }
    }
}

impl MqttConfig {
    /// Keep-alive as a `Duration`.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    /// Validate the MQTT configuration.
    ///
    /// # Validation Rules
    /// 1. `broker` is `host:port` with a numeric port
    /// 2. `client_id` and `topic` are not empty
    /// 3. `keep_alive_secs` > 0 and `reconnect_max_secs` > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_broker = self
            .broker
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !valid_broker {
            return Err(ConfigError::ValidationError(format!(
                "mqtt.broker must be host:port, got '{}'",
                self.broker
            )));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "mqtt.client_id cannot be empty".to_string(),
            ));
        }
        if self.topic.is_empty() {
            return Err(ConfigError::ValidationError(
                "mqtt.topic cannot be empty".to_string(),
            ));
        }
        if self.keep_alive_secs == 0 {
            return Err(ConfigError::ValidationError(
                "mqtt.keep_alive_secs must be greater than 0".to_string(),
            ));
        }
        if self.reconnect_max_secs == 0 {
            return Err(ConfigError::ValidationError(
                "mqtt.reconnect_max_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
