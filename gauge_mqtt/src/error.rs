//! MQTT error types.

use thiserror::Error;

/// Error type for MQTT session operations.
#[derive(Debug, Error)]
pub enum MqttError {
    /// Socket or address resolution failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Broker answered CONNECT with a non-zero return code.
    #[error("connection refused by broker (code {0})")]
    ConnectionRefused(u8),

    /// Broker rejected the topic subscription.
    #[error("subscription to '{0}' rejected")]
    SubscribeRejected(String),

    /// Bytes on the wire do not form a valid packet.
    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    /// Broker closed the connection.
    #[error("connection closed by broker")]
    ConnectionClosed,

    /// Nothing received from the broker within 1.5x keep-alive.
    #[error("no traffic from broker for {0}s")]
    KeepAliveTimeout(u64),

    /// A packet arrived that is not valid at this point of the session.
    #[error("unexpected packet: {0}")]
    UnexpectedPacket(String),
}

/// Convenience alias.
pub type MqttResult<T> = Result<T, MqttError>;
