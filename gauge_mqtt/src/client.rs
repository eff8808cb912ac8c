//! Blocking MQTT subscriber.
//!
//! Connects, subscribes to one topic and hands every PUBLISH payload to a
//! callback until the running flag is cleared. Connection failures are
//! logged and retried with exponential backoff; they never reach the
//! callback's consumer.

use gauge_common::mqtt::MqttConfig;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{MqttError, MqttResult};
use crate::packet::{
    self, ConnectOptions, DISCONNECT, PINGREQ, Packet, Publish, SUBACK_FAILURE,
};

/// Longest time the running flag goes unchecked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// TCP connect and CONNACK/SUBACK wait limit.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Packet identifier used for the single SUBSCRIBE.
const SUBSCRIBE_PACKET_ID: u16 = 1;

/// Initial reconnect delay.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// MQTT subscriber for a single topic.
pub struct Subscriber {
    config: MqttConfig,
    poll_interval: Duration,
}

impl Subscriber {
    /// Create a subscriber from configuration.
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the running-flag poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run sessions until `running` is cleared, reconnecting on failure.
    ///
    /// The reconnect delay doubles after each failed session and starts
    /// over once a session gets as far as a granted subscription.
    pub fn run<F>(&self, running: &AtomicBool, mut on_message: F)
    where
        F: FnMut(&str, &[u8]),
    {
        let mut backoff = Backoff::new(
            INITIAL_BACKOFF,
            Duration::from_secs(self.config.reconnect_max_secs),
        );

        while running.load(Ordering::SeqCst) {
            let mut subscribed = false;
            let result = self.session(running, &mut on_message, &mut subscribed);
            if subscribed {
                backoff.reset();
            }
            match result {
                Ok(()) => break,
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        "MQTT session with {} ended: {} (retrying in {}s)",
                        self.config.broker,
                        e,
                        delay.as_secs_f32()
                    );
                    self.sleep_while_running(delay, running);
                }
            }
        }
        info!("MQTT subscriber stopped");
    }

    /// One connect → subscribe → receive session.
    ///
    /// Returns `Ok(())` when the session ended because `running` was
    /// cleared, and an error for every other way it can end.
    pub fn run_session<F>(&self, running: &AtomicBool, on_message: &mut F) -> MqttResult<()>
    where
        F: FnMut(&str, &[u8]),
    {
        self.session(running, on_message, &mut false)
    }

    /// `subscribed` is set once the broker grants the subscription.
    fn session<F>(&self, running: &AtomicBool, on_message: &mut F, subscribed: &mut bool) -> MqttResult<()>
    where
        F: FnMut(&str, &[u8]),
    {
        let mut stream = self.connect_stream()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.poll_interval))?;

        stream.write_all(&packet::encode_connect(&ConnectOptions {
            client_id: &self.config.client_id,
            clean_session: self.config.clean_session,
            keep_alive_secs: self.config.keep_alive_secs,
        }))?;

        match self.await_reply(&mut stream, running, on_message)? {
            None => return Ok(()),
            Some(Packet::ConnAck { return_code: 0, session_present }) => {
                info!(
                    "Connected to {} as '{}' (session_present={})",
                    self.config.broker, self.config.client_id, session_present
                );
            }
            Some(Packet::ConnAck { return_code, .. }) => {
                return Err(MqttError::ConnectionRefused(return_code));
            }
            Some(other) => return Err(MqttError::UnexpectedPacket(format!("{other:?}"))),
        }

        stream.write_all(&packet::encode_subscribe(SUBSCRIBE_PACKET_ID, &self.config.topic, 0))?;
        match self.await_reply(&mut stream, running, on_message)? {
            None => return Ok(()),
            Some(Packet::SubAck { return_codes, .. })
                if return_codes.first().is_some_and(|&code| code != SUBACK_FAILURE) =>
            {
                info!("Subscribed to {}", self.config.topic);
                *subscribed = true;
            }
            Some(Packet::SubAck { .. }) => {
                return Err(MqttError::SubscribeRejected(self.config.topic.clone()));
            }
            Some(other) => return Err(MqttError::UnexpectedPacket(format!("{other:?}"))),
        }

        let keep_alive = self.config.keep_alive();
        let mut last_sent = Instant::now();
        let mut last_received = Instant::now();

        while running.load(Ordering::SeqCst) {
            match packet::read_packet(&mut stream)? {
                Some(Packet::Publish(publish)) => {
                    last_received = Instant::now();
                    if Self::acknowledge(&mut stream, &publish)? {
                        last_sent = Instant::now();
                    }
                    on_message(&publish.topic, &publish.payload);
                }
                Some(Packet::PingResp) => last_received = Instant::now(),
                Some(other) => {
                    last_received = Instant::now();
                    debug!("Ignoring {:?}", other);
                }
                None => {}
            }

            if last_sent.elapsed() >= keep_alive / 2 {
                stream.write_all(&PINGREQ)?;
                last_sent = Instant::now();
            }
            if last_received.elapsed() >= keep_alive * 3 / 2 {
                return Err(MqttError::KeepAliveTimeout(keep_alive.as_secs()));
            }
        }

        if let Err(e) = stream.write_all(&DISCONNECT) {
            debug!("DISCONNECT not sent: {}", e);
        }
        Ok(())
    }

    fn connect_stream(&self) -> MqttResult<TcpStream> {
        let mut last_error = None;
        for addr in self.config.broker.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, HANDSHAKE_TIMEOUT) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }
        Err(MqttError::Io(last_error.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} resolved to no addresses", self.config.broker),
            )
        })))
    }

    /// Wait for the next control packet, delivering any PUBLISH that
    /// arrives first. `None` means `running` was cleared.
    fn await_reply<F>(
        &self,
        stream: &mut TcpStream,
        running: &AtomicBool,
        on_message: &mut F,
    ) -> MqttResult<Option<Packet>>
    where
        F: FnMut(&str, &[u8]),
    {
        let started = Instant::now();
        while running.load(Ordering::SeqCst) {
            match packet::read_packet(stream)? {
                Some(Packet::Publish(publish)) => {
                    Self::acknowledge(stream, &publish)?;
                    on_message(&publish.topic, &publish.payload);
                }
                Some(packet) => return Ok(Some(packet)),
                None if started.elapsed() >= HANDSHAKE_TIMEOUT => {
                    return Err(MqttError::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "broker did not reply",
                    )));
                }
                None => {}
            }
        }
        Ok(None)
    }

    /// PUBACK a QoS 1 publish. Returns whether anything was sent.
    fn acknowledge(stream: &mut TcpStream, publish: &Publish) -> MqttResult<bool> {
        match (publish.qos, publish.packet_id) {
            (1, Some(id)) => {
                stream.write_all(&packet::encode_puback(id))?;
                Ok(true)
            }
            (2, _) => {
                debug!("QoS 2 delivery on {} not acknowledged", publish.topic);
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn sleep_while_running(&self, total: Duration, running: &AtomicBool) {
        let deadline = Instant::now() + total;
        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

/// Exponential reconnect delay, doubling from `initial` up to `max`.
#[derive(Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay before the next attempt; doubles the one after.
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn backoff_doubles_up_to_max() {
        let mut backoff = Backoff::new(secs(1), secs(10));
        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay()).collect();
        assert_eq!(delays, vec![secs(1), secs(2), secs(4), secs(8), secs(10), secs(10)]);
    }

    #[test]
    fn backoff_reset_starts_over() {
        let mut backoff = Backoff::new(secs(1), secs(60));
        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), secs(1));
        assert_eq!(backoff.next_delay(), secs(2));
    }

    #[test]
    fn backoff_initial_is_capped_by_max() {
        let mut backoff = Backoff::new(secs(5), secs(2));
        assert_eq!(backoff.next_delay(), secs(2));
        assert_eq!(backoff.next_delay(), secs(2));
    }
}
