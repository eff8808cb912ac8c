//! MQTT 3.1.1 packet codec (subscriber subset).
//!
//! Encodes CONNECT, SUBSCRIBE, PUBACK, PINGREQ and DISCONNECT; decodes
//! CONNACK, SUBACK, PUBLISH and PINGRESP. Anything else decodes to
//! [`Packet::Other`].
//!
//! ```text
//!  ┌────────────┬──────────────────────┬──────────────────────────┐
//!  │ type|flags │ remaining length     │ variable header+payload  │
//!  │  1 byte    │ 1..=4 bytes (varint) │ remaining length bytes   │
//!  └────────────┴──────────────────────┴──────────────────────────┘
//! ```

use std::io::{ErrorKind, Read};

use crate::error::{MqttError, MqttResult};

/// Protocol level for MQTT 3.1.1.
const PROTOCOL_LEVEL: u8 = 4;

/// Largest value the remaining-length varint can carry.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Largest packet body accepted from the broker. Station payloads are a
/// few dozen bytes.
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

/// SUBACK return code signalling failure.
pub const SUBACK_FAILURE: u8 = 0x80;

/// PINGREQ packet.
pub const PINGREQ: [u8; 2] = [0xC0, 0x00];

/// DISCONNECT packet.
pub const DISCONNECT: [u8; 2] = [0xE0, 0x00];

const TYPE_CONNACK: u8 = 2;
const TYPE_PUBLISH: u8 = 3;
const TYPE_SUBACK: u8 = 9;
const TYPE_PINGRESP: u8 = 13;

/// CONNECT parameters.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions<'a> {
    /// Client identifier.
    pub client_id: &'a str,
    /// Discard previous session state.
    pub clean_session: bool,
    /// Keep-alive in seconds.
    pub keep_alive_secs: u16,
}

/// A received PUBLISH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    /// Topic name.
    pub topic: String,
    /// Delivery QoS (0..=2).
    pub qos: u8,
    /// Retained message flag.
    pub retain: bool,
    /// Packet identifier, present for QoS > 0.
    pub packet_id: Option<u16>,
    /// Application payload.
    pub payload: Vec<u8>,
}

/// Packets a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Reply to CONNECT.
    ConnAck {
        /// Broker resumed an existing session.
        session_present: bool,
        /// 0 = accepted.
        return_code: u8,
    },
    /// Reply to SUBSCRIBE.
    SubAck {
        /// Identifier of the SUBSCRIBE being acknowledged.
        packet_id: u16,
        /// Granted QoS per filter, or [`SUBACK_FAILURE`].
        return_codes: Vec<u8>,
    },
    /// Application message.
    Publish(Publish),
    /// Reply to PINGREQ.
    PingResp,
    /// Any other packet type, body discarded.
    Other {
        /// The 4-bit packet type.
        packet_type: u8,
    },
}

/// Append the remaining-length varint for `len`.
pub fn encode_remaining_length(mut len: usize, out: &mut Vec<u8>) {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn frame(header: u8, body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 5);
    out.push(header);
    encode_remaining_length(body.len(), &mut out);
    out.extend_from_slice(&body);
    out
}

/// Encode a CONNECT packet (no will, no credentials).
pub fn encode_connect(opts: &ConnectOptions<'_>) -> Vec<u8> {
    let mut body = Vec::with_capacity(12 + opts.client_id.len());
    put_str(&mut body, "MQTT");
    body.push(PROTOCOL_LEVEL);
    body.push(if opts.clean_session { 0x02 } else { 0x00 });
    body.extend_from_slice(&opts.keep_alive_secs.to_be_bytes());
    put_str(&mut body, opts.client_id);
    frame(0x10, body)
}

/// Encode a SUBSCRIBE for a single topic filter.
pub fn encode_subscribe(packet_id: u16, topic: &str, qos: u8) -> Vec<u8> {
    let mut body = Vec::with_capacity(5 + topic.len());
    body.extend_from_slice(&packet_id.to_be_bytes());
    put_str(&mut body, topic);
    body.push(qos.min(2));
    frame(0x82, body)
}

/// Encode a PUBACK.
pub fn encode_puback(packet_id: u16) -> [u8; 4] {
    let [hi, lo] = packet_id.to_be_bytes();
    [0x40, 0x02, hi, lo]
}

/// Read one packet.
///
/// Returns `Ok(None)` if the reader timed out before the first byte of a
/// packet arrived. A timeout after that point is an error: the stream is
/// no longer aligned on a packet boundary.
pub fn read_packet<R: Read>(reader: &mut R) -> MqttResult<Option<Packet>> {
    let mut header = [0u8; 1];
    match reader.read(&mut header) {
        Ok(0) => return Err(MqttError::ConnectionClosed),
        Ok(_) => {}
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let len = read_remaining_length(reader)?;
    if len > MAX_PACKET_SIZE {
        return Err(MqttError::MalformedPacket("packet exceeds size limit"));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            MqttError::ConnectionClosed
        } else {
            MqttError::Io(e)
        }
    })?;
    decode(header[0], &body).map(Some)
}

fn read_remaining_length<R: Read>(reader: &mut R) -> MqttResult<usize> {
    let mut value = 0usize;
    for shift in [0, 7, 14, 21] {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        value |= usize::from(byte[0] & 0x7F) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(MqttError::MalformedPacket("remaining length longer than 4 bytes"))
}

/// Decode a packet from its first header byte and body.
pub fn decode(header: u8, body: &[u8]) -> MqttResult<Packet> {
    match header >> 4 {
        TYPE_CONNACK => {
            let [flags, return_code] = body else {
                return Err(MqttError::MalformedPacket("CONNACK length"));
            };
            Ok(Packet::ConnAck {
                session_present: flags & 0x01 == 0x01,
                return_code: *return_code,
            })
        }
        TYPE_PUBLISH => decode_publish(header, body).map(Packet::Publish),
        TYPE_SUBACK => {
            if body.len() < 3 {
                return Err(MqttError::MalformedPacket("SUBACK length"));
            }
            Ok(Packet::SubAck {
                packet_id: u16::from_be_bytes([body[0], body[1]]),
                return_codes: body[2..].to_vec(),
            })
        }
        TYPE_PINGRESP => Ok(Packet::PingResp),
        packet_type => Ok(Packet::Other { packet_type }),
    }
}

fn decode_publish(header: u8, body: &[u8]) -> MqttResult<Publish> {
    let qos = (header >> 1) & 0x03;
    if qos == 3 {
        return Err(MqttError::MalformedPacket("PUBLISH QoS 3"));
    }
    let retain = header & 0x01 == 0x01;

    if body.len() < 2 {
        return Err(MqttError::MalformedPacket("PUBLISH topic length"));
    }
    let topic_len = usize::from(u16::from_be_bytes([body[0], body[1]]));
    let mut pos = 2 + topic_len;
    let topic_bytes = body
        .get(2..pos)
        .ok_or(MqttError::MalformedPacket("PUBLISH topic truncated"))?;
    let topic = std::str::from_utf8(topic_bytes)
        .map_err(|_| MqttError::MalformedPacket("PUBLISH topic not UTF-8"))?
        .to_string();

    let packet_id = if qos > 0 {
        let id = body
            .get(pos..pos + 2)
            .ok_or(MqttError::MalformedPacket("PUBLISH packet id truncated"))?;
        pos += 2;
        Some(u16::from_be_bytes([id[0], id[1]]))
    } else {
        None
    };

    Ok(Publish {
        topic,
        qos,
        retain,
        packet_id,
        payload: body[pos..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn publish_bytes(topic: &str, payload: &[u8], qos: u8, packet_id: Option<u16>) -> Vec<u8> {
        let mut body = Vec::new();
        put_str(&mut body, topic);
        if let Some(id) = packet_id {
            body.extend_from_slice(&id.to_be_bytes());
        }
        body.extend_from_slice(payload);
        frame(0x30 | (qos << 1), body)
    }

    #[test]
    fn remaining_length_boundaries() {
        for (len, expected) in [
            (0usize, vec![0x00]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (16_383, vec![0xFF, 0x7F]),
            (16_384, vec![0x80, 0x80, 0x01]),
            (MAX_REMAINING_LENGTH, vec![0xFF, 0xFF, 0xFF, 0x7F]),
        ] {
            let mut out = Vec::new();
            encode_remaining_length(len, &mut out);
            assert_eq!(out, expected, "len {len}");
            assert_eq!(read_remaining_length(&mut Cursor::new(out)).unwrap(), len);
        }
    }

    #[test]
    fn remaining_length_too_long_is_malformed() {
        let result = read_remaining_length(&mut Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x01]));
        assert!(matches!(result, Err(MqttError::MalformedPacket(_))));
    }

    #[test]
    fn connect_layout() {
        let bytes = encode_connect(&ConnectOptions {
            client_id: "analog-wind",
            clean_session: true,
            keep_alive_secs: 30,
        });
        assert_eq!(bytes[0], 0x10);
        assert_eq!(usize::from(bytes[1]), bytes.len() - 2);
        assert_eq!(&bytes[2..8], b"\x00\x04MQTT");
        assert_eq!(bytes[8], 4);
        assert_eq!(bytes[9], 0x02);
        assert_eq!(&bytes[10..12], &[0x00, 30]);
        assert_eq!(&bytes[12..14], &[0x00, 11]);
        assert_eq!(&bytes[14..], b"analog-wind");
    }

    #[test]
    fn subscribe_layout() {
        let bytes = encode_subscribe(1, "/ws/4/ind/wind_speed", 0);
        assert_eq!(bytes[0], 0x82);
        assert_eq!(usize::from(bytes[1]), bytes.len() - 2);
        assert_eq!(&bytes[2..4], &[0x00, 0x01]);
        assert_eq!(&bytes[4..6], &[0x00, 20]);
        assert_eq!(&bytes[6..26], b"/ws/4/ind/wind_speed");
        assert_eq!(bytes[26], 0);
    }

    #[test]
    fn puback_layout() {
        assert_eq!(encode_puback(0x1234), [0x40, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn reads_connack() {
        let packet = read_packet(&mut Cursor::new(vec![0x20, 0x02, 0x01, 0x00]))
            .unwrap()
            .unwrap();
        assert_eq!(
            packet,
            Packet::ConnAck {
                session_present: true,
                return_code: 0
            }
        );
    }

    #[test]
    fn reads_suback() {
        let packet = read_packet(&mut Cursor::new(vec![0x90, 0x03, 0x00, 0x07, 0x80]))
            .unwrap()
            .unwrap();
        assert_eq!(
            packet,
            Packet::SubAck {
                packet_id: 7,
                return_codes: vec![SUBACK_FAILURE]
            }
        );
    }

    #[test]
    fn reads_qos0_publish() {
        let bytes = publish_bytes("/ws/4/ind/wind_speed", br#"{"value":"12"}"#, 0, None);
        let packet = read_packet(&mut Cursor::new(bytes)).unwrap().unwrap();
        let Packet::Publish(publish) = packet else {
            panic!("expected PUBLISH, got {packet:?}");
        };
        assert_eq!(publish.topic, "/ws/4/ind/wind_speed");
        assert_eq!(publish.qos, 0);
        assert_eq!(publish.packet_id, None);
        assert_eq!(publish.payload, br#"{"value":"12"}"#);
    }

    #[test]
    fn reads_qos1_publish_with_packet_id() {
        let bytes = publish_bytes("t", b"x", 1, Some(42));
        let packet = read_packet(&mut Cursor::new(bytes)).unwrap().unwrap();
        assert!(matches!(
            packet,
            Packet::Publish(Publish { qos: 1, packet_id: Some(42), .. })
        ));
    }

    #[test]
    fn reads_large_publish() {
        let payload = vec![b'a'; 300];
        let bytes = publish_bytes("t", &payload, 0, None);
        let packet = read_packet(&mut Cursor::new(bytes)).unwrap().unwrap();
        assert!(matches!(packet, Packet::Publish(ref p) if p.payload.len() == 300));
    }

    #[test]
    fn truncated_topic_is_malformed() {
        let result = decode(0x30, &[0x00, 0x10, b'a']);
        assert!(matches!(result, Err(MqttError::MalformedPacket(_))));
    }

    #[test]
    fn eof_is_connection_closed() {
        assert!(matches!(
            read_packet(&mut Cursor::new(Vec::new())),
            Err(MqttError::ConnectionClosed)
        ));
        assert!(matches!(
            read_packet(&mut Cursor::new(vec![0x30, 0x05, 0x00])),
            Err(MqttError::ConnectionClosed)
        ));
    }

    #[test]
    fn oversized_packet_is_rejected_before_reading_body() {
        let result = read_packet(&mut Cursor::new(vec![0x30, 0xFF, 0xFF, 0xFF, 0x7F]));
        assert!(matches!(
            result,
            Err(MqttError::MalformedPacket("packet exceeds size limit"))
        ));

        let mut at_limit = vec![0xB0];
        encode_remaining_length(MAX_PACKET_SIZE, &mut at_limit);
        at_limit.resize(at_limit.len() + MAX_PACKET_SIZE, 0);
        assert_eq!(
            read_packet(&mut Cursor::new(at_limit)).unwrap(),
            Some(Packet::Other { packet_type: 11 })
        );
    }

    #[test]
    fn unknown_packet_is_other() {
        let packet = read_packet(&mut Cursor::new(vec![0xB0, 0x02, 0x00, 0x01]))
            .unwrap()
            .unwrap();
        assert_eq!(packet, Packet::Other { packet_type: 11 });
    }

    #[test]
    fn pingresp() {
        let packet = read_packet(&mut Cursor::new(vec![0xD0, 0x00])).unwrap().unwrap();
        assert_eq!(packet, Packet::PingResp);
    }
}
