//! Line-delimited message source.
//!
//! Reads one JSON payload per line, e.g. piped from
//! `mosquitto_sub -t /ws/4/ind/wind_speed`, and hands each line to the
//! [`InputAdapter`]. Used with `--stdin` instead of the built-in MQTT
//! subscriber.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::input::InputAdapter;

/// Topic reported for messages read from a line source.
pub const LINE_SOURCE_TOPIC: &str = "stdin";

/// Feed every non-blank line of `reader` to `adapter`.
///
/// Stops at end of input, on a read error, or once `running` is cleared.
/// Returns the number of readings accepted.
pub fn run_line_source<R: BufRead>(reader: R, adapter: &InputAdapter, running: &AtomicBool) -> usize {
    let mut accepted = 0;

    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Line source read failed: {}", e);
                break;
            }
        };
        let payload = line.trim();
        if payload.is_empty() {
            continue;
        }
        if adapter.on_message(LINE_SOURCE_TOPIC, payload.as_bytes()) {
            accepted += 1;
        }
    }

    info!("Line source finished ({} readings accepted)", accepted);
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setpoint::SetpointRegister;
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn feeds_lines_and_skips_bad_ones() {
        let reg = Arc::new(SetpointRegister::default());
        let adapter = InputAdapter::new(Arc::clone(&reg));
        let input = Cursor::new(
            "{\"value\":\"5\"}\n\n garbage \n{\"value\":\"x\"}\n{\"id\":1,\"timestamp\":2,\"value\":\"12\"}\n",
        );

        let accepted = run_line_source(input, &adapter, &AtomicBool::new(true));
        assert_eq!(accepted, 2);
        assert_eq!(reg.read(), 48);
    }

    #[test]
    fn stops_when_not_running() {
        let reg = Arc::new(SetpointRegister::default());
        let adapter = InputAdapter::new(Arc::clone(&reg));
        let input = Cursor::new("{\"value\":\"5\"}\n");

        let accepted = run_line_source(input, &adapter, &AtomicBool::new(false));
        assert_eq!(accepted, 0);
        assert_eq!(reg.read(), 0);
    }
}
