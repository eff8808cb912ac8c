//! Setpoint register shared between the input side and the smoothing loop.
//!
//! One writer (message delivery context), one reader (smoothing loop).
//! The value fits a `u32`, so a single atomic replaces a lock: both
//! operations are O(1) and never block.

use std::sync::atomic::{AtomicU32, Ordering};

/// Latest requested output level.
///
/// No validation happens here; writers clamp before calling [`update`].
///
/// [`update`]: SetpointRegister::update
#[derive(Debug, Default)]
pub struct SetpointRegister {
    value: AtomicU32,
}

impl SetpointRegister {
    /// Create a register holding `initial`.
    pub fn new(initial: u32) -> Self {
        Self {
            value: AtomicU32::new(initial),
        }
    }

    /// Overwrite the setpoint.
    pub fn update(&self, value: u32) {
        self.value.store(value, Ordering::Release);
    }

    /// Most recently written setpoint.
    pub fn read(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_at_zero_by_default() {
        assert_eq!(SetpointRegister::default().read(), 0);
    }

    #[test]
    fn last_write_wins() {
        let reg = SetpointRegister::new(7);
        reg.update(10);
        reg.update(100);
        reg.update(50);
        assert_eq!(reg.read(), 50);
    }

    #[test]
    fn write_is_visible_across_threads() {
        let reg = Arc::new(SetpointRegister::default());
        let writer = Arc::clone(&reg);
        thread::spawn(move || writer.update(96))
            .join()
            .expect("writer thread");
        assert_eq!(reg.read(), 96);
    }
}
