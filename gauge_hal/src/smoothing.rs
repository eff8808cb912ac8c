//! Smoothing loop: steers the applied output toward the setpoint.
//!
//! Every tick the loop reads the [`SetpointRegister`], moves its local
//! actual value by exactly [`STEP`] toward it and, if the value moved,
//! writes it to the output driver. Large or frequent setpoint jumps
//! therefore never move the needle faster than one unit per tick, and a
//! setpoint change mid-ramp simply redirects the next step.
//!
//! ```text
//!   SetpointRegister ──read──▶ step() ──write_duty──▶ OutputDriver
//!                                 ▲
//!                          Ticker::wait()
//! ```

use gauge_common::consts::{FULL_SCALE, PWM_MODE, STEP};
use gauge_common::output::OutputDriver;
use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::setpoint::SetpointRegister;

/// Periodic timer driving the loop.
///
/// Injected so tests can run the loop without real sleeps.
pub trait Ticker: Send {
    /// Block until the next tick boundary.
    fn wait(&mut self);
}

/// Deadline-based fixed-period ticker.
///
/// Deadlines advance by exactly one period, so the cadence does not drift
/// with the time spent inside a tick. A tick that overruns its deadline
/// resynchronises to "now" instead of bursting to catch up.
#[derive(Debug)]
pub struct IntervalTicker {
    period: Duration,
    next_deadline: Option<Instant>,
    overruns: u64,
}

impl IntervalTicker {
    /// Create a ticker with the given period.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_deadline: None,
            overruns: 0,
        }
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks that started after their deadline.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}

impl Ticker for IntervalTicker {
    fn wait(&mut self) {
        let now = Instant::now();
        let deadline = self.next_deadline.unwrap_or(now) + self.period;

        if now < deadline {
            std::thread::sleep(deadline - now);
            self.next_deadline = Some(deadline);
        } else {
            self.overruns += 1;
            if self.overruns <= 10 || self.overruns % 1000 == 0 {
                warn!(
                    "Tick overrun #{}: late by {}us (period {}us)",
                    self.overruns,
                    (now - deadline).as_micros(),
                    self.period.as_micros()
                );
            }
            self.next_deadline = Some(now);
        }
    }
}

/// Counters collected by the smoothing loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks executed
    pub ticks: u64,
    /// Successful output writes
    pub writes: u64,
    /// Output writes that returned an error
    pub failed_writes: u64,
    /// Applied steps that incremented the actual value
    pub steps_up: u64,
    /// Applied steps that decremented the actual value
    pub steps_down: u64,
}

/// What the loop hands back when it stops.
pub struct LoopOutcome {
    /// The driver, returned for shutdown by its owner.
    pub driver: Box<dyn OutputDriver>,
    /// Final counters.
    pub stats: LoopStats,
    /// Last actual value.
    pub actual: u32,
}

/// The smoothing controller loop.
pub struct SmoothingLoop<T: Ticker> {
    driver: Box<dyn OutputDriver>,
    setpoint: Arc<SetpointRegister>,
    ticker: T,
    running: Arc<AtomicBool>,
    /// Last value the driver accepted.
    actual: u32,
    stats: LoopStats,
}

impl<T: Ticker> SmoothingLoop<T> {
    /// Create a loop with the actual value at 0.
    ///
    /// The loop runs while `running` is set; clearing it stops the loop
    /// within one tick.
    pub fn new(
        driver: Box<dyn OutputDriver>,
        setpoint: Arc<SetpointRegister>,
        ticker: T,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            driver,
            setpoint,
            ticker,
            running,
            actual: 0,
            stats: LoopStats::default(),
        }
    }

    /// Value currently applied on the output.
    pub fn actual(&self) -> u32 {
        self.actual
    }

    /// Counters so far.
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// The owned output driver.
    pub fn driver(&self) -> &dyn OutputDriver {
        self.driver.as_ref()
    }

    /// Execute one tick without waiting.
    ///
    /// Returns the value written to the driver this tick, or `None` if
    /// nothing was written (no change, or the write failed). `actual` only
    /// advances when the driver accepts the write, so the output never
    /// moves by more than [`STEP`] in one tick.
    pub fn step(&mut self) -> Option<u32> {
        let desired = self.setpoint.read();
        self.stats.ticks += 1;

        let next = match self.actual.cmp(&desired) {
            CmpOrdering::Less => self.actual + STEP,
            CmpOrdering::Greater => self.actual - STEP,
            CmpOrdering::Equal => return None,
        };

        match self.driver.write_duty(next, FULL_SCALE, PWM_MODE) {
            Ok(()) => {
                if next > self.actual {
                    self.stats.steps_up += 1;
                } else {
                    self.stats.steps_down += 1;
                }
                self.actual = next;
                self.stats.writes += 1;
                debug!(actual = next, desired, "Output applied");
                Some(next)
            }
            Err(e) => {
                self.stats.failed_writes += 1;
                if self.stats.failed_writes <= 10 || self.stats.failed_writes % 1000 == 0 {
                    warn!(
                        "Output write #{} failed at value {}: {} (output held at {})",
                        self.stats.failed_writes, next, e, self.actual
                    );
                }
                None
            }
        }
    }

    /// Run until the running flag is cleared.
    pub fn run(mut self) -> LoopOutcome {
        info!(
            "Smoothing loop started (driver={}, actual={}, setpoint={})",
            self.driver.name(),
            self.actual,
            self.setpoint.read()
        );

        while self.running.load(Ordering::SeqCst) {
            self.step();
            self.ticker.wait();
        }

        info!(
            "Smoothing loop stopped after {} ticks (writes={}, failed={}, actual={})",
            self.stats.ticks, self.stats.writes, self.stats.failed_writes, self.actual
        );

        LoopOutcome {
            driver: self.driver,
            stats: self.stats,
            actual: self.actual,
        }
    }
}
