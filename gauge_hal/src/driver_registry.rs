//! Output driver catalogue.
//!
//! Maps the names accepted by `--driver` / `output.driver` to factories,
//! and opens a ready-to-use channel from a name plus the `[output]`
//! section. Built once in `main` and handed to `GaugeCore::init`.

use gauge_common::output::{DriverFactory, GaugeError, OutputConfig, OutputDriver};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One selectable output driver.
#[derive(Clone, Copy)]
struct DriverEntry {
    summary: &'static str,
    factory: DriverFactory,
}

/// Catalogue of selectable output drivers, keyed by name.
#[derive(Default)]
pub struct DriverRegistry {
    entries: BTreeMap<&'static str, DriverEntry>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under `name` with a one-line summary.
    ///
    /// # Panics
    /// Panics on a duplicate name: two drivers answering to the same
    /// `--driver` value is a programming error.
    pub fn register(&mut self, name: &'static str, summary: &'static str, factory: DriverFactory) {
        let previous = self.entries.insert(name, DriverEntry { summary, factory });
        assert!(previous.is_none(), "Output driver '{name}' is already registered");
    }

    /// Whether `name` is a known driver.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// `(name, summary)` pairs in alphabetical order, for `--list-drivers`.
    pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
        self.entries
            .iter()
            .map(|(name, entry)| (*name, entry.summary))
            .collect()
    }

    /// Create the driver called `name` and initialize it with `config`.
    ///
    /// # Errors
    /// `GaugeError::DriverNotFound` (listing the known names) for an
    /// unknown driver; the driver's own error if `init` fails.
    pub fn open(&self, name: &str, config: &OutputConfig) -> Result<Box<dyn OutputDriver>, GaugeError> {
        let entry = self.entries.get(name).ok_or_else(|| {
            GaugeError::DriverNotFound(format!(
                "'{name}' (available: {})",
                self.names().join(", ")
            ))
        })?;

        let mut driver = (entry.factory)();
        if let Err(e) = driver.init(config) {
            warn!("Output driver '{}' failed to initialize: {}", name, e);
            return Err(e);
        }
        info!(
            "Opened output driver '{}' v{} ({} Hz)",
            driver.name(),
            driver.version(),
            config.frequency_hz
        );
        Ok(driver)
    }
}
