//! Linux sysfs PWM driver implementation.
//!
//! Drives one channel of `/sys/class/pwm/pwmchipN` through the kernel's
//! sysfs interface:
//!
//! | File          | Written with                         |
//! |---------------|--------------------------------------|
//! | `export`      | channel index (if not yet exported)  |
//! | `period`      | `1e9 / frequency_hz` (ns)            |
//! | `duty_cycle`  | `period * value / full_scale` (ns)   |
//! | `enable`      | `1` on init, `0` on shutdown         |
//!
//! The kernel interface has no balanced / mark-space selector; the mode
//! argument is accepted and ignored.

use gauge_common::output::{DriverDiagnostics, GaugeError, OutputConfig, OutputDriver, PwmMode};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long to wait for udev to create the channel directory after export.
const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(1);
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Channel state established by `init`.
#[derive(Debug)]
struct Channel {
    chip_dir: PathBuf,
    dir: PathBuf,
    index: u32,
    period_ns: u64,
    exported_by_us: bool,
}

/// sysfs PWM driver implementing the OutputDriver trait.
pub struct SysfsPwmDriver {
    name: &'static str,
    version: &'static str,
    export_timeout: Duration,
    channel: Option<Channel>,
    diagnostics: DriverDiagnostics,
}

impl SysfsPwmDriver {
    /// Create a new, uninitialized driver.
    pub fn new() -> Self {
        Self {
            name: "sysfs",
            version: env!("CARGO_PKG_VERSION"),
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
            channel: None,
            diagnostics: DriverDiagnostics::default(),
        }
    }

    /// Override the export wait.
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    /// PWM period in ns, once initialized.
    pub fn period_ns(&self) -> Option<u64> {
        self.channel.as_ref().map(|c| c.period_ns)
    }

    fn export(&self, chip_dir: &Path, channel_dir: &Path, index: u32) -> Result<(), GaugeError> {
        write_attr(chip_dir, "export", index).map_err(GaugeError::InitFailed)?;

        let started = Instant::now();
        while !channel_dir.is_dir() {
            if started.elapsed() >= self.export_timeout {
                return Err(GaugeError::InitFailed(format!(
                    "{} did not appear after export",
                    channel_dir.display()
                )));
            }
            std::thread::sleep(EXPORT_POLL_INTERVAL);
        }
        Ok(())
    }
}

impl Default for SysfsPwmDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDriver for SysfsPwmDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &OutputConfig) -> Result<(), GaugeError> {
        let sysfs = &config.sysfs;
        let chip_dir = sysfs.chip_dir();
        if !chip_dir.is_dir() {
            return Err(GaugeError::InitFailed(format!(
                "PWM chip not found at {}",
                chip_dir.display()
            )));
        }

        let dir = sysfs.channel_dir();
        let exported_by_us = if dir.is_dir() {
            debug!("PWM channel {} already exported", dir.display());
            false
        } else {
            info!("Exporting PWM channel {} on {}", sysfs.channel, chip_dir.display());
            self.export(&chip_dir, &dir, sysfs.channel)?;
            true
        };

        let period_ns = config.period_ns();
        // Duty first: the kernel rejects a period shorter than the current duty.
        write_attr(&dir, "duty_cycle", 0).map_err(GaugeError::InitFailed)?;
        write_attr(&dir, "period", period_ns).map_err(GaugeError::InitFailed)?;
        write_attr(&dir, "enable", 1).map_err(GaugeError::InitFailed)?;

        info!(
            "sysfs PWM channel {} enabled ({} Hz, period {} ns)",
            dir.display(),
            config.frequency_hz,
            period_ns
        );

        self.channel = Some(Channel {
            chip_dir,
            dir,
            index: sysfs.channel,
            period_ns,
            exported_by_us,
        });
        Ok(())
    }

    fn write_duty(&mut self, value: u32, full_scale: u32, _mode: PwmMode) -> Result<(), GaugeError> {
        let Some(channel) = &self.channel else {
            self.diagnostics.failed_writes += 1;
            return Err(GaugeError::NotInitialized);
        };
        if full_scale == 0 || value > full_scale {
            self.diagnostics.failed_writes += 1;
            return Err(GaugeError::WriteFailed(format!(
                "duty {value}/{full_scale} out of range"
            )));
        }

        let duty_ns = channel.period_ns * u64::from(value) / u64::from(full_scale);
        if let Err(e) = write_attr(&channel.dir, "duty_cycle", duty_ns) {
            self.diagnostics.failed_writes += 1;
            return Err(GaugeError::WriteFailed(e));
        }

        self.diagnostics.write_count += 1;
        self.diagnostics.last_value = Some(value);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), GaugeError> {
        let Some(channel) = self.channel.take() else {
            return Ok(());
        };

        let mut first_error = None;
        for (attr, value) in [("duty_cycle", 0), ("enable", 0)] {
            if let Err(e) = write_attr(&channel.dir, attr, value) {
                warn!("sysfs PWM shutdown: {}", e);
                first_error.get_or_insert(e);
            }
        }
        if channel.exported_by_us {
            if let Err(e) = write_attr(&channel.chip_dir, "unexport", channel.index) {
                warn!("sysfs PWM shutdown: {}", e);
                first_error.get_or_insert(e);
            }
        }

        info!("sysfs PWM channel {} disabled", channel.dir.display());
        match first_error {
            Some(e) => Err(GaugeError::WriteFailed(e)),
            None => Ok(()),
        }
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        Some(self.diagnostics.clone())
    }
}

/// Write a numeric sysfs attribute.
fn write_attr(dir: &Path, attr: &str, value: impl std::fmt::Display) -> Result<(), String> {
    let path = dir.join(attr);
    fs::write(&path, value.to_string())
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_common::output::SysfsConfig;
    use tempfile::TempDir;

    fn fake_sysfs(with_channel: bool) -> (TempDir, OutputConfig) {
        let root = TempDir::new().unwrap();
        let chip = root.path().join("pwmchip0");
        fs::create_dir_all(&chip).unwrap();
        if with_channel {
            fs::create_dir_all(chip.join("pwm1")).unwrap();
        }
        let config = OutputConfig {
            driver: "sysfs".to_string(),
            frequency_hz: 64_000,
            sysfs: SysfsConfig {
                root: root.path().to_path_buf(),
                chip: 0,
                channel: 1,
            },
        };
        (root, config)
    }

    fn read_attr(root: &TempDir, rel: &str) -> String {
        fs::read_to_string(root.path().join(rel)).unwrap()
    }

    #[test]
    fn test_init_configures_existing_channel() {
        let (root, config) = fake_sysfs(true);
        let mut driver = SysfsPwmDriver::new();
        driver.init(&config).unwrap();

        assert_eq!(driver.period_ns(), Some(15_625));
        assert_eq!(read_attr(&root, "pwmchip0/pwm1/period"), "15625");
        assert_eq!(read_attr(&root, "pwmchip0/pwm1/duty_cycle"), "0");
        assert_eq!(read_attr(&root, "pwmchip0/pwm1/enable"), "1");
        assert!(!root.path().join("pwmchip0/export").exists());
    }

    #[test]
    fn test_write_duty_scales_to_period() {
        let (root, config) = fake_sysfs(true);
        let mut driver = SysfsPwmDriver::new();
        driver.init(&config).unwrap();

        driver.write_duty(64, 128, PwmMode::Balanced).unwrap();
        assert_eq!(read_attr(&root, "pwmchip0/pwm1/duty_cycle"), "7812");

        driver.write_duty(128, 128, PwmMode::MarkSpace).unwrap();
        assert_eq!(read_attr(&root, "pwmchip0/pwm1/duty_cycle"), "15625");

        let diag = driver.diagnostics().unwrap();
        assert_eq!(diag.write_count, 2);
        assert_eq!(diag.last_value, Some(128));
    }

    #[test]
    fn test_write_duty_rejects_out_of_range() {
        let (_root, config) = fake_sysfs(true);
        let mut driver = SysfsPwmDriver::new();
        driver.init(&config).unwrap();

        let result = driver.write_duty(200, 128, PwmMode::Balanced);
        assert!(matches!(result, Err(GaugeError::WriteFailed(_))));
    }

    #[test]
    fn test_write_before_init_fails() {
        let mut driver = SysfsPwmDriver::new();
        assert!(matches!(
            driver.write_duty(1, 128, PwmMode::Balanced),
            Err(GaugeError::NotInitialized)
        ));
    }

    #[test]
    fn test_missing_chip_fails_init() {
        let root = TempDir::new().unwrap();
        let config = OutputConfig {
            sysfs: SysfsConfig {
                root: root.path().to_path_buf(),
                ..SysfsConfig::default()
            },
            ..OutputConfig::default()
        };
        let mut driver = SysfsPwmDriver::new();
        assert!(matches!(driver.init(&config), Err(GaugeError::InitFailed(_))));
    }

    #[test]
    fn test_export_times_out_when_channel_never_appears() {
        let (root, config) = fake_sysfs(false);
        let mut driver = SysfsPwmDriver::new().with_export_timeout(Duration::from_millis(30));

        let result = driver.init(&config);
        assert!(matches!(result, Err(GaugeError::InitFailed(ref msg)) if msg.contains("did not appear")));
        assert_eq!(read_attr(&root, "pwmchip0/export"), "1");
    }

    #[test]
    fn test_shutdown_disables_channel() {
        let (root, config) = fake_sysfs(true);
        let mut driver = SysfsPwmDriver::new();
        driver.init(&config).unwrap();
        driver.write_duty(100, 128, PwmMode::Balanced).unwrap();

        driver.shutdown().unwrap();
        assert_eq!(read_attr(&root, "pwmchip0/pwm1/duty_cycle"), "0");
        assert_eq!(read_attr(&root, "pwmchip0/pwm1/enable"), "0");
        // Not exported by us, so left exported.
        assert!(!root.path().join("pwmchip0/unexport").exists());

        // Second shutdown is a no-op.
        driver.shutdown().unwrap();
    }
}
