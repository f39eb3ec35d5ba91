/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deployment configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! delivery:
//!   volume_scale: 0.00001      # required (or --scale on the command line)
//!   advance: automatic         # automatic | manual
//!   ack_timeout_ms: 30000      # optional; only logs while waiting
//! rationing:
//!   0: [3, 9]                  # zone → 1-indexed days without water
//!   1: [2]
//! device:
//!   kind: serial               # serial | tcp | simulated
//!   path: /dev/ttyACM0
//!   settle_ms: 2000
//! output:
//!   truncated: parametros_truncados.txt
//!   full: parametros_completo.txt
//! ```
//!
//! Every section is optional.  A missing `device` section means the serial
//! device at `/dev/ttyACM0`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::channel::SimulatedSettings;
use crate::protocol::{AdvanceMode, ProtocolOptions};
use crate::resolver::{RationingTable, VolumeScale};

const DEFAULT_SERIAL_PATH: &str = "/dev/ttyACM0";
const DEFAULT_SETTLE_MS: u64 = 2000;
const DEFAULT_ACK_DELAY_MS: u64 = 1500;
const DEFAULT_CLICK_DELAY_MS: u64 = 2000;
const DEFAULT_TRUNCATED_OUTPUT: &str = "parametros_truncados.txt";
const DEFAULT_FULL_OUTPUT: &str = "parametros_completo.txt";

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    delivery: DeliveryEntry,
    #[serde(default)]
    rationing: BTreeMap<usize, Vec<usize>>,
    #[serde(default)]
    device: DeviceEntry,
    #[serde(default)]
    output: OutputEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeliveryEntry {
    volume_scale: Option<f64>,
    #[serde(default)]
    advance: AdvanceMode,
    ack_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
enum DeviceEntry {
    Serial {
        #[serde(default = "default_serial_path")]
        path: PathBuf,
        #[serde(default = "default_settle_ms")]
        settle_ms: u64,
    },
    Tcp {
        address: String,
        #[serde(default)]
        settle_ms: u64,
    },
    Simulated {
        #[serde(default = "default_ack_delay_ms")]
        ack_delay_ms: u64,
        click_delay_ms: Option<u64>,
        stop_at_day: Option<usize>,
    },
}

impl Default for DeviceEntry {
    fn default() -> Self {
        Self::Serial {
            path: default_serial_path(),
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputEntry {
    #[serde(default = "default_truncated_output")]
    truncated: PathBuf,
    #[serde(default = "default_full_output")]
    full: PathBuf,
}

impl Default for OutputEntry {
    fn default() -> Self {
        Self {
            truncated: default_truncated_output(),
            full: default_full_output(),
        }
    }
}

fn default_serial_path() -> PathBuf {
    PathBuf::from(DEFAULT_SERIAL_PATH)
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

fn default_ack_delay_ms() -> u64 {
    DEFAULT_ACK_DELAY_MS
}

fn default_truncated_output() -> PathBuf {
    PathBuf::from(DEFAULT_TRUNCATED_OUTPUT)
}

fn default_full_output() -> PathBuf {
    PathBuf::from(DEFAULT_FULL_OUTPUT)
}

// ── Public data structures ────────────────────────────────────────────────────

/// Which device link a run talks to.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceConfig {
    /// Serial device node.  The line settings (9600 8N1) are applied outside
    /// the controller, e.g. with `stty`.
    Serial { path: PathBuf, settle: Duration },
    /// TCP endpoint: the `device-sim` tool or a serial-to-network bridge.
    Tcp { address: String, settle: Duration },
    /// In-process simulated device.
    Simulated(SimulatedSettings),
}

impl DeviceConfig {
    /// Simulated device with the stock delays.  In manual mode the device
    /// also clicks, otherwise a run could never start.
    pub fn simulated(advance: AdvanceMode) -> Self {
        Self::Simulated(SimulatedSettings {
            ack_delay: Duration::from_millis(DEFAULT_ACK_DELAY_MS),
            click_delay: click_delay_for(advance, None),
            stop_at_day: None,
        })
    }
}

fn click_delay_for(advance: AdvanceMode, configured_ms: Option<u64>) -> Option<Duration> {
    match (configured_ms, advance) {
        (Some(ms), _) => Some(Duration::from_millis(ms)),
        (None, AdvanceMode::Manual) => Some(Duration::from_millis(DEFAULT_CLICK_DELAY_MS)),
        (None, AdvanceMode::Automatic) => None,
    }
}

/// Where the exported parameter files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub truncated: PathBuf,
    pub full: PathBuf,
}

/// Everything a delivery run needs besides the parameter file.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentConfig {
    /// Factor from summed consumption to device volume.  Required before a
    /// run, but may come from the command line instead of the file.
    pub volume_scale: Option<f64>,
    pub advance: AdvanceMode,
    pub ack_timeout: Option<Duration>,
    pub rationing: RationingTable,
    pub device: DeviceConfig,
    pub output: OutputPaths,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl DeploymentConfig {
    /// Parse and validate the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is invalid or
    /// a value is out of range (rationing day 0, non-positive scale).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading deployment configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };

        if let Some(scale) = file.delivery.volume_scale {
            VolumeScale::new(scale).context("delivery.volume_scale")?;
        }
        if file.delivery.ack_timeout_ms == Some(0) {
            bail!("delivery.ack_timeout_ms must be positive");
        }
        for (zone, days) in &file.rationing {
            if days.contains(&0) {
                bail!("rationing for zone {zone} lists day 0; days are numbered from 1");
            }
        }

        let config = Self::from_file(file);
        debug!(
            volume_scale = ?config.volume_scale,
            advance = ?config.advance,
            ack_timeout = ?config.ack_timeout,
            rationed_entries = config.rationing.entries().count(),
            device = ?config.device,
            "deployment configuration"
        );
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Self {
        let advance = file.delivery.advance;
        let device = match file.device {
            DeviceEntry::Serial { path, settle_ms } => DeviceConfig::Serial {
                path,
                settle: Duration::from_millis(settle_ms),
            },
            DeviceEntry::Tcp { address, settle_ms } => DeviceConfig::Tcp {
                address,
                settle: Duration::from_millis(settle_ms),
            },
            DeviceEntry::Simulated {
                ack_delay_ms,
                click_delay_ms,
                stop_at_day,
            } => DeviceConfig::Simulated(SimulatedSettings {
                ack_delay: Duration::from_millis(ack_delay_ms),
                click_delay: click_delay_for(advance, click_delay_ms),
                stop_at_day,
            }),
        };

        Self {
            volume_scale: file.delivery.volume_scale,
            advance,
            ack_timeout: file.delivery.ack_timeout_ms.map(Duration::from_millis),
            rationing: RationingTable::from(file.rationing),
            device,
            output: OutputPaths {
                truncated: file.output.truncated,
                full: file.output.full,
            },
        }
    }

    /// Effective volume scale: `override_scale` wins over the file.
    ///
    /// # Errors
    /// Returns an error if neither source provides a factor, or the factor
    /// is not a positive finite number.
    pub fn volume_scale(&self, override_scale: Option<f64>) -> Result<VolumeScale> {
        let Some(factor) = override_scale.or(self.volume_scale) else {
            bail!("no volume scale configured: set delivery.volume_scale or pass --scale");
        };
        Ok(VolumeScale::new(factor)?)
    }

    pub fn protocol_options(&self) -> ProtocolOptions {
        ProtocolOptions {
            advance: self.advance,
            ack_timeout: self.ack_timeout,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_full_example() {
        let yaml = r#"
delivery:
  volume_scale: 0.00001
  advance: manual
  ack_timeout_ms: 30000
rationing:
  0: [3, 9]
  1: [2]
device:
  kind: serial
  path: /dev/ttyUSB1
  settle_ms: 500
output:
  truncated: out/trunc.txt
  full: out/full.txt
"#;
        let f = yaml_tempfile(yaml);
        let cfg = DeploymentConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.volume_scale, Some(0.00001));
        assert_eq!(cfg.advance, AdvanceMode::Manual);
        assert_eq!(cfg.ack_timeout, Some(Duration::from_secs(30)));
        assert!(cfg.rationing.is_rationed(0, 9));
        assert!(cfg.rationing.is_rationed(1, 2));
        assert!(!cfg.rationing.is_rationed(1, 3));
        assert_eq!(
            cfg.device,
            DeviceConfig::Serial {
                path: PathBuf::from("/dev/ttyUSB1"),
                settle: Duration::from_millis(500),
            }
        );
        assert_eq!(cfg.output.full, PathBuf::from("out/full.txt"));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = DeploymentConfig::from_yaml_str("").unwrap();
        assert_eq!(cfg, DeploymentConfig::default());
        assert_eq!(cfg.volume_scale, None);
        assert_eq!(cfg.advance, AdvanceMode::Automatic);
        assert!(cfg.rationing.is_empty());
        assert_eq!(
            cfg.device,
            DeviceConfig::Serial {
                path: PathBuf::from("/dev/ttyACM0"),
                settle: Duration::from_millis(2000),
            }
        );
        assert_eq!(cfg.output.truncated, PathBuf::from("parametros_truncados.txt"));
        assert_eq!(cfg.output.full, PathBuf::from("parametros_completo.txt"));
    }

    #[test]
    fn tcp_device() {
        let cfg = DeploymentConfig::from_yaml_str(
            "device:\n  kind: tcp\n  address: 127.0.0.1:7000\n",
        )
        .unwrap();
        assert_eq!(
            cfg.device,
            DeviceConfig::Tcp {
                address: "127.0.0.1:7000".into(),
                settle: Duration::ZERO,
            }
        );
    }

    #[test]
    fn simulated_device_in_manual_mode_gets_a_click_delay() {
        let cfg = DeploymentConfig::from_yaml_str(
            "delivery:\n  advance: manual\ndevice:\n  kind: simulated\n  stop_at_day: 4\n",
        )
        .unwrap();
        assert_eq!(
            cfg.device,
            DeviceConfig::Simulated(SimulatedSettings {
                ack_delay: Duration::from_millis(1500),
                click_delay: Some(Duration::from_millis(2000)),
                stop_at_day: Some(4),
            })
        );
    }

    #[test]
    fn forced_simulation_follows_advance_mode() {
        assert_eq!(
            DeviceConfig::simulated(AdvanceMode::Automatic),
            DeviceConfig::Simulated(SimulatedSettings {
                ack_delay: Duration::from_millis(1500),
                click_delay: None,
                stop_at_day: None,
            })
        );
        let DeviceConfig::Simulated(manual) = DeviceConfig::simulated(AdvanceMode::Manual) else {
            panic!("expected a simulated device");
        };
        assert!(manual.click_delay.is_some());
    }

    #[test]
    fn rationing_day_zero_is_rejected() {
        let err = DeploymentConfig::from_yaml_str("rationing:\n  0: [0, 2]\n").unwrap_err();
        assert!(format!("{err:#}").contains("day 0"));
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        assert!(DeploymentConfig::from_yaml_str("delivery:\n  volume_scale: 0\n").is_err());
        assert!(DeploymentConfig::from_yaml_str("delivery:\n  volume_scale: -1.0\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(DeploymentConfig::from_yaml_str("delivery:\n  scale: 1.0\n").is_err());
        assert!(DeploymentConfig::from_yaml_str("device:\n  kind: bluetooth\n").is_err());
    }

    #[test]
    fn volume_scale_override_wins() {
        let cfg = DeploymentConfig::from_yaml_str("delivery:\n  volume_scale: 0.00001\n").unwrap();
        assert_eq!(cfg.volume_scale(None).unwrap().factor(), 0.00001);
        assert_eq!(cfg.volume_scale(Some(0.000001)).unwrap().factor(), 0.000001);
    }

    #[test]
    fn missing_volume_scale_is_an_error() {
        let cfg = DeploymentConfig::default();
        let err = cfg.volume_scale(None).unwrap_err();
        assert!(err.to_string().contains("volume scale"));
    }

    #[test]
    fn missing_file_returns_error() {
        assert!(DeploymentConfig::load_from_file(Path::new("/nonexistent/aquasmart.yaml")).is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(DeploymentConfig::load_from_file(f.path()).is_err());
    }
}
