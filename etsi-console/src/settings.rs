//! Console settings

use std::path::PathBuf;

use anyhow::Context;
use etsi_protocol::InstrumentConfig;
use etsi_sim::VirtualTransceiverConfig;
use serde::{Deserialize, Serialize};

use crate::Args;

/// Saved console configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Device description file; the RM-01 demo device when absent
    pub device_file: Option<PathBuf>,
    /// Serial port to serve; stdin/stdout when absent
    pub port: Option<String>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Interval between simulated PER packets
    pub packet_interval_ms: u64,
    /// Simulated radio behaviour
    pub transceiver: VirtualTransceiverConfig,
    /// Framing options
    pub instrument: InstrumentConfig,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            device_file: None,
            port: None,
            baud_rate: 115_200,
            packet_interval_ms: 10,
            transceiver: VirtualTransceiverConfig::default(),
            instrument: InstrumentConfig::default(),
        }
    }
}

impl ConsoleSettings {
    /// Get the XDG config directory for etsi-test
    /// Uses $XDG_CONFIG_HOME/etsi-test, falls back to ~/.config/etsi-test
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("etsi-test"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("etsi-test"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::settings_path().context("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(&path, json).context("Failed to write settings")?;

        Ok(path)
    }

    /// Override saved values with command-line flags
    pub fn apply(&mut self, args: &Args) {
        if let Some(device) = &args.device {
            self.device_file = Some(device.clone());
        }
        if let Some(port) = &args.port {
            self.port = Some(port.clone());
        }
        if let Some(baud) = args.baud {
            self.baud_rate = baud;
        }
        if let Some(interval) = args.packet_interval_ms {
            self.packet_interval_ms = interval;
        }
        if let Some(loss_every) = args.loss_every {
            self.transceiver.loss_every = Some(loss_every);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "etsi-test",
            "--port",
            "/dev/ttyUSB0",
            "--baud",
            "9600",
            "--loss-every",
            "10",
        ]);
        let mut settings = ConsoleSettings::default();
        settings.apply(&args);

        assert_eq!(settings.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.transceiver.loss_every, Some(10));
        assert_eq!(settings.packet_interval_ms, 10);
        assert_eq!(settings.device_file, None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: ConsoleSettings =
            serde_json::from_str(r#"{"baud_rate": 57600, "instrument": {"line_capacity": 128}}"#)
                .unwrap();
        assert_eq!(settings.baud_rate, 57600);
        assert_eq!(settings.instrument.line_capacity, 128);
        assert_eq!(settings.instrument.terminator, b'\n');
        assert!(settings.instrument.report_overflow);
        assert_eq!(settings.packet_interval_ms, 10);
    }
}
