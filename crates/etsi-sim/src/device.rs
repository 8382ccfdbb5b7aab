//! Device descriptions
//!
//! A [`DeviceConfig`] is the serialisable form of a
//! [`DeviceDescriptor`]: the identification string and one entry per PHY.
//! It comes from a JSON file or from the built-in RM-01 demo device.

use std::path::Path;

use etsi_protocol::{
    ChannelList, DescriptorError, DeviceDescriptor, PhyCapabilities, PhyDefaults, PhyEntry,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors loading a device description
#[derive(Debug, Error)]
pub enum DeviceConfigError {
    /// File could not be read
    #[error("failed to read device file: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a valid device description
    #[error("invalid device JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Description violates the capability invariants
    #[error("invalid device description: {0}")]
    Invalid(#[from] DescriptorError),
}

/// Serialisable device description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Reply to `*IDN?`
    pub idn: String,
    /// PHY entries, PHY 0 first
    pub phys: Vec<PhyEntry>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl DeviceConfig {
    /// The RM-01 demo device: one 868 MHz SUN FSK PHY with three channels
    pub fn demo() -> Self {
        Self {
            idn: "RADIOMASTERS,RM-01,SN071284B,1.3.216".to_string(),
            phys: vec![PhyEntry {
                description: Some("SUN-PHY-FSK 50kbps".to_string()),
                capabilities: PhyCapabilities {
                    lowest_frequency: 868_000_000,
                    highest_frequency: 868_300_000,
                    channel_count: 3,
                    channel_bandwidth: 100_000,
                    baudrate: 50_000,
                    lowest_power: -10,
                    highest_power: 13,
                    minimal_packet_length: 12,
                    maximal_packet_length: 100,
                    modulation_type: 1,
                    supported_signals: 3,
                    antenna_count: 2,
                    defaults: PhyDefaults {
                        channel: 1,
                        signal: 1,
                        power: 0,
                        antenna: 0,
                        per_total_packets: 15,
                        per_packet_length: 20,
                    },
                },
                channels: ChannelList::new(vec![868_050_000, 868_150_000, 868_250_000]),
            }],
        }
    }

    /// Parse a description from JSON text
    pub fn from_json(text: &str) -> Result<Self, DeviceConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a description from a JSON file
    pub fn load(path: &Path) -> Result<Self, DeviceConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!(
            "Loaded device {:?} with {} PHY(s) from {}",
            config.idn,
            config.phys.len(),
            path.display()
        );
        Ok(config)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, DeviceConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and build the registry
    pub fn into_descriptor(self) -> Result<DeviceDescriptor, DeviceConfigError> {
        Ok(DeviceDescriptor::new(self.idn, self.phys)?)
    }
}
