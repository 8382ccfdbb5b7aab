//! Settings store and state machine
//!
//! The [`Settings`] record is the single live configuration of the
//! instrument. It is only ever written through [`SettingsMachine`], which
//! validates every change against the capabilities of the selected PHY.
//!
//! Each setter takes an optional value. An explicit value must lie in the
//! field's range; an absent value means "use the PHY default", which is
//! applied only if the default is itself in range. A rejected change leaves
//! the record untouched.

use std::fmt;

use tracing::debug;

use crate::error::{LookupError, SettingsError};
use crate::models::{DeviceDescriptor, PhyCapabilities};

/// Settable fields of the settings record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SettingField {
    /// Selected PHY
    Phy,
    /// Channel index
    Channel,
    /// Signal type
    Signal,
    /// Transmit power
    Power,
    /// Antenna number
    Antenna,
    /// Number of packets in a PER test
    PerTotalPackets,
    /// PER test packet length
    PerPacketLength,
}

impl SettingField {
    /// Returns a human-readable name for the field
    pub fn name(&self) -> &'static str {
        match self {
            SettingField::Phy => "PHY",
            SettingField::Channel => "channel",
            SettingField::Signal => "signal",
            SettingField::Power => "power",
            SettingField::Antenna => "antenna",
            SettingField::PerTotalPackets => "PER total packets",
            SettingField::PerPacketLength => "PER packet length",
        }
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Live instrument configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    /// Selected PHY
    pub phy_number: u8,
    /// Selected channel
    pub channel_number: u16,
    /// Selected signal type
    pub signal_type: u8,
    /// Transmit power
    pub power: i8,
    /// Selected antenna
    pub antenna_number: u8,
    /// Packets sent in a PER test
    pub per_total_packets: u16,
    /// PER test packet length
    pub per_packet_length: u16,
}

impl Settings {
    /// Settings for `phy` with every field at the best-effort PHY default
    ///
    /// Defaults outside their valid range leave the field at zero, except the
    /// PER packet count which has no upper bound and is always taken.
    fn for_phy(phy_number: u8, caps: &PhyCapabilities) -> Self {
        let defaults = caps.defaults;
        let mut settings = Settings {
            phy_number,
            per_total_packets: defaults.per_total_packets,
            ..Settings::default()
        };

        if caps.channel_valid(u32::from(defaults.channel)) {
            settings.channel_number = defaults.channel;
        }
        if caps.signal_valid(u32::from(defaults.signal)) {
            settings.signal_type = defaults.signal;
        }
        if caps.power_valid(i32::from(defaults.power)) {
            settings.power = defaults.power;
        }
        if caps.antenna_valid(u32::from(defaults.antenna)) {
            settings.antenna_number = defaults.antenna;
        }
        if caps.packet_length_valid(u32::from(defaults.per_packet_length)) {
            settings.per_packet_length = defaults.per_packet_length;
        }
        settings
    }
}

/// Owns the registry and the settings record bounded by it
#[derive(Debug, Clone)]
pub struct SettingsMachine {
    device: DeviceDescriptor,
    settings: Settings,
    /// Capabilities of `settings.phy_number`
    active: PhyCapabilities,
}

impl SettingsMachine {
    /// Create a state machine with PHY 0 selected
    pub fn new(device: DeviceDescriptor) -> Self {
        let active = *device.primary_capabilities();
        Self {
            settings: Settings::for_phy(0, &active),
            device,
            active,
        }
    }

    /// The capability registry
    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Capabilities of the selected PHY
    pub fn active_capabilities(&self) -> &PhyCapabilities {
        &self.active
    }

    /// Select a PHY and reset every field to its defaults
    pub fn select_phy(&mut self, phy: u32) -> Result<(), SettingsError> {
        let caps = *self.device.capabilities(phy)?;
        let phy_number = u8::try_from(phy).map_err(|_| LookupError::PhyOutOfRange {
            phy,
            count: self.device.phy_count(),
        })?;

        self.settings = Settings::for_phy(phy_number, &caps);
        self.active = caps;
        debug!("Selected PHY {}: {:?}", phy, self.settings);
        Ok(())
    }

    /// Select a channel, or the PHY default channel when `value` is `None`
    pub fn set_channel(&mut self, value: Option<u32>) -> Result<u16, SettingsError> {
        let caps = self.active;
        let channel = resolve(
            SettingField::Channel,
            value,
            caps.defaults.channel,
            |v| caps.channel_valid(v),
        )?;
        self.settings.channel_number = channel;
        debug!("Channel set to {}", channel);
        Ok(channel)
    }

    /// Select a signal type, or the PHY default when `value` is `None`
    pub fn set_signal(&mut self, value: Option<u32>) -> Result<u8, SettingsError> {
        let caps = self.active;
        let signal = resolve(
            SettingField::Signal,
            value,
            caps.defaults.signal,
            |v| caps.signal_valid(v),
        )?;
        self.settings.signal_type = signal;
        debug!("Signal type set to {}", signal);
        Ok(signal)
    }

    /// Set transmit power, or the PHY default when `value` is `None`
    pub fn set_power(&mut self, value: Option<i32>) -> Result<i8, SettingsError> {
        let caps = self.active;
        let power = resolve(
            SettingField::Power,
            value,
            caps.defaults.power,
            |v| caps.power_valid(v),
        )?;
        self.settings.power = power;
        debug!("Power set to {}", power);
        Ok(power)
    }

    /// Select an antenna, or the PHY default when `value` is `None`
    pub fn set_antenna(&mut self, value: Option<u32>) -> Result<u8, SettingsError> {
        let caps = self.active;
        let antenna = resolve(
            SettingField::Antenna,
            value,
            caps.defaults.antenna,
            |v| caps.antenna_valid(v),
        )?;
        self.settings.antenna_number = antenna;
        debug!("Antenna set to {}", antenna);
        Ok(antenna)
    }

    /// Set the PER packet count; never fails
    pub fn set_per_total_packets(&mut self, value: Option<u16>) -> u16 {
        let packets = value.unwrap_or(self.active.defaults.per_total_packets);
        self.settings.per_total_packets = packets;
        debug!("PER total packets set to {}", packets);
        packets
    }

    /// Set the PER packet length, or the PHY default when `value` is `None`
    pub fn set_per_packet_length(&mut self, value: Option<u32>) -> Result<u16, SettingsError> {
        let caps = self.active;
        let length = resolve(
            SettingField::PerPacketLength,
            value,
            caps.defaults.per_packet_length,
            |v| caps.packet_length_valid(v),
        )?;
        self.settings.per_packet_length = length;
        debug!("PER packet length set to {}", length);
        Ok(length)
    }
}

/// Pick the explicit value or the default, validated against `valid`
///
/// The returned value always passed `valid`, and every valid value fits the
/// field type because the ranges are expressed in that type.
fn resolve<W, T>(
    field: SettingField,
    value: Option<W>,
    default: T,
    valid: impl Fn(W) -> bool,
) -> Result<T, SettingsError>
where
    W: Copy + Into<i64> + TryInto<T>,
    T: Copy + Into<W>,
{
    match value {
        Some(v) => {
            let out_of_range = SettingsError::OutOfRange {
                field,
                value: v.into(),
            };
            if !valid(v) {
                return Err(out_of_range);
            }
            v.try_into().map_err(|_| out_of_range)
        }
        None if valid(default.into()) => Ok(default),
        None => Err(SettingsError::NoDefault { field }),
    }
}
