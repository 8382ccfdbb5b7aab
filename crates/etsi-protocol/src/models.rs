//! Capability registry
//!
//! Immutable per-PHY tables describing what the instrument supports:
//! frequency plan, power and packet length ranges, channel lists and the
//! default values applied when a PHY is selected.

use crate::error::{DescriptorError, LookupError};

/// Values applied to the settings record when a PHY is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhyDefaults {
    /// Default channel index
    pub channel: u16,
    /// Default signal type code
    pub signal: u8,
    /// Default transmit power
    pub power: i8,
    /// Default antenna number
    pub antenna: u8,
    /// Default number of packets in a PER test
    pub per_total_packets: u16,
    /// Default PER test packet length
    pub per_packet_length: u16,
}

/// Physical layer capabilities of one PHY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhyCapabilities {
    /// Lowest supported frequency in Hz
    pub lowest_frequency: u32,
    /// Highest supported frequency in Hz
    pub highest_frequency: u32,
    /// Number of discrete channels, indexed from 0
    pub channel_count: u16,
    /// Channel bandwidth in Hz
    pub channel_bandwidth: u32,
    /// Symbol rate
    pub baudrate: u32,
    /// Lowest transmit power
    pub lowest_power: i8,
    /// Highest transmit power
    pub highest_power: i8,
    /// Shortest PER test packet
    pub minimal_packet_length: u16,
    /// Longest PER test packet
    pub maximal_packet_length: u16,
    /// Modulation code (device specific)
    pub modulation_type: u8,
    /// Highest accepted signal type code (inclusive)
    pub supported_signals: u8,
    /// Highest accepted antenna number (inclusive)
    pub antenna_count: u8,
    /// Values applied on PHY selection
    pub defaults: PhyDefaults,
}

impl PhyCapabilities {
    /// Channel index is addressable on this PHY
    pub fn channel_valid(&self, channel: u32) -> bool {
        channel < u32::from(self.channel_count)
    }

    /// Signal type is accepted (inclusive of `supported_signals`)
    pub fn signal_valid(&self, signal: u32) -> bool {
        signal <= u32::from(self.supported_signals)
    }

    /// Power lies within `[lowest_power, highest_power]`
    pub fn power_valid(&self, power: i32) -> bool {
        i32::from(self.lowest_power) <= power && power <= i32::from(self.highest_power)
    }

    /// Antenna number is accepted (inclusive of `antenna_count`)
    pub fn antenna_valid(&self, antenna: u32) -> bool {
        antenna <= u32::from(self.antenna_count)
    }

    /// Packet length lies within the PHY's packet length range
    pub fn packet_length_valid(&self, length: u32) -> bool {
        u32::from(self.minimal_packet_length) <= length
            && length <= u32::from(self.maximal_packet_length)
    }

    fn check(&self, phy: usize) -> Result<(), DescriptorError> {
        if self.channel_count == 0 {
            return Err(DescriptorError::NoChannels { phy });
        }
        if self.lowest_frequency > self.highest_frequency {
            return Err(DescriptorError::InvertedRange {
                phy,
                range: "frequency",
            });
        }
        if self.lowest_power > self.highest_power {
            return Err(DescriptorError::InvertedRange { phy, range: "power" });
        }
        if self.minimal_packet_length > self.maximal_packet_length {
            return Err(DescriptorError::InvertedRange {
                phy,
                range: "packet length",
            });
        }
        Ok(())
    }
}

/// Channel centre frequencies of one PHY, indexed from 0
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ChannelList(Vec<u32>);

impl ChannelList {
    /// Create a channel list from frequencies in Hz
    pub fn new(frequencies: Vec<u32>) -> Self {
        Self(frequencies)
    }

    /// Frequency of a channel, if it exists
    pub fn get(&self, channel: usize) -> Option<u32> {
        self.0.get(channel).copied()
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(index, frequency)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.0.iter().copied().enumerate()
    }
}

impl From<Vec<u32>> for ChannelList {
    fn from(frequencies: Vec<u32>) -> Self {
        Self(frequencies)
    }
}

/// Everything the registry knows about one PHY
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhyEntry {
    /// Human readable description, e.g. "SUN-PHY-FSK 50kbps"
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
    /// Capability ranges and defaults
    pub capabilities: PhyCapabilities,
    /// Channel frequencies
    pub channels: ChannelList,
}

/// Immutable description of the instrument, indexed by PHY number
///
/// Built once at startup. Construction checks the capability invariants, so
/// every lookup afterwards can rely on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    idn: String,
    phys: Vec<PhyEntry>,
}

impl DeviceDescriptor {
    /// Validate and build a descriptor
    pub fn new(idn: impl Into<String>, phys: Vec<PhyEntry>) -> Result<Self, DescriptorError> {
        if phys.is_empty() {
            return Err(DescriptorError::NoPhys);
        }
        if phys.len() > usize::from(u8::MAX) {
            return Err(DescriptorError::TooManyPhys(phys.len()));
        }

        for (phy, entry) in phys.iter().enumerate() {
            entry.capabilities.check(phy)?;
            let expected = usize::from(entry.capabilities.channel_count);
            if entry.channels.len() != expected {
                return Err(DescriptorError::ChannelListLength {
                    phy,
                    expected,
                    actual: entry.channels.len(),
                });
            }
        }

        Ok(Self {
            idn: idn.into(),
            phys,
        })
    }

    /// Identification string reported by `*IDN?`
    pub fn idn(&self) -> &str {
        &self.idn
    }

    /// Number of PHYs
    pub fn phy_count(&self) -> usize {
        self.phys.len()
    }

    /// Registry entry of a PHY
    pub fn phy(&self, phy: u32) -> Result<&PhyEntry, LookupError> {
        usize::try_from(phy)
            .ok()
            .and_then(|index| self.phys.get(index))
            .ok_or(LookupError::PhyOutOfRange {
                phy,
                count: self.phys.len(),
            })
    }

    /// Capabilities of PHY 0, which every descriptor has
    pub fn primary_capabilities(&self) -> &PhyCapabilities {
        &self.phys[0].capabilities
    }

    /// Capabilities of a PHY
    pub fn capabilities(&self, phy: u32) -> Result<&PhyCapabilities, LookupError> {
        self.phy(phy).map(|entry| &entry.capabilities)
    }

    /// Description of a PHY
    pub fn description(&self, phy: u32) -> Result<&str, LookupError> {
        self.phy(phy)?
            .description
            .as_deref()
            .ok_or(LookupError::MissingDescription(phy))
    }

    /// Number of channels of a PHY
    pub fn channel_count(&self, phy: u32) -> Result<u16, LookupError> {
        self.capabilities(phy).map(|caps| caps.channel_count)
    }

    /// Channel list of a PHY
    pub fn channels(&self, phy: u32) -> Result<&ChannelList, LookupError> {
        self.phy(phy).map(|entry| &entry.channels)
    }

    /// Frequency of `channel` on `phy`
    pub fn channel_frequency(&self, phy: u32, channel: u32) -> Result<u32, LookupError> {
        let entry = self.phy(phy)?;
        let out_of_range = LookupError::ChannelOutOfRange {
            phy,
            channel,
            count: entry.capabilities.channel_count,
        };
        if !entry.capabilities.channel_valid(channel) {
            return Err(out_of_range);
        }
        usize::try_from(channel)
            .ok()
            .and_then(|index| entry.channels.get(index))
            .ok_or(out_of_range)
    }

    /// Iterate over all PHY entries in PHY order
    pub fn phys(&self) -> impl Iterator<Item = &PhyEntry> {
        self.phys.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> PhyCapabilities {
        PhyCapabilities {
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
        }
    }

    fn entry() -> PhyEntry {
        PhyEntry {
            description: Some("SUN-PHY-FSK 50kbps".into()),
            capabilities: caps(),
            channels: vec![868_050_000, 868_150_000, 868_250_000].into(),
        }
    }

    #[test]
    fn test_build_descriptor() {
        let device = DeviceDescriptor::new("ACME,X1", vec![entry()]).unwrap();
        assert_eq!(device.phy_count(), 1);
        assert_eq!(device.idn(), "ACME,X1");
        assert_eq!(device.description(0).unwrap(), "SUN-PHY-FSK 50kbps");
    }

    #[test]
    fn test_rejects_empty_device() {
        assert_eq!(
            DeviceDescriptor::new("ACME", vec![]),
            Err(DescriptorError::NoPhys)
        );
    }

    #[test]
    fn test_rejects_channel_list_mismatch() {
        let mut phy = entry();
        phy.channels = vec![868_050_000].into();
        assert_eq!(
            DeviceDescriptor::new("ACME", vec![phy]),
            Err(DescriptorError::ChannelListLength {
                phy: 0,
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn test_rejects_inverted_ranges() {
        let mut phy = entry();
        phy.capabilities.lowest_power = 20;
        assert!(matches!(
            DeviceDescriptor::new("ACME", vec![phy]),
            Err(DescriptorError::InvertedRange { range: "power", .. })
        ));

        let mut phy = entry();
        phy.capabilities.minimal_packet_length = 200;
        assert!(matches!(
            DeviceDescriptor::new("ACME", vec![phy]),
            Err(DescriptorError::InvertedRange {
                range: "packet length",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_channels() {
        let mut phy = entry();
        phy.capabilities.channel_count = 0;
        phy.channels = ChannelList::default();
        assert_eq!(
            DeviceDescriptor::new("ACME", vec![phy]),
            Err(DescriptorError::NoChannels { phy: 0 })
        );
    }

    #[test]
    fn test_lookups_are_bounds_checked() {
        let device = DeviceDescriptor::new("ACME", vec![entry()]).unwrap();

        assert_eq!(device.channel_frequency(0, 2), Ok(868_250_000));
        assert_eq!(
            device.channel_frequency(0, 3),
            Err(LookupError::ChannelOutOfRange {
                phy: 0,
                channel: 3,
                count: 3
            })
        );
        assert_eq!(
            device.capabilities(1),
            Err(LookupError::PhyOutOfRange { phy: 1, count: 1 })
        );
        assert!(device.channels(u32::MAX).is_err());
    }

    #[test]
    fn test_channel_lookup_uses_requested_phy() {
        let mut second = entry();
        second.channels = vec![915_000_000, 915_200_000, 915_400_000].into();
        let device = DeviceDescriptor::new("ACME", vec![entry(), second]).unwrap();

        assert_eq!(device.channel_frequency(1, 0), Ok(915_000_000));
        assert_eq!(device.channels(1).unwrap().get(2), Some(915_400_000));
    }

    #[test]
    fn test_missing_description() {
        let mut phy = entry();
        phy.description = None;
        let device = DeviceDescriptor::new("ACME", vec![phy]).unwrap();
        assert_eq!(device.description(0), Err(LookupError::MissingDescription(0)));
    }

    #[test]
    fn test_inclusive_bounds() {
        let caps = caps();
        assert!(caps.signal_valid(3));
        assert!(!caps.signal_valid(4));
        assert!(caps.antenna_valid(2));
        assert!(!caps.antenna_valid(3));
        assert!(caps.channel_valid(2));
        assert!(!caps.channel_valid(3));
        assert!(caps.power_valid(-10));
        assert!(caps.power_valid(13));
        assert!(!caps.power_valid(14));
        assert!(!caps.power_valid(-11));
    }
}
