//! Response formatting
//!
//! Every reply is one ASCII line ending in `\n`:
//!
//! | reply | wire format |
//! |---|---|
//! | acknowledgement | `OK` |
//! | any failure | `ERR` |
//! | scalar | decimal value |
//! | text | the text itself |
//! | composite | comma-separated fields |
//! | channel list | `index,frequency` pairs joined by `;` |

use std::fmt;

use crate::models::{ChannelList, PhyCapabilities};
use crate::per::PerTestResult;
use crate::settings::Settings;

/// Reply to a successful command without payload
pub const OK_REPLY: &[u8] = b"OK\n";

/// Reply to any failed command
pub const ERROR_REPLY: &[u8] = b"ERR\n";

/// Byte output
pub trait CharSink {
    /// Transmit one byte
    fn put_char(&mut self, byte: u8);
}

impl CharSink for Vec<u8> {
    fn put_char(&mut self, byte: u8) {
        self.push(byte);
    }
}

/// Write `bytes` to `sink` one byte at a time
pub fn send<S: CharSink + ?Sized>(sink: &mut S, bytes: &[u8]) {
    for &byte in bytes {
        sink.put_char(byte);
    }
}

/// One field of a composite reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) => write!(f, "{}", v),
            Value::Signed(v) => write!(f, "{}", v),
        }
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Unsigned(u64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Unsigned(u64::from(v))
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Unsigned(u64::from(v))
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Signed(i64::from(v))
    }
}

/// Successful command reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `OK`
    Ack,
    /// Single numeric value
    Scalar(Value),
    /// Free text (identification, PHY description)
    Text(String),
    /// Comma-separated fields in a fixed order
    Fields(Vec<Value>),
    /// `index,frequency` pairs
    Channels(Vec<(usize, u32)>),
}

impl Reply {
    /// Single numeric reply
    pub fn scalar(value: impl Into<Value>) -> Self {
        Reply::Scalar(value.into())
    }

    /// Wire bytes of this reply, terminator included
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Reply::Ack => OK_REPLY.to_vec(),
            _ => format!("{}\n", self).into_bytes(),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ack => f.write_str("OK"),
            Reply::Scalar(value) => write!(f, "{}", value),
            Reply::Text(text) => f.write_str(text),
            Reply::Fields(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
            Reply::Channels(channels) => {
                for (i, (index, frequency)) in channels.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, "{},{}", index, frequency)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&PhyCapabilities> for Reply {
    fn from(caps: &PhyCapabilities) -> Self {
        Reply::Fields(vec![
            caps.lowest_frequency.into(),
            caps.highest_frequency.into(),
            caps.channel_count.into(),
            caps.channel_bandwidth.into(),
            caps.baudrate.into(),
            caps.lowest_power.into(),
            caps.highest_power.into(),
            caps.defaults.power.into(),
            caps.minimal_packet_length.into(),
            caps.maximal_packet_length.into(),
            caps.defaults.per_packet_length.into(),
            caps.modulation_type.into(),
            caps.supported_signals.into(),
            caps.antenna_count.into(),
        ])
    }
}

impl From<&Settings> for Reply {
    fn from(settings: &Settings) -> Self {
        Reply::Fields(vec![
            settings.phy_number.into(),
            settings.channel_number.into(),
            settings.signal_type.into(),
            settings.power.into(),
            settings.antenna_number.into(),
            settings.per_total_packets.into(),
            settings.per_packet_length.into(),
        ])
    }
}

impl From<&PerTestResult> for Reply {
    fn from(result: &PerTestResult) -> Self {
        Reply::Fields(vec![
            result.test_id.into(),
            result.total_packets.into(),
            result.received_packets.into(),
        ])
    }
}

impl From<&ChannelList> for Reply {
    fn from(channels: &ChannelList) -> Self {
        Reply::Channels(channels.iter().collect())
    }
}
