//! Error types for the instrument command core
//!
//! Every error collapses to `ERR\n` on the wire; the typed variants exist so
//! callers and tests can tell the causes apart.

use thiserror::Error;

use crate::settings::SettingField;

/// Errors building a [`DeviceDescriptor`](crate::DeviceDescriptor)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Device declares no PHYs
    #[error("device declares no PHYs")]
    NoPhys,

    /// More PHYs than a PHY number can address
    #[error("too many PHYs: {0} (at most 255)")]
    TooManyPhys(usize),

    /// PHY declares zero channels
    #[error("PHY {phy}: channel count must be greater than zero")]
    NoChannels { phy: usize },

    /// A lower bound is above its upper bound
    #[error("PHY {phy}: inverted {range} range")]
    InvertedRange { phy: usize, range: &'static str },

    /// Channel list length differs from the declared channel count
    #[error("PHY {phy}: channel list has {actual} entries, capabilities declare {expected}")]
    ChannelListLength {
        phy: usize,
        expected: usize,
        actual: usize,
    },
}

/// Registry lookups outside the declared tables
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// PHY index at or above the PHY count
    #[error("PHY {phy} out of range (device has {count})")]
    PhyOutOfRange { phy: u32, count: usize },

    /// Channel index at or above the PHY's channel count
    #[error("channel {channel} out of range for PHY {phy} ({count} channels)")]
    ChannelOutOfRange { phy: u32, channel: u32, count: u16 },

    /// PHY has no description text
    #[error("PHY {0} has no description")]
    MissingDescription(u32),
}

/// Settings changes rejected by the state machine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// PHY selection failed
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Explicit value outside the field's range for the selected PHY
    #[error("{field} value {value} out of range")]
    OutOfRange { field: SettingField, value: i64 },

    /// No value supplied and the PHY default is itself out of range
    #[error("no applicable default for {field}")]
    NoDefault { field: SettingField },
}

/// Errors resolving a command line against the command table
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line holds no command header
    #[error("empty command line")]
    Empty,

    /// Header is not valid ASCII or is structurally malformed
    #[error("invalid command header: {0}")]
    InvalidHeader(String),

    /// No registered pattern matches the header
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Parameter present but not a number of the expected type
    #[error("invalid parameter {index}: {value:?}")]
    InvalidParameter { index: usize, value: String },

    /// Mandatory parameter absent
    #[error("missing parameter {0}")]
    MissingParameter(usize),

    /// Pattern text could not be compiled
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },
}

/// PER test and transceiver control failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TestError {
    /// A PER test is already in progress
    #[error("a PER test is already running")]
    AlreadyRunning,

    /// Driver refused the request
    #[error("driver rejected request: {0}")]
    Rejected(String),

    /// Driver has no result structure
    #[error("no PER test result available")]
    NoResult,

    /// TRX mode code other than 0, 1 or 2
    #[error("invalid TRX mode: {0}")]
    InvalidTrxMode(u32),
}

/// Input framing failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Line filled the buffer without a terminator
    #[error("command line exceeds {capacity} bytes")]
    Overflow { capacity: usize },
}

/// Anything a command handler can fail with
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Registry lookup error
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Settings error
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Test control error
    #[error("test error: {0}")]
    Test(#[from] TestError),
}
