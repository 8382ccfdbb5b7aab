//! ETSI Test Protocol Library
//!
//! This crate implements the command core of a radio test instrument used
//! for ETSI conformance measurements. An operator talks to it over a
//! line-oriented ASCII protocol to:
//!
//! - **Query capabilities**: frequency plan, power range, packet lengths and
//!   channel lists of every PHY the device supports
//! - **Configure**: select a PHY, channel, signal type, power, antenna and
//!   Packet Error Rate (PER) test parameters
//! - **Run PER tests**: switch the transceiver mode, start a test and read
//!   its result
//!
//! # Architecture
//!
//! - [`models`]: the immutable capability registry ([`DeviceDescriptor`])
//! - [`settings`]: the live configuration and the state machine guarding it
//! - [`framer`]: reassembles lines from a byte stream ([`CharSource`])
//! - [`pattern`] and [`command`]: compile command patterns and resolve lines
//! - [`response`]: renders replies to a byte sink ([`CharSink`])
//! - [`per`]: PER test facade over the radio driver ([`TestDriver`])
//! - [`instrument`]: ties all of the above into one command loop
//!
//! Commands use hierarchical keywords with optional numeric suffixes:
//! `PHY1:CAP:FREQL?` asks for the lowest frequency of PHY 1, `SET:POW -5`
//! sets the transmit power. Every reply is one line; every failure is `ERR`.
//!
//! # Example
//!
//! ```rust
//! use etsi_protocol::{
//!     ChannelList, DeviceDescriptor, Instrument, PerTestResult, PhyCapabilities, PhyDefaults,
//!     PhyEntry, Settings, TestDriver, TestError, TrxMode,
//! };
//!
//! struct NullRadio;
//!
//! impl TestDriver for NullRadio {
//!     fn reset(&mut self) {}
//!     fn set_trx_mode(&mut self, _: &Settings, _: TrxMode) -> Result<(), TestError> {
//!         Ok(())
//!     }
//!     fn start_per_test(&mut self, _: &Settings, _: u32) -> Result<(), TestError> {
//!         Err(TestError::Rejected("no radio".into()))
//!     }
//!     fn is_per_test_running(&self) -> bool {
//!         false
//!     }
//!     fn per_test_result(&self) -> Option<PerTestResult> {
//!         None
//!     }
//! }
//!
//! let phy = PhyEntry {
//!     description: Some("SUN-PHY-FSK 50kbps".into()),
//!     capabilities: PhyCapabilities {
//!         lowest_frequency: 868_000_000,
//!         highest_frequency: 868_300_000,
//!         channel_count: 3,
//!         channel_bandwidth: 100_000,
//!         baudrate: 50_000,
//!         lowest_power: -10,
//!         highest_power: 13,
//!         minimal_packet_length: 12,
//!         maximal_packet_length: 100,
//!         modulation_type: 1,
//!         supported_signals: 3,
//!         antenna_count: 2,
//!         defaults: PhyDefaults {
//!             channel: 1,
//!             ..PhyDefaults::default()
//!         },
//!     },
//!     channels: ChannelList::new(vec![868_050_000, 868_150_000, 868_250_000]),
//! };
//! let device = DeviceDescriptor::new("ACME,T1,0001,1.0", vec![phy]).unwrap();
//! let mut instrument = Instrument::new(device, NullRadio).unwrap();
//!
//! let reply = instrument.execute("SETtings:CHANnel?").unwrap();
//! assert_eq!(reply.encode(), b"1\n");
//! assert!(instrument.execute("SETtings:POWer 50").is_err());
//! ```

pub mod command;
pub mod error;
pub mod framer;
pub mod instrument;
pub mod models;
pub mod pattern;
pub mod per;
pub mod response;
pub mod settings;

pub use command::{CommandId, CommandTable, ParsedCommand, STANDARD_COMMANDS};
pub use error::{
    CommandError, DescriptorError, FrameError, LookupError, ParseError, SettingsError, TestError,
};
pub use framer::{CharSource, LineFramer};
pub use instrument::{Instrument, InstrumentConfig, Processed};
pub use models::{ChannelList, DeviceDescriptor, PhyCapabilities, PhyDefaults, PhyEntry};
pub use per::{PerTestControl, PerTestResult, TestDriver, TrxMode};
pub use response::{CharSink, Reply, Value};
pub use settings::{SettingField, Settings, SettingsMachine};
