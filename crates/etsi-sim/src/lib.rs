//! ETSI Test Instrument Simulation Library
//!
//! This crate lets the instrument core run without RF hardware:
//!
//! - **VirtualTransceiver**: a [`TestDriver`](etsi_protocol::TestDriver)
//!   that runs PER tests packet by packet with an optional loss pattern
//! - **DeviceConfig**: device descriptions loaded from JSON, plus the
//!   built-in RM-01 demo device
//!
//! # Example
//!
//! ```rust
//! use etsi_protocol::Instrument;
//! use etsi_sim::{DeviceConfig, VirtualTransceiver};
//!
//! let device = DeviceConfig::demo().into_descriptor().unwrap();
//! let mut instrument = Instrument::new(device, VirtualTransceiver::new()).unwrap();
//!
//! instrument.execute("PER 1").unwrap();
//! instrument.driver_mut().run_to_completion();
//! let result = instrument.execute("PERRESULT?").unwrap();
//! assert_eq!(result.to_string(), "1,15,15");
//! ```

pub mod device;
pub mod transceiver;

pub use device::{DeviceConfig, DeviceConfigError};
pub use transceiver::{VirtualTransceiver, VirtualTransceiverConfig};
