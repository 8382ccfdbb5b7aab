//! Packet Error Rate test control
//!
//! The radio itself sits behind [`TestDriver`]. [`PerTestControl`] adds the
//! checks the command layer relies on: a test cannot be started twice and a
//! missing result is an error rather than a zeroed record.

use std::fmt;

use tracing::{debug, info};

use crate::error::TestError;
use crate::settings::Settings;

/// Transceiver operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrxMode {
    #[default]
    Off,
    Tx,
    Rx,
}

impl TrxMode {
    /// Wire code of the mode
    pub fn code(&self) -> u8 {
        match self {
            TrxMode::Off => 0,
            TrxMode::Tx => 1,
            TrxMode::Rx => 2,
        }
    }
}

impl TryFrom<u32> for TrxMode {
    type Error = TestError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TrxMode::Off),
            1 => Ok(TrxMode::Tx),
            2 => Ok(TrxMode::Rx),
            other => Err(TestError::InvalidTrxMode(other)),
        }
    }
}

impl fmt::Display for TrxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrxMode::Off => f.write_str("off"),
            TrxMode::Tx => f.write_str("TX"),
            TrxMode::Rx => f.write_str("RX"),
        }
    }
}

/// Outcome of the last PER test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerTestResult {
    /// Identifier supplied when the test was started
    pub test_id: u32,
    /// Packet count taken from the settings at start
    pub total_packets: u16,
    /// Packets received so far
    pub received_packets: u16,
}

/// Radio driver boundary
///
/// Implementations own the RF hardware (or a simulation of it). Calls never
/// block; a running test progresses on the driver's own schedule.
pub trait TestDriver {
    /// Return the radio to its power-on state
    fn reset(&mut self);

    /// Switch the transceiver mode using the current settings
    fn set_trx_mode(&mut self, settings: &Settings, mode: TrxMode) -> Result<(), TestError>;

    /// Begin a PER test with the current settings
    ///
    /// On success the driver's result holds `test_id`, the settings' packet
    /// count and zero received packets.
    fn start_per_test(&mut self, settings: &Settings, test_id: u32) -> Result<(), TestError>;

    /// Whether a PER test is in progress
    fn is_per_test_running(&self) -> bool;

    /// Last known result, if the driver has one
    fn per_test_result(&self) -> Option<PerTestResult>;
}

/// PER test facade over a [`TestDriver`]
#[derive(Debug, Clone)]
pub struct PerTestControl<D> {
    driver: D,
}

impl<D: TestDriver> PerTestControl<D> {
    /// Wrap a driver
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    /// Start a test unless one is already running
    pub fn start(&mut self, settings: &Settings, test_id: u32) -> Result<(), TestError> {
        if self.driver.is_per_test_running() {
            return Err(TestError::AlreadyRunning);
        }
        self.driver.start_per_test(settings, test_id)?;
        info!(
            "PER test {} started: {} packets of {} bytes",
            test_id, settings.per_total_packets, settings.per_packet_length
        );
        Ok(())
    }

    /// Whether the driver reports a test in progress
    pub fn is_running(&self) -> bool {
        self.driver.is_per_test_running()
    }

    /// Last known result
    pub fn result(&self) -> Result<PerTestResult, TestError> {
        self.driver.per_test_result().ok_or(TestError::NoResult)
    }

    /// Switch the transceiver mode
    pub fn set_trx_mode(&mut self, settings: &Settings, mode: TrxMode) -> Result<(), TestError> {
        self.driver.set_trx_mode(settings, mode)?;
        debug!("TRX mode set to {}", mode);
        Ok(())
    }

    /// Return the driver to its power-on state
    pub fn reset(&mut self) {
        self.driver.reset();
    }

    /// Underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable driver access
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Consume the facade and return the driver
    pub fn into_driver(self) -> D {
        self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockDriver {
        running: bool,
        result: Option<PerTestResult>,
        mode: TrxMode,
        refuse: bool,
        resets: usize,
    }

    impl TestDriver for MockDriver {
        fn reset(&mut self) {
            self.resets += 1;
            self.running = false;
        }

        fn set_trx_mode(&mut self, _settings: &Settings, mode: TrxMode) -> Result<(), TestError> {
            if self.refuse {
                return Err(TestError::Rejected("busy".into()));
            }
            self.mode = mode;
            Ok(())
        }

        fn start_per_test(&mut self, settings: &Settings, test_id: u32) -> Result<(), TestError> {
            if self.refuse {
                return Err(TestError::Rejected("busy".into()));
            }
            self.running = true;
            self.result = Some(PerTestResult {
                test_id,
                total_packets: settings.per_total_packets,
                received_packets: 0,
            });
            Ok(())
        }

        fn is_per_test_running(&self) -> bool {
            self.running
        }

        fn per_test_result(&self) -> Option<PerTestResult> {
            self.result
        }
    }

    fn settings() -> Settings {
        Settings {
            per_total_packets: 15,
            per_packet_length: 20,
            ..Settings::default()
        }
    }

    #[test]
    fn test_start_records_settings() {
        let mut control = PerTestControl::new(MockDriver::default());
        assert_eq!(control.result(), Err(TestError::NoResult));

        control.start(&settings(), 9).unwrap();
        assert!(control.is_running());
        assert_eq!(
            control.result(),
            Ok(PerTestResult {
                test_id: 9,
                total_packets: 15,
                received_packets: 0
            })
        );
    }

    #[test]
    fn test_start_while_running_fails() {
        let mut control = PerTestControl::new(MockDriver::default());
        control.start(&settings(), 1).unwrap();
        assert_eq!(control.start(&settings(), 2), Err(TestError::AlreadyRunning));
        assert_eq!(control.result().unwrap().test_id, 1);

        control.driver_mut().running = false;
        control.start(&settings(), 2).unwrap();
        assert_eq!(control.result().unwrap().test_id, 2);
    }

    #[test]
    fn test_driver_refusal() {
        let mut control = PerTestControl::new(MockDriver {
            refuse: true,
            ..MockDriver::default()
        });
        assert!(matches!(
            control.start(&settings(), 1),
            Err(TestError::Rejected(_))
        ));
        assert!(control.set_trx_mode(&settings(), TrxMode::Tx).is_err());
        assert_eq!(control.driver().mode, TrxMode::Off);
    }

    #[test]
    fn test_trx_mode_codes() {
        assert_eq!(TrxMode::try_from(2u32), Ok(TrxMode::Rx));
        assert_eq!(TrxMode::try_from(3u32), Err(TestError::InvalidTrxMode(3)));
        assert_eq!(TrxMode::Tx.code(), 1);

        let mut control = PerTestControl::new(MockDriver::default());
        control.set_trx_mode(&settings(), TrxMode::Rx).unwrap();
        assert_eq!(control.driver().mode, TrxMode::Rx);
        control.reset();
        assert_eq!(control.driver().resets, 1);
    }
}
