//! Virtual transceiver
//!
//! Simulates the radio behind the instrument closely enough to run PER tests
//! end to end: TRX mode tracking, a packet counter advanced by [`tick`], and
//! an optional deterministic loss pattern.
//!
//! [`tick`]: VirtualTransceiver::tick

use etsi_protocol::{PerTestResult, Settings, TestDriver, TestError, TrxMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for creating a virtual transceiver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualTransceiverConfig {
    /// Lose every n-th packet of a PER test (`None` or 0: lose nothing)
    #[serde(default)]
    pub loss_every: Option<u16>,
}

/// A simulated radio implementing [`TestDriver`]
#[derive(Debug)]
pub struct VirtualTransceiver {
    /// Current transceiver mode
    mode: TrxMode,
    /// Last started test, updated as packets arrive
    result: Option<PerTestResult>,
    /// Packets sent in the running test
    sent: u16,
    /// A test is in progress
    running: bool,
    /// Loss pattern, never `Some(0)`
    loss_every: Option<u16>,
}

impl Default for VirtualTransceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTransceiver {
    /// Create a transceiver that receives every packet
    pub fn new() -> Self {
        Self::from_config(VirtualTransceiverConfig::default())
    }

    /// Create a transceiver from configuration
    pub fn from_config(config: VirtualTransceiverConfig) -> Self {
        Self {
            mode: TrxMode::Off,
            result: None,
            sent: 0,
            running: false,
            loss_every: config.loss_every.filter(|n| *n > 0),
        }
    }

    /// Current TRX mode
    pub fn mode(&self) -> TrxMode {
        self.mode
    }

    /// Packets sent so far in the current (or last) test
    pub fn packets_sent(&self) -> u16 {
        self.sent
    }

    /// Send one packet of the running test
    ///
    /// Returns `true` while the test made progress. The test stops after the
    /// packet count recorded at start.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let Some(result) = self.result.as_mut() else {
            self.running = false;
            return false;
        };

        self.sent = self.sent.saturating_add(1);
        let lost = self.loss_every.is_some_and(|n| self.sent % n == 0);
        if !lost {
            result.received_packets = result.received_packets.saturating_add(1);
        }

        if self.sent >= result.total_packets {
            self.running = false;
            info!(
                "PER test {} finished: {}/{} packets received",
                result.test_id, result.received_packets, result.total_packets
            );
        }
        true
    }

    /// Tick until the running test completes
    pub fn run_to_completion(&mut self) {
        while self.tick() {}
    }
}

impl TestDriver for VirtualTransceiver {
    fn reset(&mut self) {
        self.mode = TrxMode::Off;
        self.result = None;
        self.sent = 0;
        self.running = false;
        debug!("Virtual transceiver reset");
    }

    fn set_trx_mode(&mut self, settings: &Settings, mode: TrxMode) -> Result<(), TestError> {
        if self.running {
            return Err(TestError::Rejected("PER test in progress".into()));
        }
        self.mode = mode;
        debug!(
            "TRX {} on PHY {} channel {} at {} dBm",
            mode, settings.phy_number, settings.channel_number, settings.power
        );
        Ok(())
    }

    fn start_per_test(&mut self, settings: &Settings, test_id: u32) -> Result<(), TestError> {
        if settings.per_total_packets == 0 {
            return Err(TestError::Rejected("packet count is zero".into()));
        }
        if settings.per_packet_length == 0 {
            return Err(TestError::Rejected("packet length is zero".into()));
        }

        self.result = Some(PerTestResult {
            test_id,
            total_packets: settings.per_total_packets,
            received_packets: 0,
        });
        self.sent = 0;
        self.running = true;
        self.mode = TrxMode::Tx;
        Ok(())
    }

    fn is_per_test_running(&self) -> bool {
        self.running
    }

    fn per_test_result(&self) -> Option<PerTestResult> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(total: u16) -> Settings {
        Settings {
            per_total_packets: total,
            per_packet_length: 20,
            ..Settings::default()
        }
    }

    #[test]
    fn test_no_result_before_first_test() {
        let radio = VirtualTransceiver::new();
        assert_eq!(radio.per_test_result(), None);
        assert!(!radio.is_per_test_running());
        assert_eq!(radio.mode(), TrxMode::Off);
    }

    #[test]
    fn test_lossless_run() {
        let mut radio = VirtualTransceiver::new();
        radio.start_per_test(&settings(5), 11).unwrap();
        assert!(radio.is_per_test_running());
        assert_eq!(radio.mode(), TrxMode::Tx);

        radio.run_to_completion();
        assert!(!radio.is_per_test_running());
        assert_eq!(radio.packets_sent(), 5);
        assert_eq!(
            radio.per_test_result(),
            Some(PerTestResult {
                test_id: 11,
                total_packets: 5,
                received_packets: 5
            })
        );
        assert!(!radio.tick());
    }

    #[test]
    fn test_loss_pattern() {
        let mut radio = VirtualTransceiver::from_config(VirtualTransceiverConfig {
            loss_every: Some(4),
        });
        radio.start_per_test(&settings(10), 1).unwrap();
        radio.run_to_completion();
        // packets 4 and 8 are lost
        assert_eq!(radio.per_test_result().unwrap().received_packets, 8);
    }

    #[test]
    fn test_zero_loss_every_means_lossless() {
        let mut radio = VirtualTransceiver::from_config(VirtualTransceiverConfig {
            loss_every: Some(0),
        });
        radio.start_per_test(&settings(3), 1).unwrap();
        radio.run_to_completion();
        assert_eq!(radio.per_test_result().unwrap().received_packets, 3);
    }

    #[test]
    fn test_rejects_empty_tests() {
        let mut radio = VirtualTransceiver::new();
        assert!(radio.start_per_test(&settings(0), 1).is_err());

        let no_length = Settings {
            per_packet_length: 0,
            ..settings(5)
        };
        assert!(radio.start_per_test(&no_length, 1).is_err());
        assert_eq!(radio.per_test_result(), None);
    }

    #[test]
    fn test_mode_locked_while_running() {
        let mut radio = VirtualTransceiver::new();
        radio.set_trx_mode(&settings(5), TrxMode::Tx).unwrap();
        radio.start_per_test(&settings(5), 1).unwrap();
        assert!(radio.set_trx_mode(&settings(5), TrxMode::Off).is_err());

        radio.reset();
        assert_eq!(radio.mode(), TrxMode::Off);
        assert!(!radio.is_per_test_running());
        assert_eq!(radio.per_test_result(), None);
    }
}
