//! The instrument: framing, dispatch and replies around one settings record
//!
//! [`Instrument`] owns everything the command loop touches. The registry is
//! moved in at construction, PHY 0 is selected immediately, and every later
//! change goes through `&mut self`, so no command can observe a settings
//! record that is out of step with the registry.

use tracing::{debug, info, warn};

use crate::command::{CommandId, CommandTable, ParsedCommand};
use crate::error::{CommandError, FrameError, ParseError};
use crate::framer::{CharSource, LineFramer, DEFAULT_LINE_CAPACITY, DEFAULT_TERMINATOR};
use crate::models::{DeviceDescriptor, PhyCapabilities};
use crate::per::{PerTestControl, TestDriver, TrxMode};
use crate::response::{send, CharSink, Reply, Value, ERROR_REPLY};
use crate::settings::{Settings, SettingsMachine};

/// Framing options of the command loop
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InstrumentConfig {
    /// Maximum command line length, terminator included
    pub line_capacity: usize,
    /// Line terminator byte
    pub terminator: u8,
    /// Reply `ERR` when an oversized line is dropped
    pub report_overflow: bool,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            line_capacity: DEFAULT_LINE_CAPACITY,
            terminator: DEFAULT_TERMINATOR,
            report_overflow: true,
        }
    }
}

/// Outcome of one [`Instrument::process`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// Input ran dry before a command line completed
    Idle,
    /// One line was dispatched and answered
    Executed(Result<CommandId, CommandError>),
}

/// Command processor bound to a device and a radio driver
#[derive(Debug)]
pub struct Instrument<D> {
    machine: SettingsMachine,
    control: PerTestControl<D>,
    framer: LineFramer,
    table: CommandTable,
    config: InstrumentConfig,
}

impl<D: TestDriver> Instrument<D> {
    /// Create an instrument with the default framing options
    pub fn new(device: DeviceDescriptor, driver: D) -> Result<Self, ParseError> {
        Self::with_config(device, driver, InstrumentConfig::default())
    }

    /// Create an instrument with explicit framing options
    pub fn with_config(
        device: DeviceDescriptor,
        driver: D,
        config: InstrumentConfig,
    ) -> Result<Self, ParseError> {
        let table = CommandTable::standard()?;
        info!(
            "Instrument {:?} ready with {} PHY(s), {} commands",
            device.idn(),
            device.phy_count(),
            table.len()
        );
        Ok(Self {
            machine: SettingsMachine::new(device),
            control: PerTestControl::new(driver),
            framer: LineFramer::with_capacity(config.line_capacity, config.terminator),
            table,
            config,
        })
    }

    /// Framing options in use
    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    /// Device the instrument answers for
    pub fn device(&self) -> &DeviceDescriptor {
        self.machine.device()
    }

    /// Current settings record
    pub fn settings(&self) -> &Settings {
        self.machine.settings()
    }

    /// Radio driver
    pub fn driver(&self) -> &D {
        self.control.driver()
    }

    /// Mutable driver access, e.g. to advance a simulated test
    pub fn driver_mut(&mut self) -> &mut D {
        self.control.driver_mut()
    }

    /// Read input and answer at most one command
    ///
    /// Blank lines are skipped. A dropped oversized line is answered with
    /// `ERR` when `report_overflow` is set and returned as an error.
    pub fn process<S, W>(&mut self, source: &mut S, sink: &mut W) -> Result<Processed, FrameError>
    where
        S: CharSource + ?Sized,
        W: CharSink + ?Sized,
    {
        loop {
            let line = match self.framer.poll_line(source) {
                None => return Ok(Processed::Idle),
                Some(Err(e)) => {
                    if self.config.report_overflow {
                        send(sink, ERROR_REPLY);
                    }
                    return Err(e);
                }
                Some(Ok(line)) => line,
            };

            let body = line.as_slice();
            let body = body.strip_suffix(&[self.config.terminator]).unwrap_or(body);
            let body = body.strip_suffix(b"\r").unwrap_or(body);
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let outcome = self.dispatch(text);
            let outcome = match outcome {
                Ok((id, reply)) => {
                    send(sink, &reply.encode());
                    Ok(id)
                }
                Err(e) => {
                    warn!("Command {:?} failed: {}", text, e);
                    send(sink, ERROR_REPLY);
                    Err(e)
                }
            };
            return Ok(Processed::Executed(outcome));
        }
    }

    /// Resolve and run one command line without any I/O
    pub fn execute(&mut self, line: &str) -> Result<Reply, CommandError> {
        self.dispatch(line).map(|(_, reply)| reply)
    }

    fn dispatch(&mut self, line: &str) -> Result<(CommandId, Reply), CommandError> {
        let command = self.table.resolve(line)?;
        let reply = self.run(&command)?;
        debug!("{:?} -> {}", command.id, reply);
        Ok((command.id, reply))
    }

    fn capabilities(&self, command: &ParsedCommand) -> Result<&PhyCapabilities, CommandError> {
        Ok(self.machine.device().capabilities(command.suffix(0))?)
    }

    fn run(&mut self, command: &ParsedCommand) -> Result<Reply, CommandError> {
        let reply = match command.id {
            CommandId::Identify => Reply::Text(self.device().idn().to_string()),
            CommandId::Reset => {
                self.control.reset();
                self.machine.select_phy(0)?;
                info!("Instrument reset");
                Reply::Ack
            }
            CommandId::PhyCount => {
                Reply::Scalar(Value::Unsigned(self.device().phy_count() as u64))
            }

            CommandId::Capabilities => Reply::from(self.capabilities(command)?),
            CommandId::LowestFrequency => Reply::scalar(self.capabilities(command)?.lowest_frequency),
            CommandId::HighestFrequency => {
                Reply::scalar(self.capabilities(command)?.highest_frequency)
            }
            CommandId::ChannelCount => Reply::scalar(self.capabilities(command)?.channel_count),
            CommandId::ChannelBandwidth => {
                Reply::scalar(self.capabilities(command)?.channel_bandwidth)
            }
            CommandId::Baudrate => Reply::scalar(self.capabilities(command)?.baudrate),
            CommandId::LowestPower => Reply::scalar(self.capabilities(command)?.lowest_power),
            CommandId::HighestPower => Reply::scalar(self.capabilities(command)?.highest_power),
            CommandId::MinPacketLength => {
                Reply::scalar(self.capabilities(command)?.minimal_packet_length)
            }
            CommandId::MaxPacketLength => {
                Reply::scalar(self.capabilities(command)?.maximal_packet_length)
            }
            CommandId::ModulationType => Reply::scalar(self.capabilities(command)?.modulation_type),
            CommandId::SupportedSignals => {
                Reply::scalar(self.capabilities(command)?.supported_signals)
            }
            CommandId::AntennaCount => Reply::scalar(self.capabilities(command)?.antenna_count),
            CommandId::Description => {
                Reply::Text(self.device().description(command.suffix(0))?.to_string())
            }
            CommandId::ChannelList => Reply::from(self.device().channels(command.suffix(0))?),
            CommandId::ChannelFrequency => Reply::scalar(
                self.device()
                    .channel_frequency(command.suffix(0), command.suffix(1))?,
            ),

            CommandId::Settings => Reply::from(self.settings()),
            CommandId::SelectPhy => {
                self.machine.select_phy(command.required_u32(0)?)?;
                Reply::Ack
            }
            CommandId::SelectedPhy => Reply::scalar(self.settings().phy_number),
            CommandId::SetChannel => {
                self.machine.set_channel(command.param_u32(0)?)?;
                Reply::Ack
            }
            CommandId::SelectedChannel => Reply::scalar(self.settings().channel_number),
            CommandId::SetSignal => {
                self.machine.set_signal(command.param_u32(0)?)?;
                Reply::Ack
            }
            CommandId::SelectedSignal => Reply::scalar(self.settings().signal_type),
            CommandId::SetPower => {
                self.machine.set_power(command.param_i32(0)?)?;
                Reply::Ack
            }
            CommandId::SelectedPower => Reply::scalar(self.settings().power),
            CommandId::SetAntenna => {
                self.machine.set_antenna(command.param_u32(0)?)?;
                Reply::Ack
            }
            CommandId::SelectedAntenna => Reply::scalar(self.settings().antenna_number),
            // Wire values above 65535 are rejected rather than truncated
            CommandId::SetPerTotalPackets => {
                self.machine.set_per_total_packets(command.param_u16(0)?);
                Reply::Ack
            }
            CommandId::SelectedPerTotalPackets => Reply::scalar(self.settings().per_total_packets),
            CommandId::SetPerPacketLength => {
                self.machine.set_per_packet_length(command.param_u32(0)?)?;
                Reply::Ack
            }
            CommandId::SelectedPerPacketLength => Reply::scalar(self.settings().per_packet_length),

            CommandId::SetTrxMode => {
                let mode = TrxMode::try_from(command.required_u32(0)?)?;
                self.control.set_trx_mode(self.machine.settings(), mode)?;
                Reply::Ack
            }
            CommandId::StartPerTest => {
                let test_id = command.required_u32(0)?;
                self.control.start(self.machine.settings(), test_id)?;
                Reply::Ack
            }
            CommandId::PerTestRunning => Reply::scalar(u8::from(self.control.is_running())),
            CommandId::PerTestResult => Reply::from(&self.control.result()?),
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::{SettingsError, TestError};
    use crate::models::{ChannelList, PhyDefaults, PhyEntry};
    use crate::per::PerTestResult;

    /// Driver whose test finishes only when told to
    #[derive(Default)]
    struct ManualDriver {
        result: Option<PerTestResult>,
        running: bool,
        mode: TrxMode,
        resets: usize,
    }

    impl TestDriver for ManualDriver {
        fn reset(&mut self) {
            self.resets += 1;
            self.running = false;
            self.mode = TrxMode::Off;
        }

        fn set_trx_mode(&mut self, _settings: &Settings, mode: TrxMode) -> Result<(), TestError> {
            self.mode = mode;
            Ok(())
        }

        fn start_per_test(&mut self, settings: &Settings, test_id: u32) -> Result<(), TestError> {
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

    fn device() -> DeviceDescriptor {
        let phy = PhyEntry {
            description: Some("SUN-PHY-FSK 50kbps".into()),
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
        };
        DeviceDescriptor::new("ACME,T1,0001,1.0", vec![phy]).unwrap()
    }

    fn instrument() -> Instrument<ManualDriver> {
        Instrument::new(device(), ManualDriver::default()).unwrap()
    }

    fn reply(instrument: &mut Instrument<ManualDriver>, line: &str) -> String {
        match instrument.execute(line) {
            Ok(reply) => reply.to_string(),
            Err(_) => "ERR".to_string(),
        }
    }

    #[test]
    fn test_identify_and_capabilities() {
        let mut inst = instrument();
        assert_eq!(reply(&mut inst, "*IDN?"), "ACME,T1,0001,1.0");
        assert_eq!(reply(&mut inst, "PHY?"), "1");
        assert_eq!(
            reply(&mut inst, "PHY0:CAP?"),
            "868000000,868300000,3,100000,50000,-10,13,0,12,100,20,1,3,2"
        );
        assert_eq!(reply(&mut inst, "PHY:CAP:POWL?"), "-10");
        assert_eq!(reply(&mut inst, "PHY1:CAP:POWL?"), "ERR");
        assert_eq!(reply(&mut inst, "PHY0:CHAN2?"), "868250000");
        assert_eq!(reply(&mut inst, "PHY0:CHAN3?"), "ERR");
    }

    #[test]
    fn test_setter_errors_are_typed() {
        let mut inst = instrument();
        assert!(matches!(
            inst.execute("SET:POW 50"),
            Err(CommandError::Settings(SettingsError::OutOfRange { .. }))
        ));
        assert!(matches!(
            inst.execute("SET:POW high"),
            Err(CommandError::Parse(ParseError::InvalidParameter { .. }))
        ));
        assert!(matches!(
            inst.execute("SET:PHY"),
            Err(CommandError::Parse(ParseError::MissingParameter(0)))
        ));
        assert!(matches!(
            inst.execute("TRX 4"),
            Err(CommandError::Test(TestError::InvalidTrxMode(4)))
        ));
    }

    #[test]
    fn test_reset_restores_phy_defaults() {
        let mut inst = instrument();
        inst.execute("SET:POW 7").unwrap();
        inst.execute("TRX 1").unwrap();
        assert_eq!(inst.execute("*RST"), Ok(Reply::Ack));
        assert_eq!(inst.settings().power, 0);
        assert_eq!(inst.driver().resets, 1);
        assert_eq!(inst.driver().mode, TrxMode::Off);
    }

    #[test]
    fn test_process_answers_one_command_per_call() {
        let mut inst = instrument();
        let mut input: VecDeque<u8> = b"\r\nPHY?\r\nSET:CHAN?\n".iter().copied().collect();
        let mut output = Vec::new();

        assert_eq!(
            inst.process(&mut input, &mut output),
            Ok(Processed::Executed(Ok(CommandId::PhyCount)))
        );
        assert_eq!(output, b"1\n");
        assert_eq!(
            inst.process(&mut input, &mut output),
            Ok(Processed::Executed(Ok(CommandId::SelectedChannel)))
        );
        assert_eq!(output, b"1\n1\n");
        assert_eq!(inst.process(&mut input, &mut output), Ok(Processed::Idle));
    }

    #[test]
    fn test_custom_terminator_end_to_end() {
        let config = InstrumentConfig {
            terminator: b';',
            ..InstrumentConfig::default()
        };
        let mut inst = Instrument::with_config(device(), ManualDriver::default(), config).unwrap();
        let mut input: VecDeque<u8> = b"PHY?;SET:POW 5\r;;SET:POW?;".iter().copied().collect();
        let mut output = Vec::new();

        assert_eq!(
            inst.process(&mut input, &mut output),
            Ok(Processed::Executed(Ok(CommandId::PhyCount)))
        );
        assert_eq!(
            inst.process(&mut input, &mut output),
            Ok(Processed::Executed(Ok(CommandId::SetPower)))
        );
        assert_eq!(
            inst.process(&mut input, &mut output),
            Ok(Processed::Executed(Ok(CommandId::SelectedPower)))
        );
        assert_eq!(output, b"1\nOK\n5\n");
        assert_eq!(inst.process(&mut input, &mut output), Ok(Processed::Idle));
    }

    #[test]
    fn test_per_total_packets_above_u16_is_rejected() {
        let mut inst = instrument();
        assert!(matches!(
            inst.execute("SET:PER:TOTAL 70000"),
            Err(CommandError::Parse(ParseError::InvalidParameter { index: 0, .. }))
        ));
        assert_eq!(reply(&mut inst, "SET:PER:TOTAL?"), "15");
        assert_eq!(inst.execute("SET:PER:TOTAL 65535"), Ok(Reply::Ack));
        assert_eq!(reply(&mut inst, "SET:PER:TOTAL?"), "65535");
    }

    #[test]
    fn test_overflow_reporting_is_configurable() {
        let config = InstrumentConfig {
            line_capacity: 8,
            report_overflow: false,
            ..InstrumentConfig::default()
        };
        let mut inst = Instrument::with_config(device(), ManualDriver::default(), config).unwrap();
        let mut input: VecDeque<u8> = b"PHY0:CAPABILITIES?\nPHY?\n".iter().copied().collect();
        let mut output = Vec::new();

        assert_eq!(
            inst.process(&mut input, &mut output),
            Err(FrameError::Overflow { capacity: 8 })
        );
        assert!(output.is_empty());
        inst.process(&mut input, &mut output).unwrap();
        assert_eq!(output, b"1\n");
    }
}
