//! Command table and dispatch resolution
//!
//! A [`CommandTable`] maps compiled [`Pattern`]s to [`CommandId`]s. Resolving
//! a line splits it into header and parameters, picks the matching pattern
//! and returns a [`ParsedCommand`] carrying the suffix values and the raw
//! parameter text for the handler to convert.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;

use crate::error::ParseError;
use crate::pattern::{Header, Pattern};

/// Handler selected by a command pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandId {
    /// `*IDN?`
    Identify,
    /// `*RST`
    Reset,
    /// `PHY?`
    PhyCount,
    /// `PHY#:CAPabilities?`
    Capabilities,
    LowestFrequency,
    HighestFrequency,
    ChannelCount,
    ChannelBandwidth,
    Baudrate,
    LowestPower,
    HighestPower,
    MinPacketLength,
    MaxPacketLength,
    ModulationType,
    SupportedSignals,
    AntennaCount,
    /// `PHY#:DESCription?`
    Description,
    /// `PHY#:CHANList?`
    ChannelList,
    /// `PHY#:CHANnel#?`
    ChannelFrequency,
    /// `SETtings?`
    Settings,
    SelectPhy,
    SelectedPhy,
    SetChannel,
    SelectedChannel,
    SetSignal,
    SelectedSignal,
    SetPower,
    SelectedPower,
    SetAntenna,
    SelectedAntenna,
    SetPerTotalPackets,
    SelectedPerTotalPackets,
    SetPerPacketLength,
    SelectedPerPacketLength,
    /// `TRXmode`
    SetTrxMode,
    /// `PER`
    StartPerTest,
    /// `PER?`
    PerTestRunning,
    /// `PERRESULT?`
    PerTestResult,
}

/// The instrument's command set in registration order
pub const STANDARD_COMMANDS: &[(&str, CommandId)] = &[
    ("*IDN?", CommandId::Identify),
    ("*RST", CommandId::Reset),
    ("PHY?", CommandId::PhyCount),
    ("PHY#:CAPabilities?", CommandId::Capabilities),
    ("PHY#:CAPabilities:FREQLow?", CommandId::LowestFrequency),
    ("PHY#:CAPabilities:FREQHigh?", CommandId::HighestFrequency),
    ("PHY#:CAPabilities:CHANCount?", CommandId::ChannelCount),
    ("PHY#:CAPabilities:CHANBandwidth?", CommandId::ChannelBandwidth),
    ("PHY#:CAPabilities:BAUDrate?", CommandId::Baudrate),
    ("PHY#:CAPabilities:POWLow?", CommandId::LowestPower),
    ("PHY#:CAPabilities:POWHigh?", CommandId::HighestPower),
    ("PHY#:CAPabilities:PCKTLENMIN?", CommandId::MinPacketLength),
    ("PHY#:CAPabilities:PCKTLENMAX?", CommandId::MaxPacketLength),
    ("PHY#:CAPabilities:MODType?", CommandId::ModulationType),
    ("PHY#:CAPabilities:SIGnals?", CommandId::SupportedSignals),
    ("PHY#:CAPabilities:ANTenna?", CommandId::AntennaCount),
    ("PHY#:DESCription?", CommandId::Description),
    ("PHY#:CHANList?", CommandId::ChannelList),
    ("PHY#:CHANnel#?", CommandId::ChannelFrequency),
    ("SETtings?", CommandId::Settings),
    ("SETtings:PHY", CommandId::SelectPhy),
    ("SETtings:PHY?", CommandId::SelectedPhy),
    ("SETtings:CHANnel", CommandId::SetChannel),
    ("SETtings:CHANnel?", CommandId::SelectedChannel),
    ("SETtings:SIGnal", CommandId::SetSignal),
    ("SETtings:SIGnal?", CommandId::SelectedSignal),
    ("SETtings:POWer", CommandId::SetPower),
    ("SETtings:POWer?", CommandId::SelectedPower),
    ("SETtings:ANTenna", CommandId::SetAntenna),
    ("SETtings:ANTenna?", CommandId::SelectedAntenna),
    ("SETtings:PER:TOTALpackets", CommandId::SetPerTotalPackets),
    ("SETtings:PER:TOTALpackets?", CommandId::SelectedPerTotalPackets),
    ("SETtings:PER:PCKTLENgth", CommandId::SetPerPacketLength),
    ("SETtings:PER:PCKTLENgth?", CommandId::SelectedPerPacketLength),
    ("TRXmode", CommandId::SetTrxMode),
    ("PER", CommandId::StartPerTest),
    ("PER?", CommandId::PerTestRunning),
    ("PERRESULT?", CommandId::PerTestResult),
];

/// A resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Selected handler
    pub id: CommandId,
    /// Values of the pattern's suffix slots, in order
    pub suffixes: Vec<u32>,
    /// Raw parameter text, in order
    pub params: Vec<String>,
}

impl ParsedCommand {
    /// Value of suffix slot `index`, 0 when the pattern has no such slot
    pub fn suffix(&self, index: usize) -> u32 {
        self.suffixes.get(index).copied().unwrap_or(0)
    }

    /// Parameter `index` as an unsigned integer
    pub fn param_u32(&self, index: usize) -> Result<Option<u32>, ParseError> {
        self.param(index)
    }

    /// Parameter `index` as a signed integer
    pub fn param_i32(&self, index: usize) -> Result<Option<i32>, ParseError> {
        self.param(index)
    }

    /// Parameter `index` as a 16-bit unsigned integer
    pub fn param_u16(&self, index: usize) -> Result<Option<u16>, ParseError> {
        self.param(index)
    }

    /// Parameter `index` as an unsigned integer, failing when absent
    pub fn required_u32(&self, index: usize) -> Result<u32, ParseError> {
        self.param_u32(index)?
            .ok_or(ParseError::MissingParameter(index))
    }

    fn param<T: FromStr>(&self, index: usize) -> Result<Option<T>, ParseError> {
        let Some(text) = self.params.get(index) else {
            return Ok(None);
        };
        text.parse().map(Some).map_err(|_| ParseError::InvalidParameter {
            index,
            value: text.clone(),
        })
    }
}

/// Registered command patterns
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    entries: Vec<(Pattern, CommandId)>,
    /// Entry indices by (depth, query)
    index: HashMap<(usize, bool), Vec<usize>>,
}

impl CommandTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The full instrument command set
    pub fn standard() -> Result<Self, ParseError> {
        let mut table = Self::new();
        for (pattern, id) in STANDARD_COMMANDS {
            table.register(pattern, *id)?;
        }
        Ok(table)
    }

    /// Compile and register a pattern
    pub fn register(&mut self, pattern: &str, id: CommandId) -> Result<(), ParseError> {
        let pattern = Pattern::parse(pattern)?;
        let key = (pattern.depth(), pattern.is_query());
        self.index.entry(key).or_default().push(self.entries.len());
        self.entries.push((pattern, id));
        Ok(())
    }

    /// Number of registered patterns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pattern is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a command line (terminator optional)
    pub fn resolve(&self, line: &str) -> Result<ParsedCommand, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let (header_text, rest) = line
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((line, ""));
        let header = Header::parse(header_text)?;

        let candidates = self
            .index
            .get(&(header.depth(), header.is_query()))
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut best: Option<(usize, CommandId, Vec<u32>)> = None;
        for &entry in candidates {
            let (pattern, id) = &self.entries[entry];
            let Some(suffixes) = pattern.matches(&header) else {
                continue;
            };
            let specificity = pattern.specificity();
            if best.as_ref().map_or(true, |(s, _, _)| specificity > *s) {
                best = Some((specificity, *id, suffixes));
            }
        }

        let Some((_, id, suffixes)) = best else {
            return Err(ParseError::UnknownCommand(header_text.to_string()));
        };

        let rest = rest.trim();
        let params = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(|p| p.trim().to_string()).collect()
        };

        debug!("Resolved {:?} to {:?} {:?} {:?}", line, id, suffixes, params);
        Ok(ParsedCommand {
            id,
            suffixes,
            params,
        })
    }
}
