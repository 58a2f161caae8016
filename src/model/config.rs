// src/model/config.rs
//
// Per-channel configuration, the full seven-channel table, and the
// `all_config` snapshot exchanged with the device.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use super::channel::{Channel, CHANNEL_COUNT};
use super::values::{enable_flag, Mode, Octave, PitchBend, RootNote};
use super::ModelError;

// ============================================================================
// Channel configuration
// ============================================================================

/// Tunable parameters of one channel.
///
/// Field names and encodings are the `all_config` JSON shape, which is also
/// the `.ptc` profile shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(rename = "enable", with = "enable_flag")]
    pub enabled: bool,
    pub root_note: RootNote,
    pub octave: Octave,
    pub mode: Mode,
    pub offset1: u8,
    pub offset2: u8,
    pub offset3: u8,
    pub control: u8,
    pub pitchbend: PitchBend,
}

impl Default for ChannelConfig {
    /// Factory template written at first boot and by `defaults`.
    fn default() -> Self {
        Self {
            enabled: true,
            root_note: RootNote::C,
            octave: Octave::One,
            mode: Mode::Major,
            offset1: 5,
            offset2: 7,
            offset3: 12,
            control: 17,
            pitchbend: PitchBend(14),
        }
    }
}

impl ChannelConfig {
    /// Current value of one parameter.
    pub fn get(&self, parameter: Parameter) -> ParameterValue {
        match parameter {
            Parameter::Enable => ParameterValue::Enable(self.enabled),
            Parameter::RootNote => ParameterValue::RootNote(self.root_note),
            Parameter::Octave => ParameterValue::Octave(self.octave),
            Parameter::Mode => ParameterValue::Mode(self.mode),
            Parameter::Offset1 => ParameterValue::Offset(OffsetSlot::First, self.offset1),
            Parameter::Offset2 => ParameterValue::Offset(OffsetSlot::Second, self.offset2),
            Parameter::Offset3 => ParameterValue::Offset(OffsetSlot::Third, self.offset3),
            Parameter::Control => ParameterValue::Control(self.control),
            Parameter::PitchBend => ParameterValue::PitchBend(self.pitchbend),
        }
    }

    /// Overwrite one field.
    pub fn set(&mut self, value: ParameterValue) {
        match value {
            ParameterValue::Enable(v) => self.enabled = v,
            ParameterValue::RootNote(v) => self.root_note = v,
            ParameterValue::Octave(v) => self.octave = v,
            ParameterValue::Mode(v) => self.mode = v,
            ParameterValue::Offset(OffsetSlot::First, v) => self.offset1 = v,
            ParameterValue::Offset(OffsetSlot::Second, v) => self.offset2 = v,
            ParameterValue::Offset(OffsetSlot::Third, v) => self.offset3 = v,
            ParameterValue::Control(v) => self.control = v,
            ParameterValue::PitchBend(v) => self.pitchbend = v,
        }
    }

    pub fn offset(&self, slot: OffsetSlot) -> u8 {
        match slot {
            OffsetSlot::First => self.offset1,
            OffsetSlot::Second => self.offset2,
            OffsetSlot::Third => self.offset3,
        }
    }

    /// Every parameter of this channel, in the order a profile is pushed.
    pub fn values(&self) -> impl Iterator<Item = ParameterValue> + '_ {
        Parameter::ALL.iter().map(move |p| self.get(*p))
    }
}

// ============================================================================
// Seven-channel table
// ============================================================================

/// Configurations for all seven channels. Cannot be partially populated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Channel, ChannelConfig>",
    into = "BTreeMap<Channel, ChannelConfig>"
)]
pub struct ChannelConfigs([ChannelConfig; CHANNEL_COUNT]);

impl Default for ChannelConfigs {
    fn default() -> Self {
        Self(std::array::from_fn(|_| ChannelConfig::default()))
    }
}

impl ChannelConfigs {
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ChannelConfig)> {
        Channel::ALL.iter().copied().zip(self.0.iter())
    }

    /// Reset every channel to the factory template.
    pub fn restore_defaults(&mut self) {
        *self = Self::default();
    }
}

impl Index<Channel> for ChannelConfigs {
    type Output = ChannelConfig;

    fn index(&self, channel: Channel) -> &ChannelConfig {
        &self.0[channel.index()]
    }
}

impl IndexMut<Channel> for ChannelConfigs {
    fn index_mut(&mut self, channel: Channel) -> &mut ChannelConfig {
        &mut self.0[channel.index()]
    }
}

impl TryFrom<BTreeMap<Channel, ChannelConfig>> for ChannelConfigs {
    type Error = ModelError;

    fn try_from(mut map: BTreeMap<Channel, ChannelConfig>) -> Result<Self, Self::Error> {
        let mut configs = ChannelConfigs::default();
        for channel in Channel::ALL {
            configs[channel] = map
                .remove(&channel)
                .ok_or(ModelError::MissingChannel(channel))?;
        }
        Ok(configs)
    }
}

impl From<ChannelConfigs> for BTreeMap<Channel, ChannelConfig> {
    fn from(configs: ChannelConfigs) -> Self {
        Channel::ALL.iter().copied().zip(configs.0).collect()
    }
}

// ============================================================================
// all_config snapshot
// ============================================================================

/// Body of the device's `all_config` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Channel currently selected on the device.
    #[serde(rename = "current_config")]
    pub current: Channel,
    #[serde(rename = "all_configs")]
    pub channels: ChannelConfigs,
}

impl ConfigSnapshot {
    pub fn get(&self, channel: Channel) -> &ChannelConfig {
        &self.channels[channel]
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Which of the three scale-degree offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OffsetSlot {
    First,
    Second,
    Third,
}

impl OffsetSlot {
    pub fn number(self) -> u8 {
        match self {
            OffsetSlot::First => 1,
            OffsetSlot::Second => 2,
            OffsetSlot::Third => 3,
        }
    }
}

/// Highest offset the client will send.
pub const MAX_OFFSET: u8 = 60;
/// Highest MIDI CC index.
pub const MAX_CONTROL: u8 = 127;

/// Name of a settable channel field; `Display` gives the device command verb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parameter {
    Enable,
    RootNote,
    Octave,
    Mode,
    Offset1,
    Offset2,
    Offset3,
    Control,
    PitchBend,
}

impl Parameter {
    pub const ALL: [Parameter; 9] = [
        Parameter::Enable,
        Parameter::RootNote,
        Parameter::Octave,
        Parameter::Mode,
        Parameter::Offset1,
        Parameter::Offset2,
        Parameter::Offset3,
        Parameter::Control,
        Parameter::PitchBend,
    ];

    pub fn command(self) -> &'static str {
        match self {
            Parameter::Enable => "enable",
            Parameter::RootNote => "root_note",
            Parameter::Octave => "octave",
            Parameter::Mode => "mode",
            Parameter::Offset1 => "offset1",
            Parameter::Offset2 => "offset2",
            Parameter::Offset3 => "offset3",
            Parameter::Control => "control",
            Parameter::PitchBend => "pitchbend",
        }
    }

    /// Parse user input into a typed, range-checked value.
    ///
    /// Octaves are taken as band labels ("-1".."4"); the semitone form is
    /// only used on the wire.
    pub fn parse_value(self, input: &str) -> Result<ParameterValue, ModelError> {
        let input = input.trim();
        let value = match self {
            Parameter::Enable => ParameterValue::Enable(
                enable_flag::from_word(input).ok_or_else(|| ModelError::InvalidEnable(input.to_string()))?,
            ),
            Parameter::RootNote => ParameterValue::RootNote(input.parse()?),
            Parameter::Octave => ParameterValue::Octave(Octave::from_label(input)?),
            Parameter::Mode => ParameterValue::Mode(input.parse()?),
            Parameter::Offset1 => ParameterValue::Offset(OffsetSlot::First, parse_number(self, input)?),
            Parameter::Offset2 => ParameterValue::Offset(OffsetSlot::Second, parse_number(self, input)?),
            Parameter::Offset3 => ParameterValue::Offset(OffsetSlot::Third, parse_number(self, input)?),
            Parameter::Control => ParameterValue::Control(parse_number(self, input)?),
            Parameter::PitchBend => ParameterValue::PitchBend(input.parse()?),
        };
        value.validate()?;
        Ok(value)
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}

impl std::str::FromStr for Parameter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.command() == lower)
            .ok_or_else(|| ModelError::UnknownParameter(s.to_string()))
    }
}

fn parse_number(parameter: Parameter, input: &str) -> Result<u8, ModelError> {
    input.parse::<u8>().map_err(|_| ModelError::NotANumber {
        parameter: parameter.command(),
        value: input.to_string(),
    })
}

/// A typed value for one parameter, ready to be sent to the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterValue {
    Enable(bool),
    RootNote(RootNote),
    Octave(Octave),
    Mode(Mode),
    Offset(OffsetSlot, u8),
    Control(u8),
    PitchBend(PitchBend),
}

impl ParameterValue {
    pub fn parameter(&self) -> Parameter {
        match self {
            ParameterValue::Enable(_) => Parameter::Enable,
            ParameterValue::RootNote(_) => Parameter::RootNote,
            ParameterValue::Octave(_) => Parameter::Octave,
            ParameterValue::Mode(_) => Parameter::Mode,
            ParameterValue::Offset(OffsetSlot::First, _) => Parameter::Offset1,
            ParameterValue::Offset(OffsetSlot::Second, _) => Parameter::Offset2,
            ParameterValue::Offset(OffsetSlot::Third, _) => Parameter::Offset3,
            ParameterValue::Control(_) => Parameter::Control,
            ParameterValue::PitchBend(_) => Parameter::PitchBend,
        }
    }

    /// Argument text sent after `=`. The codec upper-cases it.
    pub fn wire_argument(&self) -> String {
        match self {
            ParameterValue::Enable(v) => enable_flag::to_word(*v).to_string(),
            ParameterValue::RootNote(v) => v.name().to_string(),
            ParameterValue::Octave(v) => v.semitones().to_string(),
            ParameterValue::Mode(v) => v.name().to_string(),
            ParameterValue::Offset(_, v) | ParameterValue::Control(v) => v.to_string(),
            ParameterValue::PitchBend(v) => v.0.to_string(),
        }
    }

    /// Reject values the client must never send: sentinels for note and
    /// octave, and numbers outside the documented ranges.
    pub fn validate(&self) -> Result<(), ModelError> {
        match *self {
            ParameterValue::RootNote(RootNote::Unknown) => {
                Err(ModelError::UnknownRootNote(RootNote::Unknown.name().to_string()))
            }
            ParameterValue::Octave(Octave::Unknown) => {
                Err(ModelError::InvalidOctave(Octave::Unknown.label().to_string()))
            }
            ParameterValue::Offset(slot, v) if v > MAX_OFFSET => Err(ModelError::OutOfRange {
                parameter: Parameter::from_offset(slot).command(),
                value: v as i64,
                min: 0,
                max: MAX_OFFSET as i64,
            }),
            ParameterValue::Control(v) if v > MAX_CONTROL => Err(ModelError::OutOfRange {
                parameter: "control",
                value: v as i64,
                min: 0,
                max: MAX_CONTROL as i64,
            }),
            ParameterValue::PitchBend(v) if !v.is_settable() => Err(ModelError::OutOfRange {
                parameter: "pitchbend",
                value: v.0 as i64,
                min: 0,
                max: MAX_CONTROL as i64,
            }),
            _ => Ok(()),
        }
    }
}

impl Parameter {
    fn from_offset(slot: OffsetSlot) -> Parameter {
        match slot {
            OffsetSlot::First => Parameter::Offset1,
            OffsetSlot::Second => Parameter::Offset2,
            OffsetSlot::Third => Parameter::Offset3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"current_config": "BLUE", "all_configs": {
        "BLUE": {"enable": "TRUE", "offset1": 5, "offset2": 7, "offset3": 12, "octave": 24, "root_note": "C", "mode": "MAJOR", "control": 17, "pitchbend": 14},
        "CYAN": {"enable": "FALSE", "offset1": 1, "offset2": 2, "offset3": 3, "octave": 0, "root_note": "C#", "mode": "MINOR", "control": 1, "pitchbend": 224},
        "GREEN": {"enable": "TRUE", "offset1": 5, "offset2": 7, "offset3": 12, "octave": 60, "root_note": "B", "mode": "DORIAN", "control": 17, "pitchbend": 255},
        "PURPLE": {"enable": "TRUE", "offset1": 5, "offset2": 9, "offset3": 12, "octave": 24, "root_note": "C", "mode": "MAJOR", "control": 17, "pitchbend": 14},
        "RED": {"enable": "TRUE", "offset1": 5, "offset2": 7, "offset3": 12, "octave": 24, "root_note": "C", "mode": "MAJOR", "control": 17, "pitchbend": 14},
        "YELLOW": {"enable": "TRUE", "offset1": 5, "offset2": 7, "offset3": 12, "octave": 24, "root_note": "C", "mode": "CHROMATIC", "control": 17, "pitchbend": 14},
        "WHITE": {"enable": "TRUE", "offset1": 5, "offset2": 7, "offset3": 12, "octave": 255, "root_note": "Unknown", "mode": "MAJOR", "control": 17, "pitchbend": 14}
    }}"#;

    #[test]
    fn test_snapshot_parses_device_json() {
        let snapshot: ConfigSnapshot = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(snapshot.current, Channel::Blue);
        assert_eq!(snapshot.get(Channel::Blue), &ChannelConfig::default());

        let cyan = snapshot.get(Channel::Cyan);
        assert!(!cyan.enabled);
        assert_eq!(cyan.root_note, RootNote::CSharp);
        assert_eq!(cyan.octave, Octave::MinusOne);
        assert_eq!(cyan.pitchbend, PitchBend::TRUE_BEND);

        assert_eq!(snapshot.get(Channel::Purple).offset2, 9);
        assert_eq!(snapshot.get(Channel::White).octave, Octave::Unknown);
        assert_eq!(snapshot.get(Channel::White).root_note, RootNote::Unknown);
    }

    #[test]
    fn test_snapshot_missing_channel_is_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        value["all_configs"].as_object_mut().unwrap().remove("RED");
        let err = serde_json::from_value::<ConfigSnapshot>(value).unwrap_err();
        assert!(err.to_string().contains("RED"), "{}", err);
    }

    #[test]
    fn test_snapshot_serializes_wire_shape() {
        let snapshot = ConfigSnapshot {
            current: Channel::Green,
            channels: ChannelConfigs::default(),
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["current_config"], "GREEN");
        let blue = &value["all_configs"]["BLUE"];
        assert_eq!(blue["enable"], "TRUE");
        assert_eq!(blue["octave"], 24);
        assert_eq!(blue["root_note"], "C");
        assert_eq!(blue["mode"], "MAJOR");
        assert_eq!(blue["pitchbend"], 14);
        assert_eq!(value["all_configs"].as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_parameter_get_set() {
        let mut config = ChannelConfig::default();
        config.set(ParameterValue::Offset(OffsetSlot::Third, 40));
        config.set(ParameterValue::Mode(Mode::Dorian));
        assert_eq!(config.offset3, 40);
        assert_eq!(config.get(Parameter::Mode), ParameterValue::Mode(Mode::Dorian));
        assert_eq!(config.values().count(), Parameter::ALL.len());
    }

    #[test]
    fn test_parse_value_ranges() {
        assert_eq!(
            Parameter::Offset1.parse_value("60").unwrap(),
            ParameterValue::Offset(OffsetSlot::First, 60)
        );
        assert!(Parameter::Offset1.parse_value("61").is_err());
        assert!(Parameter::Control.parse_value("128").is_err());
        assert!(Parameter::Control.parse_value("abc").is_err());
        assert_eq!(
            Parameter::Octave.parse_value("2").unwrap(),
            ParameterValue::Octave(Octave::Two)
        );
        assert_eq!(
            Parameter::Enable.parse_value("false").unwrap(),
            ParameterValue::Enable(false)
        );
    }

    #[test]
    fn test_wire_arguments() {
        assert_eq!(ParameterValue::Octave(Octave::Two).wire_argument(), "36");
        assert_eq!(ParameterValue::Enable(true).wire_argument(), "TRUE");
        assert_eq!(ParameterValue::RootNote(RootNote::DSharp).wire_argument(), "D#");
        assert_eq!(ParameterValue::PitchBend(PitchBend::DISABLED).wire_argument(), "255");
    }

    #[test]
    fn test_sentinels_cannot_be_sent() {
        assert!(ParameterValue::RootNote(RootNote::Unknown).validate().is_err());
        assert!(ParameterValue::Octave(Octave::Unknown).validate().is_err());
        assert!(ParameterValue::PitchBend(PitchBend(200)).validate().is_err());
        assert!(ParameterValue::PitchBend(PitchBend::TRUE_BEND).validate().is_ok());
    }
}
