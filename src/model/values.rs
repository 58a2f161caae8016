// src/model/values.rs
//
// Enumerated and sentinel-carrying field values of a channel configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ModelError;

// ============================================================================
// Root note
// ============================================================================

/// Root note of a channel's scale, as a pitch class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootNote {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D#")]
    DSharp,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "G#")]
    GSharp,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A#")]
    ASharp,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "Unknown")]
    Unknown,
}

/// Memory value stored for a root note the device does not recognise.
pub const UNKNOWN_BYTE: u8 = 255;

impl RootNote {
    /// The twelve real pitch classes, in MIDI order.
    pub const NOTES: [RootNote; 12] = [
        RootNote::C,
        RootNote::CSharp,
        RootNote::D,
        RootNote::DSharp,
        RootNote::E,
        RootNote::F,
        RootNote::FSharp,
        RootNote::G,
        RootNote::GSharp,
        RootNote::A,
        RootNote::ASharp,
        RootNote::B,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RootNote::C => "C",
            RootNote::CSharp => "C#",
            RootNote::D => "D",
            RootNote::DSharp => "D#",
            RootNote::E => "E",
            RootNote::F => "F",
            RootNote::FSharp => "F#",
            RootNote::G => "G",
            RootNote::GSharp => "G#",
            RootNote::A => "A",
            RootNote::ASharp => "A#",
            RootNote::B => "B",
            RootNote::Unknown => "Unknown",
        }
    }

    /// MIDI pitch-class offset 0..11, or 255 for `Unknown`.
    pub fn pitch_class(self) -> u8 {
        match self {
            RootNote::Unknown => UNKNOWN_BYTE,
            note => Self::NOTES.iter().position(|n| *n == note).unwrap_or(0) as u8,
        }
    }

    pub fn from_pitch_class(value: u8) -> RootNote {
        Self::NOTES
            .get(value as usize)
            .copied()
            .unwrap_or(RootNote::Unknown)
    }
}

impl fmt::Display for RootNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RootNote {
    type Err = ModelError;

    /// Only the twelve real notes parse; `Unknown` is a read-only sentinel.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::NOTES
            .iter()
            .copied()
            .find(|n| n.name() == upper)
            .ok_or_else(|| ModelError::UnknownRootNote(s.to_string()))
    }
}

// ============================================================================
// Octave
// ============================================================================

/// Octave band, carried on the wire and in memory as its semitone offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Octave {
    MinusOne,
    Zero,
    One,
    Two,
    Three,
    Four,
    Unknown,
}

impl Octave {
    pub const BANDS: [Octave; 6] = [
        Octave::MinusOne,
        Octave::Zero,
        Octave::One,
        Octave::Two,
        Octave::Three,
        Octave::Four,
    ];

    /// Semitones added to the root note: 0, 12, .. 60, or 255 for `Unknown`.
    pub fn semitones(self) -> u8 {
        match self {
            Octave::Unknown => UNKNOWN_BYTE,
            band => 12 * Self::BANDS.iter().position(|b| *b == band).unwrap_or(0) as u8,
        }
    }

    /// Band label as shown to users: "-1" through "4".
    pub fn label(self) -> &'static str {
        match self {
            Octave::MinusOne => "-1",
            Octave::Zero => "0",
            Octave::One => "1",
            Octave::Two => "2",
            Octave::Three => "3",
            Octave::Four => "4",
            Octave::Unknown => "Unknown",
        }
    }

    pub fn from_semitones(value: u8) -> Result<Octave, ModelError> {
        if value == UNKNOWN_BYTE {
            return Ok(Octave::Unknown);
        }
        if value % 12 != 0 {
            return Err(ModelError::InvalidOctave(value.to_string()));
        }
        Self::BANDS
            .get((value / 12) as usize)
            .copied()
            .ok_or_else(|| ModelError::InvalidOctave(value.to_string()))
    }

    pub fn from_label(label: &str) -> Result<Octave, ModelError> {
        Self::BANDS
            .iter()
            .copied()
            .find(|b| b.label() == label.trim())
            .ok_or_else(|| ModelError::InvalidOctave(label.to_string()))
    }
}

impl TryFrom<u8> for Octave {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Octave::from_semitones(value)
    }
}

impl From<Octave> for u8 {
    fn from(octave: Octave) -> u8 {
        octave.semitones()
    }
}

impl fmt::Display for Octave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Scale mode
// ============================================================================

/// Scale mode; the ordinal is what the device stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Major,
    Minor,
    Mixolydian,
    Dorian,
    Chromatic,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Major,
        Mode::Minor,
        Mode::Mixolydian,
        Mode::Dorian,
        Mode::Chromatic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Major => "MAJOR",
            Mode::Minor => "MINOR",
            Mode::Mixolydian => "MIXOLYDIAN",
            Mode::Dorian => "DORIAN",
            Mode::Chromatic => "CHROMATIC",
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: u8) -> Option<Mode> {
        Self::ALL.get(value as usize).copied()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == upper)
            .ok_or_else(|| ModelError::UnknownMode(s.to_string()))
    }
}

// ============================================================================
// Pitch bend
// ============================================================================

/// MIDI status byte for pitch-bend; stored as the "true pitch-bend" sentinel.
pub const MIDI_PITCH_BEND: u8 = 0xE0;

/// Sentinel meaning the pitch-bend sensor is switched off.
pub const PITCH_BEND_DISABLED: u8 = 255;

/// Highest CC number a pitch-bend sensor may drive.
pub const MAX_CC: u8 = 127;

/// Raw pitch-bend byte. All behaviour is derived from this one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PitchBend(pub u8);

/// What the pitch-bend sensor does, decoded from [`PitchBend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PitchBendKind {
    /// Sends real MIDI pitch-bend messages.
    TrueBend,
    /// Sensor disabled.
    Disabled,
    /// Drives the given CC number.
    ControlChange(u8),
}

impl PitchBend {
    pub const TRUE_BEND: PitchBend = PitchBend(MIDI_PITCH_BEND);
    pub const DISABLED: PitchBend = PitchBend(PITCH_BEND_DISABLED);

    pub fn control_change(cc: u8) -> Result<PitchBend, ModelError> {
        if cc > MAX_CC {
            return Err(ModelError::OutOfRange {
                parameter: "pitchbend",
                value: cc as i64,
                min: 0,
                max: MAX_CC as i64,
            });
        }
        Ok(PitchBend(cc))
    }

    pub fn kind(self) -> PitchBendKind {
        match self.0 {
            MIDI_PITCH_BEND => PitchBendKind::TrueBend,
            PITCH_BEND_DISABLED => PitchBendKind::Disabled,
            cc => PitchBendKind::ControlChange(cc),
        }
    }

    /// Derived: anything but the disabled sentinel counts as enabled.
    pub fn is_enabled(self) -> bool {
        self.kind() != PitchBendKind::Disabled
    }

    /// Derived: enabled and not acting as a true pitch-bend.
    pub fn is_cc(self) -> bool {
        matches!(self.kind(), PitchBendKind::ControlChange(_))
    }

    /// Whether a client may send this value: a sentinel, or a CC in 0..=127.
    pub fn is_settable(self) -> bool {
        match self.kind() {
            PitchBendKind::ControlChange(cc) => cc <= MAX_CC,
            _ => true,
        }
    }
}

impl fmt::Display for PitchBend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            PitchBendKind::TrueBend => f.write_str("pitch bend"),
            PitchBendKind::Disabled => f.write_str("disabled"),
            PitchBendKind::ControlChange(cc) => write!(f, "CC#{}", cc),
        }
    }
}

impl FromStr for PitchBend {
    type Err = ModelError;

    /// Accepts `bend`, `off`, or a CC number 0..=127. The raw sentinels 224
    /// and 255 are also accepted as numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bend" | "pitchbend" => Ok(PitchBend::TRUE_BEND),
            "off" | "disabled" => Ok(PitchBend::DISABLED),
            other => {
                let value: u8 = other.parse().map_err(|_| ModelError::NotANumber {
                    parameter: "pitchbend",
                    value: s.to_string(),
                })?;
                match value {
                    MIDI_PITCH_BEND | PITCH_BEND_DISABLED => Ok(PitchBend(value)),
                    cc => PitchBend::control_change(cc),
                }
            }
        }
    }
}

// ============================================================================
// Enable flag
// ============================================================================

/// `enable` travels as the strings "TRUE"/"FALSE".
pub(crate) mod enable_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub const TRUE_STR: &str = "TRUE";
    pub const FALSE_STR: &str = "FALSE";

    pub fn to_word(enabled: bool) -> &'static str {
        if enabled {
            TRUE_STR
        } else {
            FALSE_STR
        }
    }

    /// Older firmware answered "True"/"False", so matching ignores case.
    pub fn from_word(word: &str) -> Option<bool> {
        if word.eq_ignore_ascii_case(TRUE_STR) {
            Some(true)
        } else if word.eq_ignore_ascii_case(FALSE_STR) {
            Some(false)
        } else {
            None
        }
    }

    pub fn serialize<S: Serializer>(enabled: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(to_word(*enabled))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let word = String::deserialize(deserializer)?;
        from_word(&word).ok_or_else(|| {
            serde::de::Error::custom(format!("expected \"TRUE\" or \"FALSE\", got \"{}\"", word))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_note_pitch_classes() {
        assert_eq!(RootNote::C.pitch_class(), 0);
        assert_eq!(RootNote::FSharp.pitch_class(), 6);
        assert_eq!(RootNote::B.pitch_class(), 11);
        assert_eq!(RootNote::Unknown.pitch_class(), 255);
        assert_eq!(RootNote::from_pitch_class(10), RootNote::ASharp);
        assert_eq!(RootNote::from_pitch_class(42), RootNote::Unknown);
    }

    #[test]
    fn test_root_note_parse_rejects_sentinel() {
        assert_eq!("c#".parse::<RootNote>().unwrap(), RootNote::CSharp);
        assert_eq!("G".parse::<RootNote>().unwrap(), RootNote::G);
        assert!("Unknown".parse::<RootNote>().is_err());
        assert!("H".parse::<RootNote>().is_err());
    }

    #[test]
    fn test_octave_semitones() {
        assert_eq!(Octave::MinusOne.semitones(), 0);
        assert_eq!(Octave::One.semitones(), 24);
        assert_eq!(Octave::Four.semitones(), 60);
        assert_eq!(Octave::from_semitones(36).unwrap(), Octave::Two);
        assert_eq!(Octave::from_semitones(255).unwrap(), Octave::Unknown);
        assert!(Octave::from_semitones(13).is_err());
        assert!(Octave::from_semitones(72).is_err());
        assert_eq!(Octave::from_label("-1").unwrap(), Octave::MinusOne);
    }

    #[test]
    fn test_octave_serde_is_numeric() {
        assert_eq!(serde_json::to_string(&Octave::One).unwrap(), "24");
        let parsed: Octave = serde_json::from_str("48").unwrap();
        assert_eq!(parsed, Octave::Three);
        assert!(serde_json::from_str::<Octave>("50").is_err());
    }

    #[test]
    fn test_mode_ordinals() {
        for (i, mode) in Mode::ALL.iter().enumerate() {
            assert_eq!(mode.ordinal() as usize, i);
            assert_eq!(Mode::from_ordinal(i as u8), Some(*mode));
        }
        assert_eq!("dorian".parse::<Mode>().unwrap(), Mode::Dorian);
        assert!("LYDIAN".parse::<Mode>().is_err());
    }

    #[test]
    fn test_pitchbend_sentinels() {
        assert_eq!(PitchBend(224).kind(), PitchBendKind::TrueBend);
        assert_eq!(PitchBend(255).kind(), PitchBendKind::Disabled);
        assert_eq!(PitchBend(60).kind(), PitchBendKind::ControlChange(60));
    }

    #[test]
    fn test_pitchbend_classification_is_exhaustive_and_exclusive() {
        for raw in 0..=255u8 {
            let pb = PitchBend(raw);
            let kind = pb.kind();
            let matches = [
                kind == PitchBendKind::TrueBend,
                kind == PitchBendKind::Disabled,
                matches!(kind, PitchBendKind::ControlChange(_)),
            ];
            assert_eq!(matches.iter().filter(|m| **m).count(), 1, "value {}", raw);
            assert_eq!(pb.is_enabled(), raw != 255);
            assert_eq!(pb.is_cc(), raw != 224 && raw != 255);
            if let PitchBendKind::ControlChange(cc) = kind {
                assert_eq!(cc, raw);
            }
        }
    }

    #[test]
    fn test_pitchbend_parse() {
        assert_eq!("bend".parse::<PitchBend>().unwrap(), PitchBend::TRUE_BEND);
        assert_eq!("off".parse::<PitchBend>().unwrap(), PitchBend::DISABLED);
        assert_eq!("224".parse::<PitchBend>().unwrap(), PitchBend::TRUE_BEND);
        assert_eq!("60".parse::<PitchBend>().unwrap(), PitchBend(60));
        assert!("128".parse::<PitchBend>().is_err());
        assert!("wobble".parse::<PitchBend>().is_err());
    }

    #[test]
    fn test_enable_words() {
        assert_eq!(enable_flag::from_word("TRUE"), Some(true));
        assert_eq!(enable_flag::from_word("False"), Some(false));
        assert_eq!(enable_flag::from_word("yes"), None);
    }
}
