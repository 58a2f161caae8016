// src/model/mod.rs
//
// Paddle configuration data model shared by the client and the stub device.

mod channel;
mod config;
mod values;

pub use channel::{Channel, CHANNEL_COUNT};
pub use config::{
    ChannelConfig, ChannelConfigs, ConfigSnapshot, OffsetSlot, Parameter, ParameterValue,
    MAX_CONTROL, MAX_OFFSET,
};
pub use values::{
    Mode, Octave, PitchBend, PitchBendKind, RootNote, MAX_CC, MIDI_PITCH_BEND,
    PITCH_BEND_DISABLED, UNKNOWN_BYTE,
};
pub(crate) use values::enable_flag;

use thiserror::Error;

/// Rejected user or device input for a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown channel \"{0}\" (expected one of BLUE, CYAN, GREEN, PURPLE, RED, YELLOW, WHITE)")]
    UnknownChannel(String),

    #[error("unknown root note \"{0}\"")]
    UnknownRootNote(String),

    #[error("unknown mode \"{0}\" (expected MAJOR, MINOR, MIXOLYDIAN, DORIAN or CHROMATIC)")]
    UnknownMode(String),

    #[error("invalid octave \"{0}\"")]
    InvalidOctave(String),

    #[error("invalid enable flag \"{0}\" (expected TRUE or FALSE)")]
    InvalidEnable(String),

    #[error("{parameter} value {value} is out of range {min}..={max}")]
    OutOfRange {
        parameter: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{parameter} expects a number, got \"{value}\"")]
    NotANumber {
        parameter: &'static str,
        value: String,
    },

    #[error("unknown parameter \"{0}\"")]
    UnknownParameter(String),

    #[error("configuration for channel {0} is missing")]
    MissingChannel(Channel),
}
