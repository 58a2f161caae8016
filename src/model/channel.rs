// src/model/channel.rs
//
// The seven fixed configuration slots of the paddle. They are addressed by
// colour name on the wire and by index 0..6 everywhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ModelError;

/// Number of configuration channels on every paddle.
pub const CHANNEL_COUNT: usize = 7;

/// One of the seven logical configuration slots.
///
/// Declaration order is the wire index order and also the `Ord` order, so
/// maps keyed by `Channel` iterate BLUE first and WHITE last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Blue,
    Cyan,
    Green,
    Purple,
    Red,
    Yellow,
    White,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Blue,
        Channel::Cyan,
        Channel::Green,
        Channel::Purple,
        Channel::Red,
        Channel::Yellow,
        Channel::White,
    ];

    /// Index 0..6 of this channel.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Channel> {
        Self::ALL.get(index).copied()
    }

    /// Wire name, as accepted by the `color=` command.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Blue => "BLUE",
            Channel::Cyan => "CYAN",
            Channel::Green => "GREEN",
            Channel::Purple => "PURPLE",
            Channel::Red => "RED",
            Channel::Yellow => "YELLOW",
            Channel::White => "WHITE",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = ModelError;

    /// Channel names are matched case-insensitively so CLI input like
    /// `purple` works; the device itself only ever sees the uppercase form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == upper)
            .ok_or_else(|| ModelError::UnknownChannel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_indices_are_stable() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
            assert_eq!(Channel::from_index(i), Some(*channel));
        }
        assert_eq!(Channel::from_index(7), None);
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("PURPLE".parse::<Channel>().unwrap(), Channel::Purple);
        assert_eq!("white".parse::<Channel>().unwrap(), Channel::White);
        assert!("MAGENTA".parse::<Channel>().is_err());
        assert!("".parse::<Channel>().is_err());
    }

    #[test]
    fn test_channel_serde_uses_wire_names() {
        let json = serde_json::to_string(&Channel::Yellow).unwrap();
        assert_eq!(json, "\"YELLOW\"");
        let back: Channel = serde_json::from_str("\"CYAN\"").unwrap();
        assert_eq!(back, Channel::Cyan);
    }
}
