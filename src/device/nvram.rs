// src/device/nvram.rs
//
// 128-byte non-volatile memory image of the paddle, laid out exactly as the
// firmware stores it.
//
//   0x00  header: config mode, version major, minor, bugfix
//   0x10  WHITE     0x20  CYAN     0x30  PURPLE   0x40  BLUE
//   0x50  YELLOW    0x60  GREEN    0x70  RED
//
// Within a channel region:
//   +0 offset1  +1 offset2  +2 offset3  +3 root note  +4 mode
//   +5 enabled  +6 control  +7 octave   +8 pitchbend

use std::fmt::Write as _;

use crate::model::{Channel, ChannelConfig, ChannelConfigs};

pub const NVRAM_SIZE: usize = 128;
pub const ROW_SIZE: usize = 16;

pub const CONFIG_MODE_ADDR: usize = 0x00;
pub const VERSION_MAJOR_ADDR: usize = 0x01;
pub const VERSION_MINOR_ADDR: usize = 0x02;
pub const VERSION_BUGFIX_ADDR: usize = 0x03;

pub const OFFSET1_DELTA: usize = 0;
pub const OFFSET2_DELTA: usize = 1;
pub const OFFSET3_DELTA: usize = 2;
pub const ROOT_NOTE_DELTA: usize = 3;
pub const MODE_DELTA: usize = 4;
pub const ENABLED_DELTA: usize = 5;
pub const CONTROL_DELTA: usize = 6;
pub const OCTAVE_DELTA: usize = 7;
pub const PITCHBEND_DELTA: usize = 8;

/// Base address of a channel's region.
pub fn base_address(channel: Channel) -> usize {
    match channel {
        Channel::White => 0x10,
        Channel::Cyan => 0x20,
        Channel::Purple => 0x30,
        Channel::Blue => 0x40,
        Channel::Yellow => 0x50,
        Channel::Green => 0x60,
        Channel::Red => 0x70,
    }
}

/// Firmware version reported in the header and by `about`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub bugfix: u8,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.bugfix)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NvramImage {
    bytes: [u8; NVRAM_SIZE],
}

impl Default for NvramImage {
    fn default() -> Self {
        Self {
            bytes: [0; NVRAM_SIZE],
        }
    }
}

impl NvramImage {
    pub fn bytes(&self) -> &[u8; NVRAM_SIZE] {
        &self.bytes
    }

    /// Rewrite the whole image from the current state.
    pub fn rebuild(&mut self, config_mode: bool, version: Version, configs: &ChannelConfigs) {
        self.bytes = [0; NVRAM_SIZE];
        self.bytes[CONFIG_MODE_ADDR] = config_mode as u8;
        self.bytes[VERSION_MAJOR_ADDR] = version.major;
        self.bytes[VERSION_MINOR_ADDR] = version.minor;
        self.bytes[VERSION_BUGFIX_ADDR] = version.bugfix;

        for (channel, config) in configs.iter() {
            self.write_channel(base_address(channel), config);
        }
    }

    fn write_channel(&mut self, base: usize, config: &ChannelConfig) {
        let region = &mut self.bytes[base..base + ROW_SIZE];
        region[OFFSET1_DELTA] = config.offset1;
        region[OFFSET2_DELTA] = config.offset2;
        region[OFFSET3_DELTA] = config.offset3;
        region[ROOT_NOTE_DELTA] = config.root_note.pitch_class();
        region[MODE_DELTA] = config.mode.ordinal();
        region[ENABLED_DELTA] = config.enabled as u8;
        region[CONTROL_DELTA] = config.control;
        region[OCTAVE_DELTA] = config.octave.semitones();
        region[PITCHBEND_DELTA] = config.pitchbend.0;
    }

    /// Hex dump, one 16-byte row per line: `0xNN: xx xx .. (hint)`.
    pub fn dump(&self) -> String {
        let mut out = String::from("*** MemDump ***\n");
        for (row, chunk) in self.bytes.chunks(ROW_SIZE).enumerate() {
            let _ = write!(out, "0x{:02x}:", row * ROW_SIZE);
            for byte in chunk {
                let _ = write!(out, " {:02x}", byte);
            }
            let _ = writeln!(out, " ({})", row_hint(row * ROW_SIZE));
        }
        out
    }
}

fn row_hint(address: usize) -> &'static str {
    Channel::ALL
        .iter()
        .find(|c| base_address(**c) == address)
        .map(|c| c.name())
        .unwrap_or("header")
}
