// src/device/mod.rs
//
// Stub paddle: the device side of the configuration protocol, used for
// development without hardware and as the peer in integration tests.

mod commands;
mod control;
mod interpreter;
mod link;
mod nvram;

pub use commands::DeviceCommand;
pub use control::{ControlCommand, ControlSocket, DEFAULT_CONTROL_ADDR, HELP_TEXT};
pub use interpreter::{DeviceState, StubPaddle, PONG_LINE, PROMPT_LINE, STUB_VERSION};
pub use link::StubLink;
pub use nvram::{base_address, NvramImage, Version, NVRAM_SIZE};
