// src/io/mod.rs
//
// Byte-level plumbing between the host and a paddle: the transport seam,
// the line codec, serial ports, and discovery.

pub mod codec;
mod discovery;
mod error;
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub mod serial;
pub(crate) mod transport;

pub use codec::{PaddleCodec, ResponseDecoder, DEFAULT_RESPONSE_DEADLINE};
pub use discovery::{
    discover, discover_once, probe, ConnectionStatus, DiscoveryOptions, PortOpener, SystemPorts,
};
pub use error::{IoError, Result};
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub use serial::{list_serial_ports, SerialPortInfo, SerialTransport};
pub use transport::{shared, SharedTransport, Transport};
