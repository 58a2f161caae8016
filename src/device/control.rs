// src/device/control.rs
//
// Local UDP control plane for the stub device. Polled between serial lines,
// never blocks.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use tracing::info;

pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:65411";

pub const HELP_TEXT: &str = "stub_paddle control commands:\n\n\
    \treset: Reset config data to defaults\n\
    \tmemDump: Dump the current config in the device memory layout\n\
    \texit: Stop the stub\n\
    \thelp: Print this message\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    Reset,
    MemDump,
    Exit,
    Help,
    Invalid(String),
}

impl ControlCommand {
    pub fn parse(input: &str) -> ControlCommand {
        match input.trim() {
            "reset" => ControlCommand::Reset,
            "memDump" => ControlCommand::MemDump,
            "exit" => ControlCommand::Exit,
            "help" => ControlCommand::Help,
            other => ControlCommand::Invalid(other.to_string()),
        }
    }
}

pub struct ControlSocket {
    socket: UdpSocket,
}

impl ControlSocket {
    pub fn bind(addr: &str) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        info!("control socket listening on {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Next pending datagram, if any. Empty datagrams are skipped.
    pub fn poll(&self) -> std::io::Result<Option<ControlCommand>> {
        let mut buf = [0u8; 256];
        match self.socket.recv_from(&mut buf) {
            Ok((0, _)) => Ok(None),
            Ok((n, from)) => {
                let text = String::from_utf8_lossy(&buf[..n]);
                info!("control: {:?} from {}", text, from);
                Ok(Some(ControlCommand::parse(&text)))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}
