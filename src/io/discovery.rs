// src/io/discovery.rs
//
// Finding a paddle: enumerate candidate ports for the host, probe each with
// the ping handshake, and keep scanning with a fixed backoff until one
// answers.

use std::time::Duration;

use tracing::{debug, info};

use super::codec;
use super::error::{IoError, Result};
use super::transport::Transport;

/// Connection state reported to the caller while discovering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A full scan found nothing; another pass follows after the backoff.
    Waiting { pass: usize },
    Connected(String),
    /// An established link failed; discovery is starting over.
    Lost,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Waiting { .. } => f.write_str("waiting for connection"),
            ConnectionStatus::Connected(port) => write!(f, "connected on {}", port),
            ConnectionStatus::Lost => f.write_str("connection lost, reconnecting"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiscoveryOptions {
    /// Probe only this port instead of enumerating.
    pub port_override: Option<String>,
    /// Per-read timeout while probing.
    pub probe_timeout: Duration,
    /// Upper bound on one whole handshake, so a chatty port cannot stall
    /// the scan.
    pub handshake_deadline: Duration,
    /// Pause between scan passes.
    pub backoff: Duration,
    /// Give up after this many passes; `None` scans forever.
    pub max_passes: Option<usize>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            port_override: None,
            probe_timeout: Duration::from_millis(500),
            handshake_deadline: Duration::from_secs(3),
            backoff: Duration::from_secs(1),
            max_passes: None,
        }
    }
}

/// Source of candidate ports and the means to open them.
pub trait PortOpener {
    /// Candidate port names for this host, in probe order.
    fn candidates(&self) -> Result<Vec<String>>;

    /// Open `port` with the given per-read timeout.
    fn open(&self, port: &str, timeout: Duration) -> Result<Box<dyn Transport>>;
}

/// Real serial ports of the host.
pub struct SystemPorts {
    pub baud_rate: u32,
}

impl Default for SystemPorts {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
        }
    }
}

impl PortOpener for SystemPorts {
    fn candidates(&self) -> Result<Vec<String>> {
        system_candidates()
    }

    #[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
    fn open(&self, port: &str, timeout: Duration) -> Result<Box<dyn Transport>> {
        let transport = super::serial::SerialTransport::open(port, self.baud_rate, timeout)?;
        Ok(Box::new(transport))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    fn open(&self, _port: &str, _timeout: Duration) -> Result<Box<dyn Transport>> {
        Err(unsupported())
    }
}

#[cfg(target_os = "windows")]
fn system_candidates() -> Result<Vec<String>> {
    Ok(super::serial::list_serial_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

#[cfg(target_os = "linux")]
fn system_candidates() -> Result<Vec<String>> {
    // `tty?*` needs at least one character after "tty", which skips the
    // controlling terminal /dev/tty.
    let paths = glob::glob("/dev/tty?*")
        .map_err(|e| IoError::configuration(format!("bad device pattern: {}", e)))?;
    Ok(paths
        .filter_map(|entry| entry.ok())
        .map(|path| path.to_string_lossy().into_owned())
        .collect())
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
fn system_candidates() -> Result<Vec<String>> {
    Err(unsupported())
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
fn unsupported() -> IoError {
    IoError::PlatformUnsupported {
        platform: std::env::consts::OS.to_string(),
    }
}

/// Open `port`, run the handshake, and close it again.
pub fn probe(opener: &dyn PortOpener, port: &str, options: &DiscoveryOptions) -> Result<()> {
    let mut transport = opener.open(port, options.probe_timeout)?;
    codec::handshake(&mut transport, options.handshake_deadline)
}

/// One scan pass. Returns the first port that passes the handshake.
pub fn discover_once(opener: &dyn PortOpener, options: &DiscoveryOptions) -> Result<Option<String>> {
    let candidates = match &options.port_override {
        Some(port) => vec![port.clone()],
        None => opener.candidates()?,
    };

    for port in candidates {
        match probe(opener, &port, options) {
            Ok(()) => {
                info!("paddle found on {}", port);
                return Ok(Some(port));
            }
            Err(e) => debug!("{}: not a paddle ({})", port, e),
        }
    }
    Ok(None)
}

/// Scan until a paddle answers, reporting each empty pass.
///
/// `PlatformUnsupported` is returned immediately. With `max_passes` set, a
/// `Connection` error is returned once they are used up.
pub fn discover(
    opener: &dyn PortOpener,
    options: &DiscoveryOptions,
    on_status: &mut dyn FnMut(&ConnectionStatus),
) -> Result<String> {
    let mut pass = 0;
    loop {
        pass += 1;
        if let Some(port) = discover_once(opener, options)? {
            on_status(&ConnectionStatus::Connected(port.clone()));
            return Ok(port);
        }

        on_status(&ConnectionStatus::Waiting { pass });
        if options.max_passes.is_some_and(|max| pass >= max) {
            return Err(IoError::connection(
                "discovery",
                format!("no paddle found after {} passes", pass),
            ));
        }
        std::thread::sleep(options.backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StubLink;
    use crate::io::transport::mock::ScriptedTransport;
    use std::cell::RefCell;
    use std::time::Instant;

    /// Streams NMEA sentences forever, like a GPS on a USB serial adapter.
    struct Gps;

    impl Transport for Gps {
        fn name(&self) -> &str {
            "gps"
        }

        fn write_all(&mut self, _bytes: &[u8]) -> std::io::Result<()> {
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let sentence = b"$GPGGA,0\r\n";
            let n = buf.len().min(sentence.len());
            buf[..n].copy_from_slice(&sentence[..n]);
            Ok(n)
        }

        fn clear(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Ports named "paddle*" have a stub behind them, "gps*" never stop
    /// talking, "busy*" fail to open; the rest stay silent.
    struct FakePorts {
        ports: Vec<String>,
        opened: RefCell<Vec<String>>,
    }

    impl FakePorts {
        fn new(ports: &[&str]) -> Self {
            Self {
                ports: ports.iter().map(|p| p.to_string()).collect(),
                opened: RefCell::new(Vec::new()),
            }
        }
    }

    impl PortOpener for FakePorts {
        fn candidates(&self) -> Result<Vec<String>> {
            Ok(self.ports.clone())
        }

        fn open(&self, port: &str, _timeout: Duration) -> Result<Box<dyn Transport>> {
            self.opened.borrow_mut().push(port.to_string());
            if port.starts_with("paddle") {
                Ok(Box::new(StubLink::new()))
            } else if port.starts_with("gps") {
                Ok(Box::new(Gps))
            } else if port.starts_with("busy") {
                Err(IoError::connection(port, "device busy"))
            } else {
                Ok(Box::new(ScriptedTransport::new()))
            }
        }
    }

    struct NoEnumeration;

    impl PortOpener for NoEnumeration {
        fn candidates(&self) -> Result<Vec<String>> {
            Err(IoError::PlatformUnsupported {
                platform: "plan9".to_string(),
            })
        }

        fn open(&self, port: &str, _timeout: Duration) -> Result<Box<dyn Transport>> {
            Err(IoError::connection(port, "not reachable"))
        }
    }

    fn quick() -> DiscoveryOptions {
        DiscoveryOptions {
            handshake_deadline: Duration::from_millis(100),
            backoff: Duration::from_millis(1),
            max_passes: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_passing_port_wins() {
        let ports = FakePorts::new(&["/dev/ttyS0", "busy0", "paddle0", "paddle1"]);
        let found = discover_once(&ports, &quick()).unwrap();
        assert_eq!(found.as_deref(), Some("paddle0"));
        assert_eq!(*ports.opened.borrow(), vec!["/dev/ttyS0", "busy0", "paddle0"]);
    }

    #[test]
    fn test_streaming_port_does_not_stall_scan() {
        let ports = FakePorts::new(&["gps0", "paddle0"]);
        let started = Instant::now();
        let found = discover_once(&ports, &quick()).unwrap();
        assert_eq!(found.as_deref(), Some("paddle0"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_unsupported_platform_is_fatal() {
        let options = DiscoveryOptions {
            backoff: Duration::from_secs(10),
            max_passes: None,
            ..quick()
        };
        let mut statuses = Vec::new();
        let started = Instant::now();
        let err = discover(&NoEnumeration, &options, &mut |s| statuses.push(s.clone())).unwrap_err();
        assert!(matches!(err, IoError::PlatformUnsupported { .. }), "{:?}", err);
        assert!(statuses.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_waiting_reported_each_pass() {
        let ports = FakePorts::new(&["/dev/ttyS0"]);
        let mut statuses = Vec::new();
        let err = discover(&ports, &quick(), &mut |s| statuses.push(s.clone())).unwrap_err();
        assert!(matches!(err, IoError::Connection { .. }));
        assert_eq!(
            statuses,
            vec![ConnectionStatus::Waiting { pass: 1 }, ConnectionStatus::Waiting { pass: 2 }]
        );
    }

    #[test]
    fn test_port_override_skips_enumeration() {
        let ports = FakePorts::new(&["paddle0"]);
        let options = DiscoveryOptions {
            port_override: Some("paddle-override".to_string()),
            ..quick()
        };
        let mut statuses = Vec::new();
        let port = discover(&ports, &options, &mut |s| statuses.push(s.clone())).unwrap();
        assert_eq!(port, "paddle-override");
        assert_eq!(*ports.opened.borrow(), vec!["paddle-override"]);
        assert_eq!(statuses, vec![ConnectionStatus::Connected("paddle-override".into())]);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ConnectionStatus::Waiting { pass: 3 }.to_string(), "waiting for connection");
        assert_eq!(ConnectionStatus::Lost.to_string(), "connection lost, reconnecting");
    }
}
