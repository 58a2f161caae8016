// src/io/transport.rs
//
// Byte-link abstraction. A serial port, the in-memory stub link, and the
// scripted test link all sit behind `Transport`.

use std::io::ErrorKind;
use std::sync::{Arc, Mutex};

use super::error::{IoError, Result};

/// A bidirectional byte link to a paddle (or to a host, for the stub).
pub trait Transport: Send {
    /// Port name used in logs and errors.
    fn name(&self) -> &str;

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Read whatever is available. `Ok(0)` or a `TimedOut`/`WouldBlock`
    /// error both mean "nothing arrived within the read timeout".
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Discard pending input and output.
    fn clear(&mut self) -> std::io::Result<()>;
}

impl Transport for Box<dyn Transport> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        (**self).write_all(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read(buf)
    }

    fn clear(&mut self) -> std::io::Result<()> {
        (**self).clear()
    }
}

/// Transport shared between a session and its heartbeat.
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

pub fn shared(transport: Box<dyn Transport>) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}

/// Read timeouts are not failures.
pub(crate) fn is_idle(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}

/// Read one byte, mapping idle reads to `None` and anything else to
/// `TransportLost`.
pub(crate) fn read_byte<T: Transport + ?Sized>(transport: &mut T) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match transport.read(&mut byte) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(byte[0])),
        Err(e) if is_idle(&e) => Ok(None),
        Err(e) => Err(IoError::lost(transport.name(), e)),
    }
}

pub(crate) fn write<T: Transport + ?Sized>(transport: &mut T, bytes: &[u8]) -> Result<()> {
    transport
        .write_all(bytes)
        .map_err(|e| IoError::lost(transport.name(), e))
}

pub(crate) fn clear<T: Transport + ?Sized>(transport: &mut T) -> Result<()> {
    transport
        .clear()
        .map_err(|e| IoError::lost(transport.name(), e))
}

/// Lock a shared transport, treating a poisoned lock as a lost link.
pub(crate) fn lock(
    transport: &SharedTransport,
) -> Result<std::sync::MutexGuard<'_, Box<dyn Transport>>> {
    transport.lock().map_err(|_| {
        IoError::lost(
            "transport",
            std::io::Error::new(ErrorKind::Other, "transport lock poisoned"),
        )
    })
}

// ============================================================================
// Scripted transport for unit tests
// ============================================================================

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned input and records what was written.
    ///
    /// Each `respond` entry is released into the input queue after the next
    /// write, which models a device answering a command.
    #[derive(Default)]
    pub struct ScriptedTransport {
        pub input: VecDeque<u8>,
        pub written: Vec<u8>,
        pub responses: VecDeque<Vec<u8>>,
        pub fail_reads: bool,
        pub clears: usize,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_input(bytes: &[u8]) -> Self {
            let mut t = Self::new();
            t.input.extend(bytes.iter().copied());
            t
        }

        pub fn respond(mut self, bytes: &[u8]) -> Self {
            self.responses.push_back(bytes.to_vec());
            self
        }
    }

    impl Transport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            self.written.extend_from_slice(bytes);
            if let Some(next) = self.responses.pop_front() {
                self.input.extend(next);
            }
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.fail_reads {
                return Err(std::io::Error::new(ErrorKind::BrokenPipe, "unplugged"));
            }
            let mut n = 0;
            while n < buf.len() {
                match self.input.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }

        fn clear(&mut self) -> std::io::Result<()> {
            self.clears += 1;
            self.input.clear();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::ScriptedTransport;
    use super::*;

    #[test]
    fn test_read_byte_idle_and_lost() {
        let mut t = ScriptedTransport::with_input(b"A");
        assert_eq!(read_byte(&mut t).unwrap(), Some(b'A'));
        assert_eq!(read_byte(&mut t).unwrap(), None);

        t.fail_reads = true;
        let err = read_byte(&mut t).unwrap_err();
        assert!(err.is_transport_lost());
    }

    #[test]
    fn test_idle_kinds() {
        assert!(is_idle(&std::io::Error::from(ErrorKind::TimedOut)));
        assert!(is_idle(&std::io::Error::from(ErrorKind::WouldBlock)));
        assert!(!is_idle(&std::io::Error::from(ErrorKind::BrokenPipe)));
    }
}
