// src/device/link.rs
//
// In-memory transport wired straight into a `StubPaddle`, so a client session
// can be exercised without a serial port pair.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::interpreter::StubPaddle;
use crate::io::Transport;

pub struct StubLink {
    name: String,
    device: Arc<Mutex<StubPaddle>>,
    line: Vec<u8>,
    outbox: VecDeque<u8>,
    unplugged: Arc<AtomicBool>,
}

impl Default for StubLink {
    fn default() -> Self {
        Self::new()
    }
}

impl StubLink {
    /// A freshly booted stub; its boot prompt is already waiting to be read.
    pub fn new() -> Self {
        Self::with_device("stub", Arc::new(Mutex::new(StubPaddle::new())))
    }

    pub fn with_device(name: &str, device: Arc<Mutex<StubPaddle>>) -> Self {
        let banner = match device.lock() {
            Ok(paddle) => paddle.banner().to_vec(),
            Err(_) => Vec::new(),
        };
        Self {
            name: name.to_string(),
            device,
            line: Vec::new(),
            outbox: banner.into(),
            unplugged: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle to the device behind this link.
    pub fn device(&self) -> Arc<Mutex<StubPaddle>> {
        Arc::clone(&self.device)
    }

    /// Flag that, once set, makes every read and write fail.
    pub fn unplug_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.unplugged)
    }

    fn check_plugged(&self) -> std::io::Result<()> {
        if self.unplugged.load(Ordering::SeqCst) {
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "stub unplugged"))
        } else {
            Ok(())
        }
    }
}

impl Transport for StubLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.check_plugged()?;
        for &byte in bytes {
            if byte != b'\r' {
                self.line.push(byte);
                continue;
            }
            let text = String::from_utf8_lossy(&self.line).into_owned();
            self.line.clear();
            let reply = self
                .device
                .lock()
                .map_err(|_| std::io::Error::new(ErrorKind::Other, "stub device poisoned"))?
                .handle_line(&text);
            self.outbox.extend(reply);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.check_plugged()?;
        if self.outbox.is_empty() {
            // Behave like a port with a very short read timeout.
            std::thread::sleep(Duration::from_millis(1));
            return Ok(0);
        }
        let n = buf.len().min(self.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear(&mut self) -> std::io::Result<()> {
        self.check_plugged()?;
        self.outbox.clear();
        self.line.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::codec;

    #[test]
    fn test_link_handshake_against_stub() {
        let mut link = StubLink::new();
        codec::handshake(&mut link, Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn test_unplugged_link_fails() {
        let mut link = StubLink::new();
        link.unplug_handle().store(true, Ordering::SeqCst);
        let mut buf = [0u8; 4];
        assert_eq!(link.read(&mut buf).unwrap_err().kind(), ErrorKind::BrokenPipe);
        assert!(link.write_all(b"about\r").is_err());
    }
}
