// src/io/codec.rs
//
// Paddle line protocol codec.
//
// Request:  <command>\r  or  <command>=<ARGUMENT>\r
// Response: zero or more lines, then a line equal to the prompt `Paddle>`.
//
// A "line" is the bytes up to and including `\n`, or the bytes collected so
// far once they spell the prompt (the prompt is not newline-terminated).

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::error::{IoError, Result};
use super::transport::{self, Transport};

/// Default bound on how long a response may take to reach its prompt.
pub const DEFAULT_RESPONSE_DEADLINE: Duration = Duration::from_secs(2);

/// Paddle ASCII line codec.
pub struct PaddleCodec;

impl PaddleCodec {
    pub const PROMPT: &'static [u8] = b"Paddle>";
    pub const PING: &'static [u8] = b"paddlePing\r";
    pub const PONG: &'static [u8] = b"paddlePong\r\n";

    pub const CMD_ABOUT: &'static [u8] = b"about\r";
    pub const CMD_ALL_CONFIG: &'static [u8] = b"all_config\r";
    pub const CMD_DEFAULTS: &'static [u8] = b"defaults\r";
    pub const CMD_EXIT: &'static [u8] = b"exit\r";
    pub const CMD_MEM_DUMP: &'static [u8] = b"memDump\r";

    /// Build a request line.
    ///
    /// With an argument the result is `command=ARGUMENT\r` (argument upper-cased).
    /// Without one, `command` is returned as-is; callers pass complete lines
    /// such as [`Self::CMD_ALL_CONFIG`].
    pub fn encode(command: &[u8], argument: Option<&str>) -> Result<Vec<u8>> {
        let Some(argument) = argument else {
            return Ok(command.to_vec());
        };

        if argument.contains('\r') || argument.contains('\n') {
            return Err(IoError::protocol(
                "codec",
                format!("argument for {} contains a line terminator", String::from_utf8_lossy(command)),
            ));
        }
        if command.is_empty() || command.contains(&b'=') || command.contains(&b'\r') {
            return Err(IoError::protocol(
                "codec",
                format!("invalid command name {:?}", String::from_utf8_lossy(command)),
            ));
        }

        let mut line = Vec::with_capacity(command.len() + argument.len() + 2);
        line.extend_from_slice(command);
        line.push(b'=');
        line.extend_from_slice(argument.to_uppercase().as_bytes());
        line.push(b'\r');
        Ok(line)
    }

    /// Decode a complete response given as lines.
    ///
    /// Lines after the prompt are ignored. A response with no prompt is a
    /// protocol error; a response whose body is only whitespace is `None`.
    pub fn decode<L: AsRef<[u8]>>(lines: &[L]) -> Result<Option<String>> {
        let mut decoder = ResponseDecoder::new();
        for line in lines {
            if decoder.push_line(line.as_ref()) {
                return Ok(decoder.finish());
            }
        }
        Err(IoError::protocol("codec", "response ended without a prompt"))
    }
}

// ============================================================================
// Streaming response decoder
// ============================================================================

/// Accumulates response bytes until the prompt line is seen.
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    line: Vec<u8>,
    body: Vec<u8>,
    done: bool,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns true once the prompt has completed the response.
    pub fn push_byte(&mut self, byte: u8) -> bool {
        if self.done {
            return true;
        }
        self.line.push(byte);
        if byte == b'\n' || self.line == PaddleCodec::PROMPT {
            let line = std::mem::take(&mut self.line);
            return self.push_line(&line);
        }
        false
    }

    /// Feed one whole line. Returns true if it was the prompt.
    pub fn push_line(&mut self, line: &[u8]) -> bool {
        if self.done {
            return true;
        }
        if line == PaddleCodec::PROMPT {
            self.done = true;
        } else {
            self.body.extend_from_slice(line);
        }
        self.done
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Body text with the surrounding line breaks removed; `None` when empty.
    pub fn finish(self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim_matches(|c| c == '\r' || c == '\n');
        if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

// ============================================================================
// Transport helpers
// ============================================================================

/// Read one line with the transport's per-read timeout.
///
/// Returns what arrived before the first idle read, which may be empty or a
/// partial line. A port that keeps sending past `until` is a `Timeout`.
pub fn read_line<T: Transport + ?Sized>(transport: &mut T, until: Instant) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    loop {
        if Instant::now() >= until {
            return Err(IoError::timeout(
                transport.name(),
                format!("no line end after {} bytes", line.len()),
            ));
        }
        let Some(byte) = transport::read_byte(transport)? else {
            break;
        };
        line.push(byte);
        if byte == b'\n' || line == PaddleCodec::PROMPT {
            break;
        }
    }
    trace!("{}: line {:?}", transport.name(), String::from_utf8_lossy(&line));
    Ok(line)
}

/// Read a full response, waiting at most `deadline` for the prompt.
///
/// The deadline covers the whole response, so a port that streams without
/// ever sending the prompt still times out.
pub fn read_response<T: Transport + ?Sized>(
    transport: &mut T,
    deadline: Duration,
) -> Result<Option<String>> {
    let started = Instant::now();
    let mut decoder = ResponseDecoder::new();
    loop {
        if started.elapsed() >= deadline {
            return Err(IoError::timeout(
                transport.name(),
                format!("no prompt within {} ms", deadline.as_millis()),
            ));
        }
        if let Some(byte) = transport::read_byte(transport)? {
            if decoder.push_byte(byte) {
                return Ok(decoder.finish());
            }
        }
    }
}

/// Write a request and, unless it is `exit`, read its response.
pub fn send_command<T: Transport + ?Sized>(
    transport: &mut T,
    command: &[u8],
    argument: Option<&str>,
    deadline: Duration,
) -> Result<Option<String>> {
    let line = PaddleCodec::encode(command, argument)?;
    debug!("{}: sending {:?}", transport.name(), String::from_utf8_lossy(&line));
    transport::write(transport, &line)?;

    if line == PaddleCodec::CMD_EXIT {
        return Ok(None);
    }
    read_response(transport, deadline)
}

/// Confirm that a paddle is on the other end of `transport`.
///
/// Any pending output (such as the boot prompt) is read through first. Then
/// `paddlePing` is sent, one line is discarded, and the next line must be
/// exactly `paddlePong\r\n`. The whole exchange must finish within
/// `deadline`.
pub fn handshake<T: Transport + ?Sized>(transport: &mut T, deadline: Duration) -> Result<()> {
    let name = transport.name().to_string();
    let until = Instant::now() + deadline;

    let first = read_line(transport, until)?;
    if !first.is_empty() && first != PaddleCodec::PROMPT {
        drain_to_prompt(transport, until)?;
    }

    transport::write(transport, PaddleCodec::PING)?;
    let _echo = read_line(transport, until)?;
    let reply = read_line(transport, until)?;
    if reply != PaddleCodec::PONG {
        return Err(IoError::protocol(
            &name,
            format!("unexpected ping reply {:?}", String::from_utf8_lossy(&reply)),
        ));
    }

    // The prompt that follows the pong belongs to the ping.
    drain_to_prompt(transport, until)?;
    debug!("{}: handshake ok", name);
    Ok(())
}

/// Read lines until the prompt or an idle read.
fn drain_to_prompt<T: Transport + ?Sized>(transport: &mut T, until: Instant) -> Result<()> {
    loop {
        let line = read_line(transport, until)?;
        if line.is_empty() || line == PaddleCodec::PROMPT {
            return Ok(());
        }
    }
}
