// src/session.rs
//
// Client protocol session: typed operations over a connected paddle and a
// write-through mirror of its configuration.
//
// Every "write command, read until prompt" exchange happens under the
// transport lock, so the heartbeat never interleaves with a command.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::io::codec::{self, PaddleCodec, DEFAULT_RESPONSE_DEADLINE};
use crate::io::transport::{self, SharedTransport};
use crate::io::{
    discover, ConnectionStatus, DiscoveryOptions, IoError, PortOpener, Result, Transport,
};
use crate::model::{Channel, ChannelConfig, ChannelConfigs, ConfigSnapshot, ParameterValue};

/// Timeouts used once a session is established.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Per-read timeout on the port.
    pub read_timeout: Duration,
    /// Bound on the wait for a prompt.
    pub response_deadline: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(50),
            response_deadline: DEFAULT_RESPONSE_DEADLINE,
        }
    }
}

pub struct Session {
    port: String,
    transport: SharedTransport,
    deadline: Duration,
    cache: Option<ConfigSnapshot>,
}

impl Session {
    /// Wrap an already-probed transport. Pending bytes are discarded.
    pub fn new(transport: Box<dyn Transport>, deadline: Duration) -> Result<Self> {
        Self::from_shared(transport::shared(transport), deadline)
    }

    pub fn from_shared(transport: SharedTransport, deadline: Duration) -> Result<Self> {
        let port = {
            let mut guard = transport::lock(&transport)?;
            transport::clear(&mut **guard)?;
            guard.name().to_string()
        };
        Ok(Self {
            port,
            transport,
            deadline,
            cache: None,
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Shared handle for a heartbeat.
    pub fn transport(&self) -> SharedTransport {
        SharedTransport::clone(&self.transport)
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Send one request and return its body.
    pub fn send_command(&self, command: &[u8], argument: Option<&str>) -> Result<Option<String>> {
        let mut guard = transport::lock(&self.transport)?;
        codec::send_command(&mut **guard, command, argument, self.deadline)
    }

    /// Refresh the mirror from `all_config`.
    ///
    /// On a malformed body the previous mirror is kept and the error returned.
    pub fn fetch_all_config(&mut self) -> Result<&ConfigSnapshot> {
        let body = {
            let mut guard = transport::lock(&self.transport)?;
            let first = codec::send_command(&mut **guard, PaddleCodec::CMD_ALL_CONFIG, None, self.deadline)?;
            match first {
                Some(body) => Some(body),
                None => {
                    debug!("{}: empty all_config response, reading again", self.port);
                    match codec::read_response(&mut **guard, self.deadline) {
                        Ok(body) => body,
                        Err(IoError::Timeout { .. }) => None,
                        Err(e) => return Err(e),
                    }
                }
            }
        };

        let body = body.ok_or_else(|| IoError::no_response(&self.port, "all_config"))?;
        let snapshot: ConfigSnapshot = serde_json::from_str(&body).map_err(|e| {
            error!("{}: bad all_config payload: {}", self.port, e);
            IoError::malformed(&self.port, e.to_string())
        })?;

        info!("{}: configuration loaded, current channel {}", self.port, snapshot.current);
        Ok(&*self.cache.insert(snapshot))
    }

    /// Set one field of one channel on the device.
    ///
    /// The value is checked before anything is sent. `color=` is always sent
    /// first; on success the matching cache field is updated.
    pub fn set_parameter(&mut self, channel: Channel, value: ParameterValue) -> Result<()> {
        value.validate()?;
        let parameter = value.parameter();
        let argument = value.wire_argument();

        {
            let mut guard = transport::lock(&self.transport)?;
            let link = &mut **guard;
            expect_no_body(
                &self.port,
                "color",
                codec::send_command(link, b"color", Some(channel.name()), self.deadline)?,
            );
            expect_no_body(
                &self.port,
                parameter.command(),
                codec::send_command(
                    link,
                    parameter.command().as_bytes(),
                    Some(&argument),
                    self.deadline,
                )?,
            );
        }

        debug!("{}: {} {}={}", self.port, channel, parameter, argument);
        if let Some(cache) = self.cache.as_mut() {
            cache.current = channel;
            cache.channels[channel].set(value);
        }
        Ok(())
    }

    /// Factory-reset all channels, then re-read them.
    pub fn restore_defaults(&mut self) -> Result<&ConfigSnapshot> {
        let body = self.send_command(PaddleCodec::CMD_DEFAULTS, None)?;
        expect_no_body(&self.port, "defaults", body);
        self.fetch_all_config()
    }

    pub fn about(&self) -> Result<Option<String>> {
        self.send_command(PaddleCodec::CMD_ABOUT, None)
    }

    /// Ask the device to log its memory image.
    pub fn mem_dump(&self) -> Result<()> {
        let body = self.send_command(PaddleCodec::CMD_MEM_DUMP, None)?;
        expect_no_body(&self.port, "memDump", body);
        Ok(())
    }

    pub fn ping(&self) -> Result<()> {
        ping(&self.transport, self.deadline)
    }

    /// Push every field of every channel in `profile`, then re-read.
    ///
    /// The whole profile is validated first; nothing is sent if any value is
    /// out of range.
    pub fn apply_profile(&mut self, profile: &ChannelConfigs) -> Result<&ConfigSnapshot> {
        for (_, config) in profile.iter() {
            for value in config.values() {
                value.validate()?;
            }
        }
        for (channel, config) in profile.iter() {
            for value in config.values() {
                self.set_parameter(channel, value)?;
            }
        }
        info!("{}: profile applied", self.port);
        self.fetch_all_config()
    }

    /// Send `exit`. No reply is read and the session is consumed.
    pub fn quit(self) -> Result<()> {
        let mut guard = transport::lock(&self.transport)?;
        codec::send_command(&mut **guard, PaddleCodec::CMD_EXIT, None, self.deadline)?;
        info!("{}: exit sent", self.port);
        Ok(())
    }

    pub fn cached(&self, channel: Channel) -> Option<&ChannelConfig> {
        self.cache.as_ref().map(|s| s.get(channel))
    }

    pub fn snapshot(&self) -> Option<&ConfigSnapshot> {
        self.cache.as_ref()
    }
}

/// Firmware acknowledges setters with `SUCCESS: ...`; only an `ERROR`
/// reply is worth a warning.
fn reply_is_error(body: &str) -> bool {
    body.trim_start().starts_with("ERROR")
}

fn expect_no_body(port: &str, command: &str, body: Option<String>) {
    match body {
        Some(body) if reply_is_error(&body) => {
            warn!("{}: {} rejected: {:?}", port, command, body)
        }
        Some(body) => debug!("{}: {} acknowledged: {:?}", port, command, body),
        None => {}
    }
}

/// One ping over a shared transport.
pub fn ping(transport: &SharedTransport, deadline: Duration) -> Result<()> {
    let mut guard = transport::lock(transport)?;
    let name = guard.name().to_string();
    let body = codec::send_command(&mut **guard, PaddleCodec::PING, None, deadline)?;
    match body.as_deref() {
        Some("paddlePong") => Ok(()),
        other => Err(IoError::protocol(name, format!("unexpected ping reply {:?}", other))),
    }
}

/// Discover a paddle, open it, and load its configuration.
///
/// A link lost during start-up reports `ConnectionStatus::Lost` and starts
/// discovery again.
pub fn connect(
    opener: &dyn PortOpener,
    discovery: &DiscoveryOptions,
    options: &SessionOptions,
    on_status: &mut dyn FnMut(&ConnectionStatus),
) -> Result<Session> {
    loop {
        let port = discover(opener, discovery, on_status)?;
        let attempt = opener
            .open(&port, options.read_timeout)
            .and_then(|t| Session::new(t, options.response_deadline))
            .and_then(|mut session| {
                session.fetch_all_config()?;
                Ok(session)
            });

        match attempt {
            Ok(session) => return Ok(session),
            Err(e) if e.is_transport_lost() => {
                warn!("{}: {}", port, e);
                on_status(&ConnectionStatus::Lost);
                std::thread::sleep(discovery.backoff);
            }
            Err(e) => return Err(e),
        }
    }
}
