// src/device/interpreter.rs
//
// Command interpreter of the stub paddle. Behaves like the firmware's
// configuration console: one CR-terminated line in, optional output plus a
// prompt out.

use tracing::{debug, error, info, warn};

use super::commands::{self, DeviceCommand};
use super::control::{ControlCommand, ControlSocket, HELP_TEXT};
use super::nvram::{NvramImage, Version};
use crate::io::{transport, IoError, Result, Transport};
use crate::model::{
    enable_flag, Channel, ChannelConfigs, ConfigSnapshot, Mode, Octave, OffsetSlot, Parameter,
    ParameterValue, PitchBend, RootNote,
};

/// Emitted at boot and after every handled line.
pub const PROMPT_LINE: &[u8] = b"\r\nPaddle>";
pub const PONG_LINE: &[u8] = b"\r\npaddlePong";

pub const STUB_VERSION: Version = Version {
    major: 0,
    minor: 9,
    bugfix: 9,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    ConfigMode,
    Exited,
}

pub struct StubPaddle {
    configs: ChannelConfigs,
    selected: Channel,
    state: DeviceState,
    version: Version,
    nvram: NvramImage,
}

impl Default for StubPaddle {
    fn default() -> Self {
        Self::new()
    }
}

impl StubPaddle {
    pub fn new() -> Self {
        let mut paddle = Self {
            configs: ChannelConfigs::default(),
            selected: Channel::Blue,
            state: DeviceState::ConfigMode,
            version: STUB_VERSION,
            nvram: NvramImage::default(),
        };
        paddle.sync_nvram();
        paddle
    }

    /// What the device prints when a port opens; silent once it has exited.
    pub fn banner(&self) -> &'static [u8] {
        if self.is_running() {
            PROMPT_LINE
        } else {
            b""
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DeviceState::ConfigMode
    }

    pub fn selected(&self) -> Channel {
        self.selected
    }

    pub fn configs(&self) -> &ChannelConfigs {
        &self.configs
    }

    pub fn nvram(&self) -> &NvramImage {
        &self.nvram
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            current: self.selected,
            channels: self.configs.clone(),
        }
    }

    pub fn about_text(&self) -> String {
        format!("Paddle stub firmware v{} (config mode)", self.version)
    }

    pub fn mem_dump(&self) -> String {
        self.nvram.dump()
    }

    /// Restore every channel to the factory template.
    pub fn reset(&mut self) {
        self.configs.restore_defaults();
        self.sync_nvram();
    }

    fn sync_nvram(&mut self) {
        let config_mode = self.state == DeviceState::ConfigMode;
        self.nvram.rebuild(config_mode, self.version, &self.configs);
    }

    /// Handle one request line (without its `\r`) and return the bytes the
    /// device sends back. After `exit` nothing is returned, ever.
    pub fn handle_line(&mut self, line: &str) -> Vec<u8> {
        if !self.is_running() {
            return Vec::new();
        }

        let line = line.trim_matches(|c| c == '\r' || c == '\n');
        let mut out = Vec::new();
        if !line.is_empty() {
            self.dispatch(line, &mut out);
            self.sync_nvram();
        }

        if self.is_running() {
            out.extend_from_slice(PROMPT_LINE);
        }
        out
    }

    fn dispatch(&mut self, line: &str, out: &mut Vec<u8>) {
        let (name, param) = commands::split_line(line);
        let Some(command) = commands::lookup(name) else {
            warn!("invalid command '{}'", line);
            return;
        };
        debug!("RX '{}' = {:?}", name, param);

        if command.takes_argument() && param.is_none() {
            warn!("'{}' needs an argument", name);
            return;
        }

        match command {
            DeviceCommand::About => {
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(self.about_text().as_bytes());
            }
            DeviceCommand::AllConfig => match serde_json::to_vec(&self.snapshot()) {
                Ok(json) => out.extend_from_slice(&json),
                Err(e) => error!("failed to serialize configuration: {}", e),
            },
            DeviceCommand::Color => {
                let param = param.unwrap_or_default();
                match Channel::ALL.iter().find(|c| c.name() == param) {
                    Some(channel) => {
                        info!("selected channel {}", channel);
                        self.selected = *channel;
                    }
                    None => warn!("provided color '{}' is invalid", param),
                }
            }
            DeviceCommand::Set(parameter) => {
                let param = param.unwrap_or_default();
                match device_value(parameter, param) {
                    Some(value) => self.configs[self.selected].set(value),
                    None => warn!("invalid argument '{}' for {}", param, parameter),
                }
            }
            DeviceCommand::Defaults => {
                info!("restoring defaults");
                self.configs.restore_defaults();
            }
            DeviceCommand::Ping => out.extend_from_slice(PONG_LINE),
            DeviceCommand::MemDump => info!("\n{}", self.mem_dump()),
            DeviceCommand::Exit => {
                info!("exit requested");
                self.state = DeviceState::Exited;
            }
        }
    }

    /// Act on a control-plane command.
    pub fn apply_control(&mut self, command: &ControlCommand) {
        match command {
            ControlCommand::Reset => {
                info!("control: reset to defaults");
                self.reset();
            }
            ControlCommand::MemDump => info!("\n{}", self.mem_dump()),
            ControlCommand::Exit => {
                info!("control: exit");
                self.state = DeviceState::Exited;
            }
            ControlCommand::Help => info!("\n{}", HELP_TEXT),
            ControlCommand::Invalid(input) => {
                error!("invalid control input \"{}\"", input);
                info!("\n{}", HELP_TEXT);
            }
        }
    }

    /// Serve requests on `link` until `exit` arrives on either the link or
    /// the control socket.
    pub fn serve<T: Transport + ?Sized>(
        &mut self,
        link: &mut T,
        control: Option<&ControlSocket>,
    ) -> Result<()> {
        transport::write(link, self.banner())?;
        info!("stub paddle v{} listening on {}", self.version, link.name());

        let mut line = Vec::new();
        while self.is_running() {
            match transport::read_byte(link)? {
                Some(b'\r') => {
                    let text = String::from_utf8_lossy(&line).into_owned();
                    line.clear();
                    let reply = self.handle_line(&text);
                    if !reply.is_empty() {
                        transport::write(link, &reply)?;
                    }
                }
                Some(byte) => line.push(byte),
                None => {}
            }

            if let Some(control) = control {
                match control.poll() {
                    Ok(Some(command)) => self.apply_control(&command),
                    Ok(None) => {}
                    Err(e) => return Err(IoError::lost("control socket", e)),
                }
            }
        }
        info!("stub paddle stopped");
        Ok(())
    }
}

/// Parse a device-side argument. The device is lenient about numeric ranges
/// but only takes octave offsets the firmware can store.
fn device_value(parameter: Parameter, param: &str) -> Option<ParameterValue> {
    let number = || param.trim().parse::<u8>().ok();
    let value = match parameter {
        Parameter::Enable => ParameterValue::Enable(enable_flag::from_word(param)?),
        Parameter::RootNote => ParameterValue::RootNote(param.parse::<RootNote>().ok()?),
        Parameter::Octave => {
            let octave = Octave::from_semitones(number()?).ok()?;
            if octave == Octave::Unknown {
                return None;
            }
            ParameterValue::Octave(octave)
        }
        Parameter::Mode => ParameterValue::Mode(param.parse::<Mode>().ok()?),
        Parameter::Offset1 => ParameterValue::Offset(OffsetSlot::First, number()?),
        Parameter::Offset2 => ParameterValue::Offset(OffsetSlot::Second, number()?),
        Parameter::Offset3 => ParameterValue::Offset(OffsetSlot::Third, number()?),
        Parameter::Control => ParameterValue::Control(number()?),
        Parameter::PitchBend => ParameterValue::PitchBend(PitchBend(number()?)),
    };
    Some(value)
}
