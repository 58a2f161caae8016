// src/cli.rs
//
// `paddlecfg` command line: discover a paddle and read or change its
// configuration.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::heartbeat::{Heartbeat, HeartbeatEvent};
use crate::io::{self, ConnectionStatus, IoError, SystemPorts};
use crate::logging;
use crate::model::{Channel, ChannelConfig, ModelError, Parameter};
use crate::profile::{self, ProfileError};
use crate::session::{self, Session};
use crate::settings::{self, AppSettings, SettingsError};

#[derive(Debug, Parser)]
#[command(name = "paddlecfg", version, about = "Configure a Paddle MIDI controller over its serial console")]
struct Cli {
    /// Use this serial port instead of scanning
    #[arg(long, global = true)]
    port: Option<String>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List serial ports reported by the OS
    Ports,
    /// Scan for a paddle and print its port
    Discover,
    /// Print the paddle's identification string
    About,
    /// Print the configuration of one or all channels
    Show {
        #[arg(long)]
        channel: Option<Channel>,
    },
    /// Set one parameter of one channel
    Set {
        channel: Channel,
        parameter: Parameter,
        value: String,
    },
    /// Restore factory defaults on all channels
    Defaults,
    /// Save the paddle's configuration to a .ptc profile
    Save { file: PathBuf },
    /// Push a .ptc profile to the paddle
    Load { file: PathBuf },
    /// Monitor the connection, reconnecting when it drops
    Watch,
    /// Tell the paddle to leave configuration mode
    Exit,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Entry point for the `paddlecfg` binary.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if settings.file_logging {
        if let Err(e) = logging::init_file_logging(PathBuf::from(&settings.reports_dir).as_path()) {
            warn!("file logging disabled: {}", e);
        }
    }

    let result = execute(cli.command, &settings);
    logging::stop_file_logging();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<AppSettings, SettingsError> {
    let path = match &cli.settings {
        Some(path) => path.clone(),
        None => settings::settings_path()?,
    };
    let mut settings = settings::load_settings(&path)?;
    if let Some(port) = &cli.port {
        settings.port = Some(port.clone());
    }
    Ok(settings)
}

fn connect(settings: &AppSettings) -> Result<Session, IoError> {
    let opener = SystemPorts {
        baud_rate: settings.baud_rate,
    };
    session::connect(
        &opener,
        &settings.discovery_options(),
        &settings.session_options(),
        &mut |status| match status {
            ConnectionStatus::Connected(_) => info!("{}", status),
            _ => warn!("{}", status),
        },
    )
}

fn execute(command: Command, settings: &AppSettings) -> Result<(), CliError> {
    match command {
        Command::Ports => list_ports(),
        Command::Discover => {
            let opener = SystemPorts {
                baud_rate: settings.baud_rate,
            };
            let port = io::discover(&opener, &settings.discovery_options(), &mut |status| {
                info!("{}", status)
            })?;
            println!("{}", port);
            Ok(())
        }
        Command::About => {
            let session = connect(settings)?;
            match session.about()? {
                Some(text) => println!("{}", text),
                None => println!("(no identification reported)"),
            }
            Ok(())
        }
        Command::Show { channel } => {
            let session = connect(settings)?;
            print_config(&session, channel);
            Ok(())
        }
        Command::Set {
            channel,
            parameter,
            value,
        } => {
            let value = parameter.parse_value(&value)?;
            let mut session = connect(settings)?;
            session.set_parameter(channel, value)?;
            print_config(&session, Some(channel));
            Ok(())
        }
        Command::Defaults => {
            let mut session = connect(settings)?;
            session.restore_defaults()?;
            print_config(&session, None);
            Ok(())
        }
        Command::Save { file } => {
            let path = settings.profile_path(&profile::with_profile_extension(&file));
            let session = connect(settings)?;
            if let Some(snapshot) = session.snapshot() {
                profile::save_profile(&path, &snapshot.channels)?;
                println!("saved {}", path.display());
            }
            Ok(())
        }
        Command::Load { file } => {
            let path = settings.profile_path(&profile::with_profile_extension(&file));
            let configs = profile::load_profile(&path)?;
            let mut session = connect(settings)?;
            session.apply_profile(&configs)?;
            print_config(&session, None);
            Ok(())
        }
        Command::Watch => watch(settings),
        Command::Exit => {
            let session = connect(settings)?;
            session.quit()?;
            Ok(())
        }
    }
}

#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
fn list_ports() -> Result<(), CliError> {
    for port in io::list_serial_ports()? {
        let detail = match (&port.manufacturer, &port.product) {
            (Some(m), Some(p)) => format!(" ({} {})", m, p),
            (None, Some(p)) | (Some(p), None) => format!(" ({})", p),
            (None, None) => String::new(),
        };
        println!("{}\t{}{}", port.port_name, port.port_type, detail);
    }
    Ok(())
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn list_ports() -> Result<(), CliError> {
    Err(IoError::PlatformUnsupported {
        platform: std::env::consts::OS.to_string(),
    }
    .into())
}

/// Heartbeat monitor. Runs until interrupted; reconnects after every drop.
fn watch(settings: &AppSettings) -> Result<(), CliError> {
    loop {
        let session = connect(settings)?;
        println!("connected on {}", session.port());

        let (tx, rx) = mpsc::channel();
        let heartbeat = Heartbeat::spawn(session.transport(), settings.heartbeat_options(), tx);

        for event in rx.iter() {
            match event {
                HeartbeatEvent::Connected { beats } => info!("heartbeat ok after {} beats", beats),
                HeartbeatEvent::Missed {
                    consecutive,
                    allowed,
                } => warn!("heartbeat missed ({}/{})", consecutive, allowed),
                HeartbeatEvent::Disconnected { reason } => {
                    warn!("{} ({})", ConnectionStatus::Lost, reason);
                    break;
                }
            }
        }
        heartbeat.stop();
    }
}

fn print_config(session: &Session, only: Option<Channel>) {
    let Some(snapshot) = session.snapshot() else {
        println!("(no configuration loaded)");
        return;
    };

    println!("current channel: {}", snapshot.current);
    println!(
        "{:<8} {:<6} {:<7} {:<6} {:<10} {:>4} {:>4} {:>4} {:>7}  {}",
        "CHANNEL", "ENABLE", "ROOT", "OCTAVE", "MODE", "OFF1", "OFF2", "OFF3", "CONTROL", "PITCHBEND"
    );
    for (channel, config) in snapshot.channels.iter() {
        if only.is_some_and(|c| c != channel) {
            continue;
        }
        println!("{}", format_row(channel, config));
    }
}

fn format_row(channel: Channel, config: &ChannelConfig) -> String {
    format!(
        "{:<8} {:<6} {:<7} {:<6} {:<10} {:>4} {:>4} {:>4} {:>7}  {}",
        channel.name(),
        if config.enabled { "on" } else { "off" },
        config.root_note.name(),
        config.octave.label(),
        config.mode.name(),
        config.offset1,
        config.offset2,
        config.offset3,
        config.control,
        config.pitchbend,
    )
}
