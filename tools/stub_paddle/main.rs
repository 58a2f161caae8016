// tools/stub_paddle/main.rs
//
// Stub paddle on a real serial port. Pair it with the client through a
// virtual port pair (com0com, socat) to work without hardware.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use paddle_lib::device::{ControlSocket, StubPaddle, DEFAULT_CONTROL_ADDR};
use paddle_lib::logging;

#[derive(Debug, Parser)]
#[command(name = "stub_paddle", version, about = "Emulate a Paddle on a serial port")]
struct Args {
    /// Serial port to listen on (default: first port the OS reports)
    #[arg(long)]
    port: Option<String>,

    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// UDP address of the control socket
    #[arg(long, default_value = DEFAULT_CONTROL_ADDR)]
    control: String,

    /// Do not open the control socket
    #[arg(long)]
    no_control: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    match serve(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
fn serve(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    use paddle_lib::io::{list_serial_ports, SerialTransport};
    use std::time::Duration;

    let port = match &args.port {
        Some(port) => port.clone(),
        None => list_serial_ports()?
            .into_iter()
            .next()
            .map(|p| p.port_name)
            .ok_or("no serial ports found")?,
    };

    let control = if args.no_control {
        None
    } else {
        Some(ControlSocket::bind(&args.control)?)
    };

    // Short read timeout so the control socket is polled between lines.
    let mut link = SerialTransport::open(&port, args.baud, Duration::from_millis(100))?;
    let mut paddle = StubPaddle::new();
    paddle.serve(&mut link, control.as_ref())?;
    info!("exiting");
    Ok(())
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn serve(_args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    Err(format!("serial ports are not supported on {}", std::env::consts::OS).into())
}
