// src/lib.rs
//
// Paddle configuration library: the serial line protocol, a client session
// with a configuration mirror and heartbeat, and a stub device that speaks
// the same protocol.

pub mod device;
pub mod heartbeat;
pub mod io;
pub mod logging;
pub mod model;
pub mod profile;
pub mod session;
pub mod settings;

#[cfg(feature = "cli")]
mod cli;

#[cfg(feature = "cli")]
pub use cli::run;

pub use session::{connect, Session, SessionOptions};
