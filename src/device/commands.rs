// src/device/commands.rs
//
// Command table for the stub interpreter.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::model::Parameter;

/// A verb the device understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceCommand {
    About,
    AllConfig,
    Color,
    Set(Parameter),
    Defaults,
    Ping,
    MemDump,
    Exit,
}

impl DeviceCommand {
    /// Whether the verb needs `=<param>`.
    pub fn takes_argument(self) -> bool {
        matches!(self, DeviceCommand::Color | DeviceCommand::Set(_))
    }
}

/// Wire name -> command. Names are case-sensitive like the firmware's.
static COMMAND_TABLE: Lazy<HashMap<&'static str, DeviceCommand>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert("about", DeviceCommand::About);
    table.insert("all_config", DeviceCommand::AllConfig);
    table.insert("color", DeviceCommand::Color);
    table.insert("defaults", DeviceCommand::Defaults);
    table.insert("paddlePing", DeviceCommand::Ping);
    table.insert("memDump", DeviceCommand::MemDump);
    table.insert("exit", DeviceCommand::Exit);
    for parameter in Parameter::ALL {
        table.insert(parameter.command(), DeviceCommand::Set(parameter));
    }
    table
});

pub fn lookup(name: &str) -> Option<DeviceCommand> {
    COMMAND_TABLE.get(name).copied()
}

/// Split a request line on the first `=` into (command, param).
pub fn split_line(line: &str) -> (&str, Option<&str>) {
    match line.split_once('=') {
        Some((command, param)) => (command, Some(param)),
        None => (line, None),
    }
}
