// src/io/error.rs
//
// Error type for everything that talks to a paddle over a byte link.

use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum IoError {
    /// The port could not be opened or configured.
    #[error("{device}: connection failed: {message}")]
    Connection { device: String, message: String },

    /// The link failed mid-conversation; the session is no longer usable.
    #[error("{device}: link lost: {source}")]
    TransportLost {
        device: String,
        #[source]
        source: std::io::Error,
    },

    /// No prompt arrived before the response deadline.
    #[error("{device}: timed out: {message}")]
    Timeout { device: String, message: String },

    /// The device sent something the protocol does not allow.
    #[error("{device}: protocol error: {message}")]
    Protocol { device: String, message: String },

    /// A command that must produce a body produced only a prompt.
    #[error("{device}: no response to \"{command}\"")]
    NoResponse { device: String, command: String },

    /// A body arrived but could not be parsed.
    #[error("{device}: malformed response: {message}")]
    MalformedResponse { device: String, message: String },

    /// Device discovery has no strategy for this host.
    #[error("port discovery is not supported on {platform}")]
    PlatformUnsupported { platform: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl IoError {
    pub fn connection(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn lost(device: impl Into<String>, source: std::io::Error) -> Self {
        IoError::TransportLost {
            device: device.into(),
            source,
        }
    }

    pub fn timeout(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Timeout {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn protocol(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Protocol {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn no_response(device: impl Into<String>, command: impl Into<String>) -> Self {
        IoError::NoResponse {
            device: device.into(),
            command: command.into(),
        }
    }

    pub fn malformed(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::MalformedResponse {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        IoError::Configuration(message.into())
    }

    /// True when the session must be torn down and discovery restarted.
    pub fn is_transport_lost(&self) -> bool {
        matches!(self, IoError::TransportLost { .. })
    }
}

pub type Result<T> = std::result::Result<T, IoError>;
