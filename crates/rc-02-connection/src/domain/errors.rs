//! Connection errors.

use shared_types::{ErrorKind, NameError};
use thiserror::Error;

/// Errors raised while forming or tearing down connections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The two sides carry different payload schemas.
    #[error("Can not connect \"{first}\" ({first_type}) with \"{second}\" ({second_type}): message types differ.")]
    TypeMismatch {
        first: String,
        first_type: String,
        second: String,
        second_type: String,
    },

    /// The interface kinds do not form a producer/consumer or client/provider
    /// pair, or neither side is bound to a container.
    #[error("Interface types {first} and {second} can not be connected.")]
    NotConnectable { first: String, second: String },

    /// Both references name the same interface.
    #[error("Can not connect interface \"{0}\" with itself.")]
    SelfConnection(String),

    /// A connection with the same key is live.
    #[error("Interfaces {0} are already connected.")]
    AlreadyConnected(String),

    /// No connection with the given key.
    #[error("Interfaces {0} are not connected.")]
    NotConnected(String),

    /// An interface was removed while the connection was being formed.
    #[error("Interface \"{0}\" is no longer attached.")]
    InterfaceGone(String),

    /// Malformed `endpoint/interface` reference.
    #[error(transparent)]
    Name(#[from] NameError),
}

impl ConnectionError {
    /// Taxonomy bucket used by the RPC layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InterfaceGone(_) => ErrorKind::Protocol,
            _ => ErrorKind::InvalidRequest,
        }
    }
}

/// Result alias for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;
