//! Error types for the endpoints subsystem.

use shared_bus::BusError;
use shared_types::{ErrorKind, MessageError, NameError};
use thiserror::Error;

use crate::delivery::DeliveryError;

/// Endpoint subsystem errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// `start` called on a running container
    #[error("Container can be started only once.")]
    AlreadyRunning,

    /// Operation requires a running container
    #[error("Container is not running: can not {action}.")]
    NotRunning { action: &'static str },

    /// Connected flag set twice without an intervening reset
    #[error("Tried to set container to connected which already is registered as connected.")]
    AlreadyConnected,

    /// Operation requires a connected container
    #[error("Container has to be connected before an interface can be {action}.")]
    NotConnected { action: &'static str },

    /// Internal lookup of an interface tag failed
    #[error("Can not {action}. Interface \"{tag}\" does not exist.")]
    UnknownInterface { tag: String, action: &'static str },

    /// Client lookup of an interface tag failed
    #[error("Interface \"{0}\" does not exist.")]
    InterfaceNotFound(String),

    /// Same tag, different definition
    #[error("Another interface with the tag \"{0}\" already exists.")]
    DuplicateInterface(String),

    /// Interface binding does not belong to this kind of endpoint
    #[error("Interface type {itype} can not be added to a {endpoint}.")]
    WrongBinding {
        itype: String,
        endpoint: &'static str,
    },

    /// Container interfaces need an address
    #[error("Interface \"{0}\" requires an address.")]
    MissingAddress(String),

    /// Address held by another live interface
    #[error("Address \"{0}\" already is in use.")]
    AddressInUse(String),

    /// Unregistering a user the interface does not serve
    #[error("User \"{user_id}\" is not registered with interface \"{tag}\".")]
    UserNotRegistered { tag: String, user_id: String },

    /// Payload type differs from the interface's message type
    #[error("Interface \"{tag}\" carries {expected}, not {actual}.")]
    MessageTypeMismatch {
        tag: String,
        expected: String,
        actual: String,
    },

    /// The endpoint owning an interface no longer exists
    #[error("Endpoint of interface \"{0}\" is gone.")]
    EndpointGone(String),

    /// Illegal name, tag or descriptor
    #[error(transparent)]
    Name(#[from] NameError),

    /// Malformed routed message
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Transport failure
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Delivery could not be dispatched
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl EndpointError {
    /// Taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InterfaceNotFound(_)
            | Self::DuplicateInterface(_)
            | Self::WrongBinding { .. }
            | Self::MissingAddress(_)
            | Self::MessageTypeMismatch { .. }
            | Self::Name(_) => ErrorKind::InvalidRequest,
            Self::AddressInUse(_) => ErrorKind::Conflict,
            Self::AlreadyRunning
            | Self::NotRunning { .. }
            | Self::AlreadyConnected
            | Self::NotConnected { .. }
            | Self::UnknownInterface { .. }
            | Self::UserNotRegistered { .. }
            | Self::EndpointGone(_)
            | Self::Message(_)
            | Self::Bus(_)
            | Self::Delivery(_) => ErrorKind::Protocol,
        }
    }
}

/// Result type for endpoint operations
pub type EndpointResult<T> = Result<T, EndpointError>;
