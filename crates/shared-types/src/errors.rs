//! # Error Types
//!
//! Defines the error taxonomy shared across subsystems and the errors raised
//! while parsing shared value objects.

use thiserror::Error;

/// Classification every domain error in the workspace maps onto.
///
/// The RPC layer translates on this alone: the concrete error type stays an
/// implementation detail of the crate that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller-supplied input violates a contract the caller could have
    /// avoided. Surfaced verbatim, never retried.
    InvalidRequest,
    /// An internal state-machine precondition was violated. Indicates a bug;
    /// surfaced to the client as a generic failure.
    Protocol,
    /// A resource is already held.
    Conflict,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid request"),
            Self::Protocol => write!(f, "protocol error"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// Errors raised while parsing names and typed descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Not a legal hierarchical name.
    #[error("The name \"{0}\" is not valid.")]
    IllegalName(String),

    /// Not a legal base name (tags, robot IDs).
    #[error("The tag \"{0}\" is not valid.")]
    IllegalTag(String),

    /// Interface type with an unknown binding suffix.
    #[error("Interface type \"{0}\" is invalid (Unknown suffix).")]
    UnknownSuffix(String),

    /// Interface type with an unknown kind prefix.
    #[error("Interface type \"{0}\" is invalid (Unknown prefix).")]
    UnknownPrefix(String),

    /// Message type is not of the form `package/Name`.
    #[error("Message type \"{0}\" is not of the form 'package/Name'.")]
    MalformedMessageType(String),

    /// Interface reference is not of the form `endpoint/interface`.
    #[error("Interface reference \"{0}\" is not of the form 'endpoint/interface'.")]
    MalformedReference(String),

    /// Launch arguments contain a forbidden character or directive.
    #[error("Launch arguments \"{0}\" contain illegal characters.")]
    IllegalArguments(String),

    /// Parameter value cannot be represented by any parameter variant.
    #[error("Parameter \"{name}\" has an unsupported value: {reason}")]
    UnsupportedParameter {
        /// Parameter name.
        name: String,
        /// What was wrong with the value.
        reason: String,
    },
}

impl NameError {
    /// All parse failures are caller errors.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidRequest
    }
}

/// Errors related to routed-message construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The content does not belong to the declared message type.
    #[error("Malformed message: {msg_type} can not carry {content}")]
    Malformed {
        /// Declared message type.
        msg_type: String,
        /// Name of the content variant that was supplied.
        content: &'static str,
    },

    /// Destination address is empty.
    #[error("Message has no destination")]
    MissingDestination,
}

impl MessageError {
    /// Malformed messages are produced by our own code, never by a client.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Protocol
    }
}
