//! Gateway error types with JSON-RPC 2.0 error codes.
//!
//! Domain errors reach the client through [`ErrorKind`] only:
//!
//! | Kind | Code | Client sees |
//! |------|------|-------------|
//! | `InvalidRequest` | -32600 | the domain message, verbatim |
//! | `Protocol` | -32603 | a generic failure; the detail is logged |
//! | `Conflict` | -32009 | the domain message, verbatim |

use rc_01_endpoints::EndpointError;
use rc_02_connection::ConnectionError;
use serde::{Deserialize, Serialize};
use shared_types::{ErrorKind, NameError};
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    // JSON-RPC 2.0 standard errors (-32700 to -32600)
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Server errors (-32000 to -32099)
    pub const TIMEOUT: i32 = -32006;
    pub const CONFLICT: i32 = -32009;
    pub const UNAUTHORIZED: i32 = -32010;
}

/// Message shown to clients for protocol errors.
pub const GENERIC_FAILURE: &str = "Internal error: the request could not be completed";

/// Client-visible error with JSON-RPC code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// JSON-RPC error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional additional data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Parse error - invalid JSON
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(
            codes::PARSE_ERROR,
            format!("Parse error: {}", details.into()),
        )
    }

    /// Rejected request, message shown verbatim
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }

    /// Method not found
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    /// Invalid parameters
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    /// Generic internal failure
    pub fn internal() -> Self {
        Self::new(codes::INTERNAL_ERROR, GENERIC_FAILURE)
    }

    /// Resource already held
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(codes::CONFLICT, message)
    }

    /// Operation did not finish in time
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            codes::TIMEOUT,
            format!("Request timeout: {}", operation.into()),
        )
    }

    /// Request is not bound to a client identity
    pub fn unauthorized(details: impl Into<String>) -> Self {
        Self::new(
            codes::UNAUTHORIZED,
            format!("Unauthorized: {}", details.into()),
        )
    }

    /// Translate a domain error by its kind.
    ///
    /// Protocol errors are server-side defects: they are logged here and
    /// replaced by a generic message.
    pub fn from_domain(kind: ErrorKind, err: &dyn std::error::Error) -> Self {
        match kind {
            ErrorKind::InvalidRequest => Self::invalid_request(err.to_string()),
            ErrorKind::Conflict => Self::conflict(err.to_string()),
            ErrorKind::Protocol => {
                error!(error = %err, "Protocol error while handling request");
                Self::internal()
            }
        }
    }

    /// Outcome label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self.code {
            codes::CONFLICT => "conflict",
            codes::INTERNAL_ERROR => "internal",
            codes::TIMEOUT => "timeout",
            _ => "invalid_request",
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

impl From<EndpointError> for RpcError {
    fn from(e: EndpointError) -> Self {
        Self::from_domain(e.kind(), &e)
    }
}

impl From<ConnectionError> for RpcError {
    fn from(e: ConnectionError) -> Self {
        Self::from_domain(e.kind(), &e)
    }
}

impl From<NameError> for RpcError {
    fn from(e: NameError) -> Self {
        Self::from_domain(e.kind(), &e)
    }
}

impl From<UserError> for RpcError {
    fn from(e: UserError) -> Self {
        Self::invalid_request(e.to_string())
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_eof() {
            RpcError::parse_error(e.to_string())
        } else {
            RpcError::invalid_params(e.to_string())
        }
    }
}

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors of the user registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("User \"{0}\" already exists.")]
    AlreadyExists(String),

    #[error("User \"{0}\" does not exist.")]
    UnknownUser(String),

    #[error("\"{0}\" is not a legal user name.")]
    IllegalName(String),

    #[error("Password must not be empty.")]
    EmptyPassword,
}

/// Errors of the container realm
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealmError {
    #[error("Container {0} did not become ready in time")]
    Timeout(String),

    #[error("Container {0} was released before it became ready")]
    Released(String),
}

impl From<RealmError> for RpcError {
    fn from(e: RealmError) -> Self {
        match e {
            RealmError::Timeout(_) => RpcError::timeout(e.to_string()),
            RealmError::Released(_) => RpcError::from_domain(ErrorKind::Protocol, &e),
        }
    }
}

/// Gateway-level errors (not JSON-RPC, internal use)
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Server stopped with an error
    #[error("server error: {0}")]
    Serve(String),
}
