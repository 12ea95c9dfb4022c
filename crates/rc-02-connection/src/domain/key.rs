//! Symmetric connection identity.

use shared_types::InterfaceRef;
use std::fmt;

use super::errors::{ConnectionError, ConnectionResult};

/// Identity of a connection: both interface references, ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    first: InterfaceRef,
    second: InterfaceRef,
}

impl ConnectionKey {
    /// Build the key of the pair `a`, `b` in either order.
    pub fn new(a: InterfaceRef, b: InterfaceRef) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Parse two `endpoint/interface` strings.
    ///
    /// # Errors
    ///
    /// `Name` if either reference is malformed, `SelfConnection` if both name
    /// the same interface.
    pub fn parse(a: &str, b: &str) -> ConnectionResult<Self> {
        let a: InterfaceRef = a.parse()?;
        let b: InterfaceRef = b.parse()?;
        if a == b {
            return Err(ConnectionError::SelfConnection(a.to_string()));
        }
        Ok(Self::new(a, b))
    }

    /// Lexicographically smaller reference.
    pub fn first(&self) -> &InterfaceRef {
        &self.first
    }

    /// Lexicographically larger reference.
    pub fn second(&self) -> &InterfaceRef {
        &self.second
    }

    /// Whether either side lives on endpoint `tag`.
    pub fn touches_endpoint(&self, tag: &str) -> bool {
        self.first.endpoint == tag || self.second.endpoint == tag
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.first, self.second)
    }
}
