//! # Core Domain Entities
//!
//! Typed descriptors for the objects the control plane manages.
//!
//! ## Clusters
//!
//! - **Interfaces**: `InterfaceKind`, `Binding`, `InterfaceType`, `MessageType`
//! - **References**: `InterfaceRef` (`endpoint/interface`)
//! - **Identity**: `CommId`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::NameError;
use crate::names::is_legal_base_name;

/// Globally unique communication address of a process on the message bus.
pub type CommId = String;

// =============================================================================
// CLUSTER A: INTERFACE TYPES
// =============================================================================

/// Role an interface plays in a message exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceKind {
    /// Issues service requests.
    ServiceClient,
    /// Answers service requests.
    ServiceProvider,
    /// Produces topic messages.
    Publisher,
    /// Consumes topic messages.
    Subscriber,
}

impl InterfaceKind {
    /// All kinds, in prefix-matching order.
    pub const ALL: [InterfaceKind; 4] = [
        InterfaceKind::ServiceClient,
        InterfaceKind::ServiceProvider,
        InterfaceKind::Publisher,
        InterfaceKind::Subscriber,
    ];

    /// Prefix used in interface type strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceClient => "ServiceClient",
            Self::ServiceProvider => "ServiceProvider",
            Self::Publisher => "Publisher",
            Self::Subscriber => "Subscriber",
        }
    }

    /// The kind on the other side of a producer/consumer or client/provider
    /// pair.
    pub fn complement(&self) -> InterfaceKind {
        match self {
            Self::ServiceClient => Self::ServiceProvider,
            Self::ServiceProvider => Self::ServiceClient,
            Self::Publisher => Self::Subscriber,
            Self::Subscriber => Self::Publisher,
        }
    }
}

/// What an interface is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Binding {
    /// Bound to an address inside a container.
    Interface,
    /// Bound to a robot, converting between wire and native representation.
    Converter,
    /// Bound to a robot, forwarding the native representation untouched.
    Forwarder,
}

impl Binding {
    /// All bindings.
    pub const ALL: [Binding; 3] = [Binding::Interface, Binding::Converter, Binding::Forwarder];

    /// Suffix used in interface type strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interface => "Interface",
            Self::Converter => "Converter",
            Self::Forwarder => "Forwarder",
        }
    }

    /// True for bindings owned by a robot endpoint.
    pub fn is_robot_side(&self) -> bool {
        matches!(self, Self::Converter | Self::Forwarder)
    }
}

/// Full interface type, e.g. `PublisherInterface` or `SubscriberConverter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceType {
    /// Role of the interface.
    pub kind: InterfaceKind,
    /// What the interface is bound to.
    pub binding: Binding,
}

impl InterfaceType {
    /// Create an interface type.
    pub const fn new(kind: InterfaceKind, binding: Binding) -> Self {
        Self { kind, binding }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.as_str(), self.binding.as_str())
    }
}

impl FromStr for InterfaceType {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (binding, prefix) = Binding::ALL
            .iter()
            .find_map(|b| s.strip_suffix(b.as_str()).map(|p| (*b, p)))
            .ok_or_else(|| NameError::UnknownSuffix(s.to_string()))?;

        let kind = InterfaceKind::ALL
            .iter()
            .find(|k| k.as_str() == prefix)
            .copied()
            .ok_or_else(|| NameError::UnknownPrefix(s.to_string()))?;

        Ok(Self { kind, binding })
    }
}

// =============================================================================
// CLUSTER B: MESSAGE TYPES
// =============================================================================

/// Payload schema descriptor, `package/Name` (e.g. `std_msgs/Int32`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageType(String);

impl MessageType {
    /// Package part of the descriptor.
    pub fn package(&self) -> &str {
        self.0.split_once('/').map(|(p, _)| p).unwrap_or_default()
    }

    /// Name part of the descriptor.
    pub fn name(&self) -> &str {
        self.0.split_once('/').map(|(_, n)| n).unwrap_or_default()
    }

    /// Full descriptor.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MessageType {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((pkg, name)) if is_legal_base_name(pkg) && is_legal_base_name(name) => {
                Ok(Self(s.to_string()))
            }
            _ => Err(NameError::MalformedMessageType(s.to_string())),
        }
    }
}

// =============================================================================
// CLUSTER C: REFERENCES
// =============================================================================

/// Fully-qualified reference to an interface: `endpoint/interface`.
///
/// Ordering is lexicographic on the endpoint tag, then the interface tag,
/// which is what connection keys rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceRef {
    /// Tag of the owning container or robot.
    pub endpoint: String,
    /// Tag of the interface within its endpoint.
    pub interface: String,
}

impl InterfaceRef {
    /// Create a reference from already validated parts.
    pub fn new(endpoint: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            interface: interface.into(),
        }
    }
}

impl fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.endpoint, self.interface)
    }
}

impl FromStr for InterfaceRef {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((e, i)) if is_legal_base_name(e) && is_legal_base_name(i) => Ok(Self::new(e, i)),
            _ => Err(NameError::MalformedReference(s.to_string())),
        }
    }
}
