//! # Routed Message Envelope
//!
//! Every message on the bus is a `RoutedMessage { msg_type, dest, orig,
//! content }`. Senders build an [`OutboundMessage`] (no addressing) and let
//! the owner of the destination stamp it.
//!
//! ## Address Space
//!
//! Communication IDs carry a routing prefix of [`ADDRESS_PREFIX_LENGTH`]
//! characters. The node hosting a container channel is addressed by
//! [`PRIVATE_ADDRESS_PREFIX`] followed by the remainder of the requesting
//! process's commID.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::CommId;
use crate::errors::MessageError;
use crate::ipc::{InterfaceMessage, NodeSpec, Parameter, RemovalKind};

/// Length of the routing prefix of every communication ID.
pub const ADDRESS_PREFIX_LENGTH: usize = 2;

/// Prefix addressing the host node of a container channel.
pub const PRIVATE_ADDRESS_PREFIX: &str = "PR";

/// Prefix of container communication IDs.
pub const CONTAINER_ADDRESS_PREFIX: &str = "CO";

/// Private address of the node serving `comm_id`.
pub fn private_address(comm_id: &str) -> CommId {
    let rest = comm_id.get(ADDRESS_PREFIX_LENGTH..).unwrap_or_default();
    format!("{PRIVATE_ADDRESS_PREFIX}{rest}")
}

/// Closed set of bus message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgType {
    /// Request to start a container.
    ContainerStart,
    /// Request to stop a container.
    ContainerStop,
    /// Connectivity report from a container.
    ContainerStatus,
    /// Add a node or parameter.
    ComponentAdd,
    /// Remove a node or parameter.
    ComponentRemove,
    /// Application data for an interface.
    InterfaceData,
    /// Register a user on an interface.
    InterfaceActivate,
    /// Unregister a user from an interface.
    InterfaceDeactivate,
}

impl MsgType {
    /// All message types.
    pub const ALL: [MsgType; 8] = [
        MsgType::ContainerStart,
        MsgType::ContainerStop,
        MsgType::ContainerStatus,
        MsgType::ComponentAdd,
        MsgType::ComponentRemove,
        MsgType::InterfaceData,
        MsgType::InterfaceActivate,
        MsgType::InterfaceDeactivate,
    ];

    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContainerStart => "container_start",
            Self::ContainerStop => "container_stop",
            Self::ContainerStatus => "container_status",
            Self::ComponentAdd => "component_add",
            Self::ComponentRemove => "component_remove",
            Self::InterfaceData => "interface_data",
            Self::InterfaceActivate => "interface_activate",
            Self::InterfaceDeactivate => "interface_deactivate",
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-tagged message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content", rename_all = "snake_case")]
pub enum MessageContent {
    /// Identifies a container by commID.
    Container {
        /// Container communication ID.
        comm_id: CommId,
    },
    /// Connectivity of the sending container.
    Status {
        /// Whether the environment is reachable.
        connected: bool,
    },
    /// Node to launch.
    Node(NodeSpec),
    /// Parameter to set.
    Parameter(Parameter),
    /// Node or parameter to remove.
    Removal {
        /// What to remove.
        kind: RemovalKind,
        /// Node tag or parameter name.
        tag: String,
    },
    /// Application data.
    Data(InterfaceMessage),
    /// User binding for interface activation.
    Binding {
        /// Interface the user is bound to.
        interface_tag: String,
        /// Remote user identity.
        user_id: String,
        /// Communication ID the user is reached through.
        comm_id: CommId,
    },
}

impl MessageContent {
    /// Variant name, used in error reports.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Container { .. } => "Container",
            Self::Status { .. } => "Status",
            Self::Node(_) => "Node",
            Self::Parameter(_) => "Parameter",
            Self::Removal { .. } => "Removal",
            Self::Data(_) => "Data",
            Self::Binding { .. } => "Binding",
        }
    }

    /// Whether this content may be carried by `msg_type`.
    pub fn fits(&self, msg_type: MsgType) -> bool {
        matches!(
            (msg_type, self),
            (MsgType::ContainerStart | MsgType::ContainerStop, Self::Container { .. })
                | (MsgType::ContainerStatus, Self::Status { .. })
                | (MsgType::ComponentAdd, Self::Node(_) | Self::Parameter(_))
                | (MsgType::ComponentRemove, Self::Removal { .. })
                | (MsgType::InterfaceData, Self::Data(_))
                | (
                    MsgType::InterfaceActivate | MsgType::InterfaceDeactivate,
                    Self::Binding { .. }
                )
        )
    }
}

/// A message that has not been addressed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Message type.
    pub msg_type: MsgType,
    /// Payload.
    pub content: MessageContent,
}

impl OutboundMessage {
    /// Create an unaddressed message.
    pub fn new(msg_type: MsgType, content: MessageContent) -> Self {
        Self { msg_type, content }
    }

    /// Check that the content belongs to the declared type.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.content.fits(self.msg_type) {
            Ok(())
        } else {
            Err(MessageError::Malformed {
                msg_type: self.msg_type.to_string(),
                content: self.content.variant_name(),
            })
        }
    }

    /// Validate and address the message.
    pub fn route(
        self,
        dest: impl Into<CommId>,
        orig: impl Into<CommId>,
    ) -> Result<RoutedMessage, MessageError> {
        self.validate()?;
        let dest = dest.into();
        if dest.is_empty() {
            return Err(MessageError::MissingDestination);
        }
        Ok(RoutedMessage {
            msg_type: self.msg_type,
            dest,
            orig: orig.into(),
            content: self.content,
        })
    }
}

/// A fully addressed bus message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedMessage {
    /// Message type.
    pub msg_type: MsgType,
    /// Destination communication ID.
    pub dest: CommId,
    /// Origin communication ID.
    pub orig: CommId,
    /// Payload.
    pub content: MessageContent,
}
