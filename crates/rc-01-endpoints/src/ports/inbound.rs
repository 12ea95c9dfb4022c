//! Inbound (Driving) ports for the endpoints subsystem.
//!
//! Containers and robots are both endpoints: anything that owns interfaces.
//! The RPC layer and the connection subsystem work through this trait and
//! never care which kind of endpoint they hold.

use shared_types::InterfaceMessage;
use std::fmt;
use std::sync::Arc;

use crate::domain::{DeathCallback, EndpointResult, Interface, InterfaceSpec, ObserverId};

/// What kind of endpoint owns an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Managed execution environment.
    Container,
    /// Remote client.
    Robot,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => f.write_str("container"),
            Self::Robot => f.write_str("robot"),
        }
    }
}

/// An owner of interfaces.
pub trait Endpoint: Send + Sync {
    /// Client-chosen tag (container tag or robot ID).
    fn tag(&self) -> &str;

    /// Communication ID users of this endpoint's interfaces are reached
    /// through.
    fn comm_id(&self) -> &str;

    /// Container or robot.
    fn kind(&self) -> EndpointKind;

    /// Add an interface. Re-adding an identical definition is a no-op.
    fn add_interface(&self, spec: InterfaceSpec) -> EndpointResult<()>;

    /// Look up an interface by tag.
    fn get_interface(&self, tag: &str) -> EndpointResult<Arc<Interface>>;

    /// Remove an interface by tag.
    fn remove_interface(&self, tag: &str) -> EndpointResult<()>;

    /// Tags of all live interfaces.
    fn interface_tags(&self) -> Vec<String>;

    /// Push a message coming from `user_id` through an interface into the
    /// endpoint.
    fn forward_to_endpoint(&self, user_id: &str, msg: InterfaceMessage) -> EndpointResult<()>;

    /// Hand a message that left the endpoint through an interface to the
    /// owning client, addressed to `user_id`.
    fn received_from_interface(&self, user_id: &str, msg: InterfaceMessage);

    /// Register a death callback.
    fn notify_on_death(&self, callback: DeathCallback) -> Option<ObserverId>;

    /// Unregister a death callback.
    fn dont_notify_on_death(&self, id: ObserverId) -> bool;

    /// Tear down the endpoint and everything attached to it.
    fn destroy(&self);
}

