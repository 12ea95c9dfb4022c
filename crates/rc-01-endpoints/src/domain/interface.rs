//! Interfaces: typed attachment points on an endpoint.
//!
//! An interface serves a set of users. A message entering the interface from
//! a user is forwarded into the owning endpoint; a message leaving the
//! endpoint through the interface is handed back to the owner once per
//! registered user.
//!
//! ```text
//!   user ──send()──> Interface ──forward_to_endpoint()──> Endpoint
//!   user <─────────  Interface <──────receive()─────────  Endpoint
//!          (owner.received_from_interface per user)
//! ```

use parking_lot::Mutex;
use shared_types::{CommId, InterfaceMessage, InterfaceRef, InterfaceType, MessageType};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;
use tracing::{debug, info};

use super::addresses::AddressLease;
use super::errors::{EndpointError, EndpointResult};
use super::lifecycle::{DeathCallback, DeathNotifier, ObserverId};
use crate::ports::inbound::Endpoint;

/// Definition of an interface as requested by a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceSpec {
    /// Tag, unique within the owning endpoint.
    pub tag: String,
    /// Kind and binding.
    pub itype: InterfaceType,
    /// Payload schema.
    pub message_type: MessageType,
    /// Address inside the container; `None` for robot-side interfaces.
    pub address: Option<String>,
}

/// A user served by an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceUser {
    /// Remote identity: a robot ID or a peer interface reference.
    pub user_id: String,
    /// Communication ID the user is reached through.
    pub comm_id: CommId,
}

/// A typed attachment point on a container or robot.
pub struct Interface {
    spec: InterfaceSpec,
    endpoint_tag: String,
    endpoint_comm_id: CommId,
    owner: Weak<dyn Endpoint>,
    users: Mutex<HashSet<InterfaceUser>>,
    lease: Mutex<Option<AddressLease>>,
    detached: AtomicBool,
    death: DeathNotifier,
}

impl Interface {
    /// Create an interface owned by `owner`.
    ///
    /// A lease must be supplied for interfaces bound to an address.
    pub(crate) fn new(
        spec: InterfaceSpec,
        owner: Weak<dyn Endpoint>,
        endpoint_tag: &str,
        endpoint_comm_id: &str,
        lease: Option<AddressLease>,
    ) -> Self {
        Self {
            spec,
            endpoint_tag: endpoint_tag.to_string(),
            endpoint_comm_id: endpoint_comm_id.to_string(),
            owner,
            users: Mutex::new(HashSet::new()),
            lease: Mutex::new(lease),
            detached: AtomicBool::new(false),
            death: DeathNotifier::new(),
        }
    }

    /// Interface tag.
    pub fn tag(&self) -> &str {
        &self.spec.tag
    }

    /// Kind and binding.
    pub fn itype(&self) -> InterfaceType {
        self.spec.itype
    }

    /// Payload schema.
    pub fn message_type(&self) -> &MessageType {
        &self.spec.message_type
    }

    /// Address inside the container, if any.
    pub fn address(&self) -> Option<&str> {
        self.spec.address.as_deref()
    }

    /// Full definition.
    pub fn spec(&self) -> &InterfaceSpec {
        &self.spec
    }

    /// Fully-qualified `endpoint/interface` reference.
    pub fn reference(&self) -> InterfaceRef {
        InterfaceRef::new(&self.endpoint_tag, &self.spec.tag)
    }

    /// Communication ID of the owning endpoint.
    pub fn endpoint_comm_id(&self) -> &str {
        &self.endpoint_comm_id
    }

    /// Structural equality with a requested definition, used for idempotent
    /// re-adds.
    pub fn validate(&self, spec: &InterfaceSpec) -> bool {
        self.spec == *spec
    }

    /// Start serving a user. Registering the same user twice is a no-op.
    pub fn register_user(&self, user_id: &str, comm_id: &str) {
        let user = InterfaceUser {
            user_id: user_id.to_string(),
            comm_id: comm_id.to_string(),
        };
        if self.users.lock().insert(user) {
            debug!(interface = %self.reference(), user_id, comm_id, "User registered");
        }
    }

    /// Stop serving a user.
    ///
    /// # Errors
    ///
    /// `UserNotRegistered` if the user is not served.
    pub fn unregister_user(&self, user_id: &str, comm_id: &str) -> EndpointResult<()> {
        let user = InterfaceUser {
            user_id: user_id.to_string(),
            comm_id: comm_id.to_string(),
        };
        if !self.users.lock().remove(&user) {
            return Err(EndpointError::UserNotRegistered {
                tag: self.spec.tag.clone(),
                user_id: user_id.to_string(),
            });
        }
        debug!(interface = %self.reference(), user_id, comm_id, "User unregistered");
        Ok(())
    }

    /// Snapshot of the served users.
    pub fn users(&self) -> Vec<InterfaceUser> {
        self.users.lock().iter().cloned().collect()
    }

    /// Whether `user_id` is served.
    pub fn has_user(&self, user_id: &str) -> bool {
        self.users.lock().iter().any(|u| u.user_id == user_id)
    }

    /// Push a message from `user_id` into the owning endpoint.
    pub fn send(&self, msg: InterfaceMessage, user_id: &str) -> EndpointResult<()> {
        if self.is_detached() {
            debug!(interface = %self.reference(), "Send on detached interface discarded");
            return Ok(());
        }
        if msg.type_name != self.spec.message_type.as_str() {
            return Err(EndpointError::MessageTypeMismatch {
                tag: self.spec.tag.clone(),
                expected: self.spec.message_type.to_string(),
                actual: msg.type_name,
            });
        }
        let owner = self
            .owner
            .upgrade()
            .ok_or_else(|| EndpointError::EndpointGone(self.spec.tag.clone()))?;
        owner.forward_to_endpoint(user_id, msg.readdressed(&self.spec.tag))
    }

    /// Hand a message leaving the endpoint to every served user.
    pub fn receive(&self, msg: InterfaceMessage) {
        if self.is_detached() {
            debug!(interface = %self.reference(), "Receive on detached interface discarded");
            return;
        }
        let Some(owner) = self.owner.upgrade() else {
            debug!(interface = %self.reference(), "Receive after endpoint died discarded");
            return;
        };

        let users = self.users();
        if users.is_empty() {
            debug!(interface = %self.reference(), "No users registered, message dropped");
            return;
        }
        for user in users {
            owner.received_from_interface(&user.user_id, msg.clone());
        }
    }

    /// Whether the interface has been removed from its endpoint.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Remove the interface from service: stop accepting traffic, free the
    /// address and notify dependents. Idempotent.
    pub(crate) fn detach(&self) {
        if self.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(self.lease.lock().take());
        self.users.lock().clear();
        info!(interface = %self.reference(), "Interface detached");
        self.death.fire();
    }

    /// Register a death callback.
    pub fn notify_on_death(&self, callback: DeathCallback) -> Option<ObserverId> {
        self.death.notify_on_death(callback)
    }

    /// Unregister a death callback.
    pub fn dont_notify_on_death(&self, id: ObserverId) -> bool {
        self.death.dont_notify_on_death(id)
    }
}

impl Drop for Interface {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("reference", &self.reference())
            .field("itype", &self.spec.itype.to_string())
            .field("message_type", &self.spec.message_type.as_str())
            .field("address", &self.spec.address)
            .field("detached", &self.is_detached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::addresses::AddressRegistry;
    use crate::domain::Robot;
    use serde_json::json;
    use shared_types::ErrorKind;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn spec(tag: &str, message_type: &str) -> InterfaceSpec {
        InterfaceSpec {
            tag: tag.into(),
            itype: "PublisherInterface".parse().unwrap(),
            message_type: message_type.parse().unwrap(),
            address: Some("/a".into()),
        }
    }

    fn orphan(spec: InterfaceSpec, lease: Option<AddressLease>) -> Interface {
        let owner: Weak<dyn Endpoint> = Weak::<Robot>::new();
        Interface::new(spec, owner, "C1", "COc1", lease)
    }

    fn msg(type_name: &str) -> InterfaceMessage {
        InterfaceMessage {
            interface_tag: "i1".into(),
            msg_id: String::new(),
            type_name: type_name.into(),
            payload: json!(null),
        }
    }

    #[test]
    fn test_validate_is_structural() {
        let iface = orphan(spec("i1", "std/Type"), None);
        assert!(iface.validate(&spec("i1", "std/Type")));
        assert!(!iface.validate(&spec("i1", "std/Other")));
        assert_eq!(iface.reference().to_string(), "C1/i1");
    }

    #[test]
    fn test_user_registration() {
        let iface = orphan(spec("i1", "std/Type"), None);
        iface.register_user("robotX", "ZZr");
        iface.register_user("robotX", "ZZr");
        assert_eq!(iface.users().len(), 1);

        let err = iface.unregister_user("robotX", "ZZother").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        iface.unregister_user("robotX", "ZZr").unwrap();
        assert!(!iface.has_user("robotX"));
    }

    #[test]
    fn test_send_checks_type_then_owner() {
        let iface = orphan(spec("i1", "std/Type"), None);
        assert!(matches!(
            iface.send(msg("std/Other"), "u"),
            Err(EndpointError::MessageTypeMismatch { .. })
        ));
        assert!(matches!(
            iface.send(msg("std/Type"), "u"),
            Err(EndpointError::EndpointGone(_))
        ));
    }

    #[test]
    fn test_detach_releases_everything_once() {
        let registry = AddressRegistry::new();
        let lease = AddressLease::acquire(&registry, "/a").unwrap();
        let iface = orphan(spec("i1", "std/Type"), Some(lease));
        iface.register_user("robotX", "ZZr");

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        iface.notify_on_death(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        iface.detach();
        iface.detach();
        assert!(iface.is_detached());
        assert!(!registry.is_reserved("/a"));
        assert!(iface.users().is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Traffic on a detached interface is discarded.
        iface.send(msg("std/Other"), "u").unwrap();
    }
}
