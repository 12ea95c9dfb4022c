//! Containers: managed execution environments.
//!
//! ## State Machine
//!
//! ```text
//! [created] ──start()──→ [running] ──set_connected_flag(true)──→ [connected]
//!     ↑                     │  ↑                                     │
//!     └──────stop()─────────┘  └──────set_connected_flag(false)──────┘
//! ```
//!
//! Interfaces may only be activated or deactivated while connected.
//! Structural operations (nodes, parameters, interfaces) are serialized per
//! container; payload delivery runs on the delivery pool.

use parking_lot::Mutex;
use shared_bus::CommManager;
use shared_types::{
    names, private_address, Binding, CommId, InterfaceMessage, MessageContent, MsgType, NodeSpec,
    OutboundMessage, Parameter, ParameterValue, RemovalKind,
};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use super::addresses::{AddressLease, AddressRegistry};
use super::errors::{EndpointError, EndpointResult};
use super::interface::{Interface, InterfaceSpec};
use super::lifecycle::{DeathCallback, DeathNotifier, ObserverId};
use super::table::{Insertion, InterfaceTable};
use crate::delivery::{DeliveryJob, DeliveryPool};
use crate::ports::inbound::{Endpoint, EndpointKind};
use crate::ports::outbound::ClientNotifier;

#[derive(Debug, Default, Clone, Copy)]
struct ContainerState {
    running: bool,
    connected: bool,
}

/// A managed execution environment owned by one client.
pub struct Container {
    tag: String,
    comm_id: CommId,
    comm: Arc<dyn CommManager>,
    pool: Arc<DeliveryPool>,
    client: Weak<dyn ClientNotifier>,
    state: Mutex<ContainerState>,
    interfaces: InterfaceTable,
    addresses: Arc<AddressRegistry>,
    death: DeathNotifier,
    me: Weak<Container>,
}

impl Container {
    /// Create a container that is not running yet.
    pub fn new(
        tag: &str,
        comm_id: &str,
        comm: Arc<dyn CommManager>,
        pool: Arc<DeliveryPool>,
        client: Weak<dyn ClientNotifier>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            tag: tag.to_string(),
            comm_id: comm_id.to_string(),
            comm,
            pool,
            client,
            state: Mutex::new(ContainerState::default()),
            interfaces: InterfaceTable::default(),
            addresses: AddressRegistry::new(),
            death: DeathNotifier::new(),
            me: me.clone(),
        })
    }

    /// Whether `start` has been called without a matching `stop`.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Whether the environment reported itself reachable.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Ask the hosting node to start the container.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if the container was started before.
    pub fn start(&self) -> EndpointResult<()> {
        let mut state = self.state.lock();
        if state.running {
            return Err(EndpointError::AlreadyRunning);
        }
        self.send_to_host(MsgType::ContainerStart)?;
        state.running = true;
        info!(container = %self.tag, comm_id = %self.comm_id, "Start container");
        Ok(())
    }

    /// Ask the hosting node to stop the container.
    ///
    /// # Errors
    ///
    /// `NotRunning` if the container is not running.
    pub fn stop(&self) -> EndpointResult<()> {
        let mut state = self.state.lock();
        if !state.running {
            return Err(EndpointError::NotRunning { action: "stop it" });
        }
        self.send_to_host(MsgType::ContainerStop)?;
        *state = ContainerState::default();
        info!(container = %self.tag, comm_id = %self.comm_id, "Stop container");
        Ok(())
    }

    fn send_to_host(&self, msg_type: MsgType) -> EndpointResult<()> {
        let msg = OutboundMessage::new(
            msg_type,
            MessageContent::Container {
                comm_id: self.comm_id.clone(),
            },
        )
        .route(private_address(self.comm.comm_id()), self.comm.comm_id())?;
        self.comm.send_message(msg)?;
        Ok(())
    }

    /// Record the connectivity of the environment and tell the client.
    ///
    /// # Errors
    ///
    /// `NotRunning` if the container is not running, `AlreadyConnected` when
    /// setting `true` twice in a row.
    pub fn set_connected_flag(&self, flag: bool) -> EndpointResult<()> {
        {
            let mut state = self.state.lock();
            if !state.running {
                return Err(EndpointError::NotRunning {
                    action: "change its connected flag",
                });
            }
            if flag && state.connected {
                return Err(EndpointError::AlreadyConnected);
            }
            state.connected = flag;
        }

        info!(container = %self.tag, connected = flag, "Container connectivity changed");
        match self.client.upgrade() {
            Some(client) => client.container_update(&self.tag, flag),
            None => debug!(container = %self.tag, "No client to notify"),
        }
        Ok(())
    }

    // =========================================================================
    // NODES AND PARAMETERS
    // =========================================================================

    /// Launch a node in the environment.
    ///
    /// # Errors
    ///
    /// `Name` if the name, namespace or launch arguments are illegal. The
    /// node tag is opaque to the container.
    pub fn add_node(&self, node: NodeSpec) -> EndpointResult<()> {
        names::validate_name(&node.namespace)?;
        names::validate_launch_args(&node.args)?;
        if !node.name.is_empty() {
            names::validate_tag(&node.name)?;
        }

        info!(
            container = %self.tag,
            node = %node.tag,
            package = %node.package,
            executable = %node.executable,
            "Add node"
        );
        self.send(OutboundMessage::new(
            MsgType::ComponentAdd,
            MessageContent::Node(node),
        ))
    }

    /// Remove a node. Absence is the environment's concern.
    pub fn remove_node(&self, tag: &str) -> EndpointResult<()> {
        info!(container = %self.tag, node = %tag, "Remove node");
        self.send(OutboundMessage::new(
            MsgType::ComponentRemove,
            MessageContent::Removal {
                kind: RemovalKind::Node,
                tag: tag.to_string(),
            },
        ))
    }

    /// Set a parameter in the environment.
    ///
    /// # Errors
    ///
    /// `Name` if the parameter name is illegal.
    pub fn add_parameter(&self, name: &str, value: ParameterValue) -> EndpointResult<()> {
        names::validate_name(name)?;

        info!(container = %self.tag, parameter = %name, kind = %value.kind(), "Add parameter");
        self.send(OutboundMessage::new(
            MsgType::ComponentAdd,
            MessageContent::Parameter(Parameter {
                name: name.to_string(),
                value,
            }),
        ))
    }

    /// Remove a parameter.
    pub fn remove_parameter(&self, name: &str) -> EndpointResult<()> {
        info!(container = %self.tag, parameter = %name, "Remove parameter");
        self.send(OutboundMessage::new(
            MsgType::ComponentRemove,
            MessageContent::Removal {
                kind: RemovalKind::Parameter,
                tag: name.to_string(),
            },
        ))
    }

    // =========================================================================
    // ADDRESSES
    // =========================================================================

    /// Reserve an address for an interface.
    ///
    /// # Errors
    ///
    /// `AddressInUse` if the address is already reserved.
    pub fn reserve_address(&self, address: &str) -> EndpointResult<AddressLease> {
        AddressLease::acquire(&self.addresses, address)
    }

    /// Free an address that no live interface holds.
    ///
    /// A reserved address belongs to the lease of a live interface and is
    /// released only when that interface is removed, so both cases are logged
    /// and otherwise ignored.
    pub fn free_address(&self, address: &str) {
        if self.addresses.is_reserved(address) {
            warn!(
                container = %self.tag,
                address,
                "Address is held by a live interface, remove the interface to free it"
            );
        } else {
            warn!(container = %self.tag, address, "Tried to free an address which was not reserved");
        }
    }

    /// Whether `address` is held by a live interface.
    pub fn is_address_reserved(&self, address: &str) -> bool {
        self.addresses.is_reserved(address)
    }

    // =========================================================================
    // INTERFACE ACTIVATION
    // =========================================================================

    /// Register a user on an interface.
    ///
    /// # Errors
    ///
    /// `NotConnected` before the environment is connected,
    /// `UnknownInterface` for an unknown tag.
    pub fn activate_interface(&self, tag: &str, user_id: &str, comm_id: &str) -> EndpointResult<()> {
        let interface = self.connected_interface(tag, "activated")?;
        interface.register_user(user_id, comm_id);
        info!(container = %self.tag, interface = %tag, user_id, comm_id, "Activate interface");
        Ok(())
    }

    /// Unregister a user from an interface.
    ///
    /// # Errors
    ///
    /// As [`activate_interface`](Self::activate_interface), plus
    /// `UserNotRegistered`.
    pub fn deactivate_interface(&self, tag: &str, user_id: &str, comm_id: &str) -> EndpointResult<()> {
        let interface = self.connected_interface(tag, "deactivated")?;
        interface.unregister_user(user_id, comm_id)?;
        info!(container = %self.tag, interface = %tag, user_id, comm_id, "Deactivate interface");
        Ok(())
    }

    fn connected_interface(&self, tag: &str, action: &'static str) -> EndpointResult<Arc<Interface>> {
        if !self.is_connected() {
            return Err(EndpointError::NotConnected { action });
        }
        self.interfaces
            .get(tag)
            .ok_or_else(|| EndpointError::UnknownInterface {
                tag: tag.to_string(),
                action: if action == "activated" {
                    "activate the interface"
                } else {
                    "deactivate the interface"
                },
            })
    }

    // =========================================================================
    // MESSAGE ROUTING
    // =========================================================================

    /// Address a message to this container and hand it to the bus.
    ///
    /// # Errors
    ///
    /// `Message` if the content does not fit the message type.
    pub fn send(&self, msg: OutboundMessage) -> EndpointResult<()> {
        let routed = msg.route(self.comm_id.as_str(), self.comm.comm_id())?;
        self.comm.send_message(routed)?;
        Ok(())
    }

    /// Dispatch a message that left the environment to its interface.
    ///
    /// # Errors
    ///
    /// `UnknownInterface` if no interface has the message's tag, `Delivery`
    /// if the pool rejects the job.
    pub fn receive(&self, msg: InterfaceMessage) -> EndpointResult<()> {
        let interface = self.lookup(&msg.interface_tag, "process received message")?;
        self.pool.submit(DeliveryJob::Receive { interface, msg })?;
        Ok(())
    }

    /// Dispatch a message from `user_id` into the interface it names.
    ///
    /// # Errors
    ///
    /// `UnknownInterface` if no interface has the message's tag, `Delivery`
    /// if the pool rejects the job.
    pub fn send_to_interface(&self, user_id: &str, msg: InterfaceMessage) -> EndpointResult<()> {
        let interface = self.lookup(&msg.interface_tag, "send message")?;
        self.pool.submit(DeliveryJob::Send {
            interface,
            user_id: user_id.to_string(),
            msg,
        })?;
        Ok(())
    }

    fn lookup(&self, tag: &str, action: &'static str) -> EndpointResult<Arc<Interface>> {
        self.interfaces
            .get(tag)
            .ok_or_else(|| EndpointError::UnknownInterface {
                tag: tag.to_string(),
                action,
            })
    }
}

impl Endpoint for Container {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn comm_id(&self) -> &str {
        &self.comm_id
    }

    fn kind(&self) -> EndpointKind {
        EndpointKind::Container
    }

    fn add_interface(&self, spec: InterfaceSpec) -> EndpointResult<()> {
        names::validate_tag(&spec.tag)?;
        if spec.itype.binding != Binding::Interface {
            return Err(EndpointError::WrongBinding {
                itype: spec.itype.to_string(),
                endpoint: "container",
            });
        }
        let address = match spec.address.as_deref() {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => return Err(EndpointError::MissingAddress(spec.tag.clone())),
        };
        names::validate_name(&address)?;

        let owner: Weak<dyn Endpoint> = self.me.clone();
        let inserted = self.interfaces.insert(&spec, || {
            let lease = self.reserve_address(&address)?;
            Ok(Interface::new(
                spec.clone(),
                owner,
                &self.tag,
                &self.comm_id,
                Some(lease),
            ))
        })?;

        if inserted == Insertion::Created {
            info!(
                container = %self.tag,
                interface = %spec.tag,
                itype = %spec.itype,
                address = %address,
                "Add interface"
            );
        }
        Ok(())
    }

    fn get_interface(&self, tag: &str) -> EndpointResult<Arc<Interface>> {
        self.interfaces
            .get(tag)
            .ok_or_else(|| EndpointError::InterfaceNotFound(tag.to_string()))
    }

    fn remove_interface(&self, tag: &str) -> EndpointResult<()> {
        self.interfaces.remove(tag)?;
        info!(container = %self.tag, interface = %tag, "Remove interface");
        Ok(())
    }

    fn interface_tags(&self) -> Vec<String> {
        self.interfaces.tags()
    }

    fn forward_to_endpoint(&self, user_id: &str, msg: InterfaceMessage) -> EndpointResult<()> {
        debug!(container = %self.tag, interface = %msg.interface_tag, user_id, "Forward to environment");
        self.send(OutboundMessage::new(
            MsgType::InterfaceData,
            MessageContent::Data(msg),
        ))
    }

    fn received_from_interface(&self, user_id: &str, msg: InterfaceMessage) {
        match self.client.upgrade() {
            Some(client) => client.received_from_interface(&self.tag, user_id, msg),
            None => debug!(container = %self.tag, "No client for interface message"),
        }
    }

    fn notify_on_death(&self, callback: DeathCallback) -> Option<ObserverId> {
        self.death.notify_on_death(callback)
    }

    fn dont_notify_on_death(&self, id: ObserverId) -> bool {
        self.death.dont_notify_on_death(id)
    }

    fn destroy(&self) {
        if self.death.is_dead() {
            return;
        }
        self.interfaces.clear();
        if self.is_running() {
            if let Err(e) = self.stop() {
                warn!(container = %self.tag, error = %e, "Failed to stop container during destroy");
            }
        }
        info!(container = %self.tag, comm_id = %self.comm_id, "Container destroyed");
        self.death.fire();
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = *self.state.lock();
        f.debug_struct("Container")
            .field("tag", &self.tag)
            .field("comm_id", &self.comm_id)
            .field("running", &state.running)
            .field("connected", &state.connected)
            .field("interfaces", &self.interfaces.len())
            .finish()
    }
}
