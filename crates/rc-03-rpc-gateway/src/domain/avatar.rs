//! Avatar: the server-side session of one authenticated client.
//!
//! An avatar owns the client's containers, robots and connections. Every RPC
//! handler works on the avatar of the requesting client; there is no global
//! table of endpoints.
//!
//! ## Message routing
//!
//! Avatars are the [`ClientNotifier`] of their endpoints. A message leaving
//! an interface towards a user is routed by the shape of the user ID:
//!
//! - `endpoint/interface`: a connected peer interface; the message is
//!   submitted to the delivery pool for that peer.
//! - anything else: a robot ID; the message is pushed to the client sink.

use parking_lot::Mutex;
use rc_01_endpoints::{
    ClientNotifier, Container, DeliveryJob, DeliveryPool, Endpoint, InterfaceSpec, Robot,
};
use rc_02_connection::{Connection, ConnectionError, ConnectionKey};
use shared_bus::CommManager;
use shared_types::{names, InterfaceMessage, InterfaceRef};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use super::error::{RpcError, RpcResult};
use crate::ports::ClientSink;

/// Session of one client.
pub struct Avatar {
    user_id: String,
    comm: Arc<dyn CommManager>,
    pool: Arc<DeliveryPool>,
    sink: Arc<dyn ClientSink>,
    containers: Mutex<HashMap<String, Arc<Container>>>,
    robots: Mutex<HashMap<String, Arc<Robot>>>,
    connections: Mutex<HashMap<ConnectionKey, Arc<Connection>>>,
    me: Weak<Avatar>,
}

impl Avatar {
    /// Create an empty session.
    pub fn new(
        user_id: &str,
        comm: Arc<dyn CommManager>,
        pool: Arc<DeliveryPool>,
        sink: Arc<dyn ClientSink>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            user_id: user_id.to_string(),
            comm,
            pool,
            sink,
            containers: Mutex::new(HashMap::new()),
            robots: Mutex::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    /// Authenticated client identity.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn notifier(&self) -> Weak<dyn ClientNotifier> {
        self.me.clone()
    }

    // =========================================================================
    // ENDPOINT LOOKUP
    // =========================================================================

    /// Container or robot with the given tag.
    pub fn endpoint(&self, tag: &str) -> RpcResult<Arc<dyn Endpoint>> {
        if let Some(container) = self.containers.lock().get(tag) {
            return Ok(container.clone());
        }
        if let Some(robot) = self.robots.lock().get(tag) {
            return Ok(robot.clone());
        }
        Err(RpcError::invalid_request(format!(
            "Endpoint \"{tag}\" does not exist."
        )))
    }

    /// Container with the given tag.
    pub fn container(&self, tag: &str) -> RpcResult<Arc<Container>> {
        self.containers
            .lock()
            .get(tag)
            .cloned()
            .ok_or_else(|| RpcError::invalid_request(format!("Container \"{tag}\" does not exist.")))
    }

    /// Robot with the given ID.
    pub fn robot(&self, robot_id: &str) -> RpcResult<Arc<Robot>> {
        self.robots
            .lock()
            .get(robot_id)
            .cloned()
            .ok_or_else(|| RpcError::invalid_request(format!("Robot \"{robot_id}\" does not exist.")))
    }

    /// Snapshot of the containers.
    pub fn containers(&self) -> Vec<Arc<Container>> {
        let mut containers: Vec<Arc<Container>> = self.containers.lock().values().cloned().collect();
        containers.sort_by(|a, b| a.tag().cmp(b.tag()));
        containers
    }

    /// Snapshot of the robots.
    pub fn robots(&self) -> Vec<Arc<Robot>> {
        let mut robots: Vec<Arc<Robot>> = self.robots.lock().values().cloned().collect();
        robots.sort_by(|a, b| a.tag().cmp(b.tag()));
        robots
    }

    /// Keys of the live connections.
    pub fn connection_keys(&self) -> Vec<ConnectionKey> {
        let mut keys: Vec<ConnectionKey> = self.connections.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    // =========================================================================
    // CONTAINERS
    // =========================================================================

    /// Register a new, not yet started container under `tag`.
    ///
    /// # Errors
    ///
    /// InvalidRequest if the tag is illegal or already names a container or
    /// robot of this client.
    pub fn reserve_container(&self, tag: &str, comm_id: &str) -> RpcResult<Arc<Container>> {
        names::validate_tag(tag)?;
        let mut containers = self.containers.lock();
        if containers.contains_key(tag) || self.robots.lock().contains_key(tag) {
            return Err(RpcError::invalid_request(format!(
                "Tag \"{tag}\" is already used."
            )));
        }
        let container = Container::new(
            tag,
            comm_id,
            self.comm.clone(),
            self.pool.clone(),
            self.notifier(),
        );
        containers.insert(tag.to_string(), container.clone());
        debug!(user = %self.user_id, container = %tag, comm_id, "Container reserved");
        Ok(container)
    }

    /// Take a container out of the session without destroying it.
    pub fn take_container(&self, tag: &str) -> RpcResult<Arc<Container>> {
        self.containers
            .lock()
            .remove(tag)
            .ok_or_else(|| RpcError::invalid_request(format!("Container \"{tag}\" does not exist.")))
    }

    /// Take `container` out of the session if it still holds its tag.
    /// Returns `false` when the tag was destroyed or reused meanwhile.
    pub fn forget_container(&self, container: &Arc<Container>) -> bool {
        let mut containers = self.containers.lock();
        if !containers
            .get(container.tag())
            .is_some_and(|live| Arc::ptr_eq(live, container))
        {
            return false;
        }
        containers.remove(container.tag());
        debug!(user = %self.user_id, container = %container.tag(), "Container forgotten");
        true
    }

    // =========================================================================
    // ROBOTS
    // =========================================================================

    /// Register a robot that connected through `comm_id`.
    ///
    /// # Errors
    ///
    /// InvalidRequest if the ID is illegal or already in use.
    pub fn register_robot(&self, robot_id: &str, comm_id: &str) -> RpcResult<Arc<Robot>> {
        names::validate_tag(robot_id)?;
        // Same lock order as `reserve_container`.
        let containers = self.containers.lock();
        let mut robots = self.robots.lock();
        let entry = match robots.entry(robot_id.to_string()) {
            Entry::Vacant(entry) if !containers.contains_key(robot_id) => entry,
            _ => {
                return Err(RpcError::invalid_request(format!(
                    "Tag \"{robot_id}\" is already used."
                )))
            }
        };
        let robot = Robot::new(robot_id, comm_id, self.pool.clone(), self.notifier());
        entry.insert(robot.clone());
        drop(robots);
        drop(containers);
        info!(user = %self.user_id, robot = %robot_id, "Robot registered");
        Ok(robot)
    }

    /// Remove and destroy a robot. Its interfaces and connections die with
    /// it.
    pub fn unregister_robot(&self, robot_id: &str) -> RpcResult<()> {
        let robot = self
            .robots
            .lock()
            .remove(robot_id)
            .ok_or_else(|| RpcError::invalid_request(format!("Robot \"{robot_id}\" does not exist.")))?;
        robot.destroy();
        info!(user = %self.user_id, robot = %robot_id, "Robot unregistered");
        Ok(())
    }

    /// A robot pushed a message into one of its interfaces.
    pub fn robot_message(&self, robot_id: &str, msg: InterfaceMessage) -> RpcResult<()> {
        self.robot(robot_id)?.robot_message(msg)?;
        Ok(())
    }

    // =========================================================================
    // INTERFACES
    // =========================================================================

    /// Add an interface to a container or robot.
    pub fn add_interface(&self, endpoint_tag: &str, spec: InterfaceSpec) -> RpcResult<()> {
        self.endpoint(endpoint_tag)?.add_interface(spec)?;
        Ok(())
    }

    /// Remove an interface from a container or robot.
    pub fn remove_interface(&self, endpoint_tag: &str, interface_tag: &str) -> RpcResult<()> {
        self.endpoint(endpoint_tag)?.remove_interface(interface_tag)?;
        Ok(())
    }

    // =========================================================================
    // CONNECTIONS
    // =========================================================================

    /// Connect two interfaces given as `endpoint/interface`.
    ///
    /// # Errors
    ///
    /// InvalidRequest for malformed or unknown references, incompatible
    /// interfaces, or a pair that is already connected.
    pub fn add_connection(&self, tag_a: &str, tag_b: &str) -> RpcResult<()> {
        let key = ConnectionKey::parse(tag_a, tag_b)?;
        let a = self.resolve(key.first())?;
        let b = self.resolve(key.second())?;

        let connection = {
            let mut connections = self.connections.lock();
            if connections.contains_key(&key) {
                return Err(ConnectionError::AlreadyConnected(key.to_string()).into());
            }
            let connection = Connection::create(a, b)?;
            connections.insert(key.clone(), connection.clone());
            connection
        };

        // Registered outside the table lock: the callback runs at once if
        // the connection already died.
        let avatar = self.me.clone();
        let weak = Arc::downgrade(&connection);
        connection.notify_on_death(Box::new(move || {
            if let Some(avatar) = avatar.upgrade() {
                avatar.forget_connection(&key, &weak);
            }
        }));
        Ok(())
    }

    /// Tear down the connection between two interfaces.
    ///
    /// # Errors
    ///
    /// InvalidRequest if the references are malformed or not connected.
    pub fn remove_connection(&self, tag_a: &str, tag_b: &str) -> RpcResult<()> {
        let key = ConnectionKey::parse(tag_a, tag_b)?;
        let connection = self
            .connections
            .lock()
            .remove(&key)
            .ok_or_else(|| ConnectionError::NotConnected(key.to_string()))?;
        connection.destroy();
        Ok(())
    }

    fn resolve(&self, reference: &InterfaceRef) -> RpcResult<Arc<rc_01_endpoints::Interface>> {
        Ok(self
            .endpoint(&reference.endpoint)?
            .get_interface(&reference.interface)?)
    }

    fn forget_connection(&self, key: &ConnectionKey, connection: &Weak<Connection>) {
        let mut connections = self.connections.lock();
        if connections
            .get(key)
            .is_some_and(|live| std::ptr::eq(Arc::as_ptr(live), connection.as_ptr()))
        {
            connections.remove(key);
            debug!(user = %self.user_id, connection = %key, "Connection forgotten");
        }
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Destroy everything the session owns. Returns the containers, already
    /// destroyed, so the caller can release their environments.
    pub fn destroy(&self) -> Vec<Arc<Container>> {
        let connections: Vec<Arc<Connection>> =
            self.connections.lock().drain().map(|(_, c)| c).collect();
        for connection in connections {
            connection.destroy();
        }

        let robots: Vec<Arc<Robot>> = self.robots.lock().drain().map(|(_, r)| r).collect();
        for robot in robots {
            robot.destroy();
        }

        let containers: Vec<Arc<Container>> =
            self.containers.lock().drain().map(|(_, c)| c).collect();
        for container in &containers {
            container.destroy();
        }

        info!(user = %self.user_id, "Session destroyed");
        containers
    }
}

impl ClientNotifier for Avatar {
    fn container_update(&self, tag: &str, connected: bool) {
        self.sink.container_status(&self.user_id, tag, connected);
    }

    fn received_from_interface(&self, endpoint_tag: &str, user_id: &str, msg: InterfaceMessage) {
        let Ok(peer_ref) = user_id.parse::<InterfaceRef>() else {
            self.sink.deliver(&self.user_id, user_id, endpoint_tag, msg);
            return;
        };

        let peer = match self.resolve(&peer_ref) {
            Ok(peer) => peer,
            Err(e) => {
                debug!(user = %self.user_id, peer = %peer_ref, error = %e, "Peer interface gone, message dropped");
                return;
            }
        };
        let origin = InterfaceRef::new(endpoint_tag, &msg.interface_tag).to_string();
        if let Err(e) = self.pool.submit(DeliveryJob::Send {
            interface: peer,
            user_id: origin,
            msg,
        }) {
            warn!(user = %self.user_id, peer = %peer_ref, error = %e, "Delivery to peer rejected");
        }
    }

    fn deliver_to_robot(&self, robot_id: &str, msg: InterfaceMessage) {
        self.sink.deliver(&self.user_id, robot_id, robot_id, msg);
    }
}

impl std::fmt::Debug for Avatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Avatar")
            .field("user_id", &self.user_id)
            .field("containers", &self.containers.lock().len())
            .field("robots", &self.robots.lock().len())
            .field("connections", &self.connections.lock().len())
            .finish()
    }
}
