//! A live link between two interfaces.

use parking_lot::Mutex;
use rc_01_endpoints::{DeathCallback, DeathNotifier, Interface, ObserverId};
use rc_telemetry::CONNECTIONS_LIVE;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use super::compatibility::check_connectable;
use super::errors::{ConnectionError, ConnectionResult};
use super::key::ConnectionKey;

/// One side of a connection and the death observer registered on it.
struct Side {
    interface: Weak<Interface>,
    observer: Option<ObserverId>,
    /// User ID this side is registered under on its peer.
    peer_user: String,
    peer_comm_id: String,
}

/// A typed link between two interfaces.
pub struct Connection {
    key: ConnectionKey,
    sides: Mutex<Vec<Side>>,
    destroyed: AtomicBool,
    death: DeathNotifier,
}

impl Connection {
    /// Connect two interfaces.
    ///
    /// Each interface becomes a user of the other, and the connection
    /// destroys itself when either interface dies.
    ///
    /// # Errors
    ///
    /// `SelfConnection`, `TypeMismatch` and `NotConnectable` for invalid
    /// pairs; `InterfaceGone` if either interface is already detached.
    pub fn create(a: Arc<Interface>, b: Arc<Interface>) -> ConnectionResult<Arc<Self>> {
        let (ref_a, ref_b) = (a.reference(), b.reference());
        if ref_a == ref_b {
            return Err(ConnectionError::SelfConnection(ref_a.to_string()));
        }
        if a.message_type() != b.message_type() {
            return Err(ConnectionError::TypeMismatch {
                first: ref_a.to_string(),
                first_type: a.message_type().to_string(),
                second: ref_b.to_string(),
                second_type: b.message_type().to_string(),
            });
        }
        check_connectable(a.itype(), b.itype())?;
        for side in [&a, &b] {
            if side.is_detached() {
                return Err(ConnectionError::InterfaceGone(side.reference().to_string()));
            }
        }

        let key = ConnectionKey::new(ref_a.clone(), ref_b.clone());
        let connection = Arc::new(Self {
            key,
            sides: Mutex::new(Vec::with_capacity(2)),
            destroyed: AtomicBool::new(false),
            death: DeathNotifier::new(),
        });

        // a serves b, b serves a.
        a.register_user(&ref_b.to_string(), b.endpoint_comm_id());
        b.register_user(&ref_a.to_string(), a.endpoint_comm_id());
        connection.sides.lock().extend([
            Side {
                interface: Arc::downgrade(&a),
                observer: None,
                peer_user: ref_b.to_string(),
                peer_comm_id: b.endpoint_comm_id().to_string(),
            },
            Side {
                interface: Arc::downgrade(&b),
                observer: None,
                peer_user: ref_a.to_string(),
                peer_comm_id: a.endpoint_comm_id().to_string(),
            },
        ]);

        for (idx, interface) in [&a, &b].into_iter().enumerate() {
            let weak: Weak<Connection> = Arc::downgrade(&connection);
            let observer = interface.notify_on_death(Box::new(move || {
                if let Some(connection) = weak.upgrade() {
                    connection.destroy();
                }
            }));
            if let (Some(id), Some(side)) = (observer, connection.sides.lock().get_mut(idx)) {
                side.observer = Some(id);
            }
            if connection.is_destroyed() {
                return Err(ConnectionError::InterfaceGone(interface.reference().to_string()));
            }
        }

        CONNECTIONS_LIVE.inc();
        info!(connection = %connection.key, message_type = %a.message_type(), "Connection created");
        Ok(connection)
    }

    /// Symmetric identity.
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Release both interface bindings and notify observers.
    ///
    /// Returns `false` if the connection was already destroyed.
    pub fn destroy(&self) -> bool {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            info!(connection = %self.key, "Connection already destroyed");
            return false;
        }

        let sides: Vec<Side> = std::mem::take(&mut *self.sides.lock());
        let was_live = sides.iter().all(|s| s.observer.is_some());
        for side in sides {
            let Some(interface) = side.interface.upgrade() else {
                continue;
            };
            if let Some(id) = side.observer {
                interface.dont_notify_on_death(id);
            }
            if let Err(e) = interface.unregister_user(&side.peer_user, &side.peer_comm_id) {
                debug!(interface = %interface.reference(), error = %e, "Peer already unregistered");
            }
        }

        if was_live {
            CONNECTIONS_LIVE.dec();
        }
        info!(connection = %self.key, "Connection destroyed");
        self.death.fire();
        true
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

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("key", &self.key.to_string())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
