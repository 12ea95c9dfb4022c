//! Local realm: a single machine hosting every container environment.

use async_trait::async_trait;
use dashmap::DashMap;
use rc_03_rpc_gateway::{MachineInfo, Realm, RealmError};
use shared_bus::CommManager;
use shared_types::{CommId, CONTAINER_ADDRESS_PREFIX};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Realm backed by the local machine.
///
/// Readiness is kept per communication ID in a watch channel, so a status
/// report that arrives before `await_container_ready` is not lost.
pub struct LocalRealm {
    comm: Arc<dyn CommManager>,
    ready_timeout: Duration,
    capacity: usize,
    containers: DashMap<CommId, watch::Sender<bool>>,
}

impl LocalRealm {
    /// Create a realm that waits at most `ready_timeout` for environments.
    pub fn new(comm: Arc<dyn CommManager>, ready_timeout: Duration, capacity: usize) -> Self {
        Self {
            comm,
            ready_timeout,
            capacity,
            containers: DashMap::new(),
        }
    }

    /// Record the connectivity reported by the environment of `comm_id`.
    pub fn mark_connected(&self, comm_id: &str, connected: bool) {
        self.containers
            .entry(comm_id.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .send_replace(connected);
        debug!(comm_id, connected, "Container connectivity recorded");
    }

    /// Containers currently tracked.
    pub fn active_containers(&self) -> usize {
        self.containers.len()
    }

    fn readiness(&self, comm_id: &str) -> watch::Receiver<bool> {
        self.containers
            .entry(comm_id.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }
}

#[async_trait]
impl Realm for LocalRealm {
    fn comm_manager(&self) -> Arc<dyn CommManager> {
        Arc::clone(&self.comm)
    }

    fn new_comm_id(&self) -> CommId {
        format!(
            "{CONTAINER_ADDRESS_PREFIX}{}",
            uuid::Uuid::new_v4().simple()
        )
    }

    async fn await_container_ready(&self, comm_id: &str) -> Result<(), RealmError> {
        let mut ready = self.readiness(comm_id);
        let outcome = tokio::time::timeout(self.ready_timeout, ready.wait_for(|r| *r))
            .await
            .map(|r| r.is_ok());
        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => Err(RealmError::Released(comm_id.to_string())),
            Err(_) => {
                warn!(comm_id, timeout = ?self.ready_timeout, "Container did not become ready");
                Err(RealmError::Timeout(comm_id.to_string()))
            }
        }
    }

    fn release_container(&self, comm_id: &str) {
        if self.containers.remove(comm_id).is_some() {
            debug!(comm_id, "Container released");
        }
    }

    fn machines(&self) -> Vec<MachineInfo> {
        vec![MachineInfo {
            address: "localhost".to_string(),
            active_containers: self.active_containers(),
            capacity: self.capacity,
        }]
    }
}
