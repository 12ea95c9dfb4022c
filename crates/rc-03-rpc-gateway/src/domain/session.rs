//! Session manager: user → avatar, plus the container directory.
//!
//! The directory maps container communication IDs to containers so the
//! inbound bus router can dispatch environment messages without knowing
//! which client owns the container.

use dashmap::DashMap;
use rc_01_endpoints::{Container, DeliveryPool, Endpoint};
use shared_bus::CommManager;
use shared_types::CommId;
use std::sync::{Arc, Weak};
use tracing::info;

use super::avatar::Avatar;
use super::params::{ContainerInfo, RobotInfo};
use crate::ports::ClientSink;

/// All live client sessions.
pub struct SessionManager {
    avatars: DashMap<String, Arc<Avatar>>,
    directory: DashMap<CommId, Weak<Container>>,
    comm: Arc<dyn CommManager>,
    pool: Arc<DeliveryPool>,
    sink: Arc<dyn ClientSink>,
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new(
        comm: Arc<dyn CommManager>,
        pool: Arc<DeliveryPool>,
        sink: Arc<dyn ClientSink>,
    ) -> Self {
        Self {
            avatars: DashMap::new(),
            directory: DashMap::new(),
            comm,
            pool,
            sink,
        }
    }

    /// Avatar of `user_id`, created on first use.
    pub fn avatar(&self, user_id: &str) -> Arc<Avatar> {
        self.avatars
            .entry(user_id.to_string())
            .or_insert_with(|| {
                info!(user = %user_id, "Session opened");
                Avatar::new(
                    user_id,
                    self.comm.clone(),
                    self.pool.clone(),
                    self.sink.clone(),
                )
            })
            .clone()
    }

    /// Avatar of `user_id` if a session exists.
    pub fn existing(&self, user_id: &str) -> Option<Arc<Avatar>> {
        self.avatars.get(user_id).map(|a| a.clone())
    }

    /// Close a session and tear down everything it owns. Returns the
    /// communication IDs of the destroyed containers.
    pub fn close(&self, user_id: &str) -> Vec<CommId> {
        let Some((_, avatar)) = self.avatars.remove(user_id) else {
            return Vec::new();
        };
        let released: Vec<CommId> = avatar
            .destroy()
            .iter()
            .map(|c| c.comm_id().to_string())
            .collect();
        for comm_id in &released {
            self.directory.remove(comm_id);
        }
        info!(user = %user_id, containers = released.len(), "Session closed");
        released
    }

    /// Close every session.
    pub fn close_all(&self) -> Vec<CommId> {
        let users: Vec<String> = self.avatars.iter().map(|e| e.key().clone()).collect();
        users.iter().flat_map(|u| self.close(u)).collect()
    }

    /// Users with a live session, sorted.
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.avatars.iter().map(|e| e.key().clone()).collect();
        users.sort();
        users
    }

    // =========================================================================
    // CONTAINER DIRECTORY
    // =========================================================================

    /// Make a container reachable by its communication ID.
    pub fn register_container(&self, container: &Arc<Container>) {
        self.directory
            .insert(container.comm_id().to_string(), Arc::downgrade(container));
    }

    /// Remove a container from the directory.
    pub fn forget_container(&self, comm_id: &str) {
        self.directory.remove(comm_id);
    }

    /// Live container behind a communication ID.
    pub fn container_by_comm_id(&self, comm_id: &str) -> Option<Arc<Container>> {
        self.directory.get(comm_id).and_then(|c| c.upgrade())
    }

    // =========================================================================
    // LISTINGS
    // =========================================================================

    /// Containers of one user, or of everyone.
    pub fn container_infos(&self, user: Option<&str>) -> Vec<ContainerInfo> {
        self.avatars_of(user)
            .into_iter()
            .flat_map(|avatar| {
                avatar
                    .containers()
                    .into_iter()
                    .map(|c| ContainerInfo {
                        user: avatar.user_id().to_string(),
                        tag: c.tag().to_string(),
                        comm_id: c.comm_id().to_string(),
                        running: c.is_running(),
                        connected: c.is_connected(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Robots of one user, or of everyone.
    pub fn robot_infos(&self, user: Option<&str>) -> Vec<RobotInfo> {
        self.avatars_of(user)
            .into_iter()
            .flat_map(|avatar| {
                avatar
                    .robots()
                    .into_iter()
                    .map(|r| RobotInfo {
                        user: avatar.user_id().to_string(),
                        robot_id: r.tag().to_string(),
                        interfaces: r.interface_tags(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn avatars_of(&self, user: Option<&str>) -> Vec<Arc<Avatar>> {
        match user {
            Some(user) => self.existing(user).into_iter().collect(),
            None => {
                let mut avatars: Vec<Arc<Avatar>> =
                    self.avatars.iter().map(|e| e.value().clone()).collect();
                avatars.sort_by(|a, b| a.user_id().cmp(b.user_id()));
                avatars
            }
        }
    }

    /// Delivery pool shared by all sessions.
    pub fn pool(&self) -> &Arc<DeliveryPool> {
        &self.pool
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.avatars.len())
            .field("directory", &self.directory.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::mocks::{RecordingComm, RecordingSink};
    use rc_01_endpoints::DeliveryConfig;

    fn manager() -> SessionManager {
        SessionManager::new(
            Arc::new(RecordingComm::default()),
            DeliveryPool::start(DeliveryConfig::default()),
            Arc::new(RecordingSink::default()),
        )
    }

    #[tokio::test]
    async fn test_avatar_created_once() {
        let sessions = manager();
        let a = sessions.avatar("alice");
        let b = sessions.avatar("alice");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(sessions.existing("bob").is_none());
        assert_eq!(sessions.users(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_directory_and_close() {
        let sessions = manager();
        let alice = sessions.avatar("alice");
        let c = alice.reserve_container("C1", "COc1").unwrap();
        sessions.register_container(&c);
        assert!(sessions.container_by_comm_id("COc1").is_some());
        drop(c);

        assert_eq!(sessions.close("alice"), vec!["COc1".to_string()]);
        assert!(sessions.container_by_comm_id("COc1").is_none());
        assert!(sessions.close("alice").is_empty());
    }

    #[tokio::test]
    async fn test_listings() {
        let sessions = manager();
        sessions.avatar("bob").reserve_container("B1", "COb1").unwrap();
        let alice = sessions.avatar("alice");
        alice.reserve_container("A1", "COa1").unwrap();
        alice.register_robot("robotA", "ZZr").unwrap();

        let all = sessions.container_infos(None);
        assert_eq!(
            all.iter().map(|c| c.tag.as_str()).collect::<Vec<_>>(),
            vec!["A1", "B1"]
        );
        assert_eq!(sessions.container_infos(Some("bob")).len(), 1);
        assert!(sessions.container_infos(Some("carol")).is_empty());
        assert_eq!(sessions.robot_infos(None)[0].robot_id, "robotA");
        assert!(sessions.robot_infos(Some("bob")).is_empty());
    }
}
