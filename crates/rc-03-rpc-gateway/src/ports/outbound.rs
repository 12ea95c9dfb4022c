//! Outbound ports for the RPC gateway.
//!
//! The gateway owns sessions; everything outside them is reached through
//! these traits and wired in by the master process.

use async_trait::async_trait;
use shared_bus::CommManager;
use shared_types::{CommId, InterfaceMessage};
use std::sync::Arc;

use crate::domain::error::{RealmError, UserError};
use crate::domain::params::MachineInfo;

/// Cluster of machines hosting container environments.
#[async_trait]
pub trait Realm: Send + Sync {
    /// Bus used by containers to reach their environments.
    fn comm_manager(&self) -> Arc<dyn CommManager>;

    /// Fresh, globally unique container communication ID.
    fn new_comm_id(&self) -> CommId;

    /// Resolve once the environment behind `comm_id` reported itself
    /// connected.
    async fn await_container_ready(&self, comm_id: &str) -> Result<(), RealmError>;

    /// Forget a container's environment.
    fn release_container(&self, comm_id: &str);

    /// Machines for administrative listing.
    fn machines(&self) -> Vec<MachineInfo>;
}

/// Push channel towards connected robot clients.
pub trait ClientSink: Send + Sync {
    /// Connectivity of one of `user_id`'s containers changed.
    fn container_status(&self, user_id: &str, tag: &str, connected: bool);

    /// Push a message to robot `robot_id` of `user_id`.
    fn deliver(&self, user_id: &str, robot_id: &str, endpoint_tag: &str, msg: InterfaceMessage);
}

/// Credential store behind the console view.
pub trait UserRegistry: Send + Sync {
    /// All user names, sorted.
    fn list_users(&self) -> Vec<String>;

    /// Create a user.
    fn add_user(&self, name: &str, password: &str) -> Result<(), UserError>;

    /// Delete a user.
    fn remove_user(&self, name: &str) -> Result<(), UserError>;

    /// Replace a user's password.
    fn update_user(&self, name: &str, password: &str) -> Result<(), UserError>;

    /// Check a password.
    fn verify(&self, name: &str, password: &str) -> bool;
}
