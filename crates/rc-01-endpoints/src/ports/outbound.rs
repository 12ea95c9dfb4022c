//! Outbound (Driven) ports for the endpoints subsystem.
//!
//! Endpoints report upward to the client session that owns them.

use shared_types::InterfaceMessage;

/// Client session that owns containers and robots.
///
/// Endpoints hold this as a weak reference; a session that is gone simply
/// stops receiving notifications.
pub trait ClientNotifier: Send + Sync {
    /// Connectivity of a container changed.
    fn container_update(&self, tag: &str, connected: bool);

    /// A message left endpoint `endpoint_tag` through one of its interfaces
    /// and must reach `user_id` (a robot ID or a peer interface reference).
    fn received_from_interface(&self, endpoint_tag: &str, user_id: &str, msg: InterfaceMessage);

    /// A message must be pushed to the connected robot client `robot_id`.
    fn deliver_to_robot(&self, robot_id: &str, msg: InterfaceMessage);
}
