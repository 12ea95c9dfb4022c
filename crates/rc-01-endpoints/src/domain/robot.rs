//! Robots: remote clients that own robot-side interfaces.
//!
//! A robot's interfaces are converters or forwarders. Messages pushed by the
//! robot enter through [`Robot::robot_message`]; messages for the robot leave
//! through [`ClientNotifier::deliver_to_robot`].

use shared_types::{names, CommId, InterfaceMessage};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use super::errors::{EndpointError, EndpointResult};
use super::interface::{Interface, InterfaceSpec};
use super::lifecycle::{DeathCallback, DeathNotifier, ObserverId};
use super::table::{Insertion, InterfaceTable};
use crate::delivery::{DeliveryJob, DeliveryPool};
use crate::ports::inbound::{Endpoint, EndpointKind};
use crate::ports::outbound::ClientNotifier;

/// A connected robot client.
pub struct Robot {
    id: String,
    comm_id: CommId,
    pool: Arc<DeliveryPool>,
    client: Weak<dyn ClientNotifier>,
    interfaces: InterfaceTable,
    death: DeathNotifier,
    me: Weak<Robot>,
}

impl Robot {
    /// Register a robot reached through `comm_id`.
    pub fn new(
        id: &str,
        comm_id: &str,
        pool: Arc<DeliveryPool>,
        client: Weak<dyn ClientNotifier>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id: id.to_string(),
            comm_id: comm_id.to_string(),
            pool,
            client,
            interfaces: InterfaceTable::default(),
            death: DeathNotifier::new(),
            me: me.clone(),
        })
    }

    /// Dispatch a message pushed by the robot into the interface it names.
    ///
    /// # Errors
    ///
    /// `InterfaceNotFound` for an unknown tag, `Delivery` if the pool
    /// rejects the job.
    pub fn robot_message(&self, msg: InterfaceMessage) -> EndpointResult<()> {
        let interface = self.get_interface(&msg.interface_tag)?;
        self.pool.submit(DeliveryJob::Receive { interface, msg })?;
        Ok(())
    }
}

impl Endpoint for Robot {
    fn tag(&self) -> &str {
        &self.id
    }

    fn comm_id(&self) -> &str {
        &self.comm_id
    }

    fn kind(&self) -> EndpointKind {
        EndpointKind::Robot
    }

    fn add_interface(&self, mut spec: InterfaceSpec) -> EndpointResult<()> {
        names::validate_tag(&spec.tag)?;
        if !spec.itype.binding.is_robot_side() {
            return Err(EndpointError::WrongBinding {
                itype: spec.itype.to_string(),
                endpoint: "robot",
            });
        }
        spec.address = None;

        let owner: Weak<dyn Endpoint> = self.me.clone();
        let inserted = self.interfaces.insert(&spec, || {
            Ok(Interface::new(spec.clone(), owner, &self.id, &self.comm_id, None))
        })?;

        if inserted == Insertion::Created {
            info!(robot = %self.id, interface = %spec.tag, itype = %spec.itype, "Add interface");
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
        info!(robot = %self.id, interface = %tag, "Remove interface");
        Ok(())
    }

    fn interface_tags(&self) -> Vec<String> {
        self.interfaces.tags()
    }

    fn forward_to_endpoint(&self, _user_id: &str, msg: InterfaceMessage) -> EndpointResult<()> {
        let client = self
            .client
            .upgrade()
            .ok_or_else(|| EndpointError::EndpointGone(msg.interface_tag.clone()))?;
        client.deliver_to_robot(&self.id, msg);
        Ok(())
    }

    fn received_from_interface(&self, user_id: &str, msg: InterfaceMessage) {
        match self.client.upgrade() {
            Some(client) => client.received_from_interface(&self.id, user_id, msg),
            None => debug!(robot = %self.id, "No client for interface message"),
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
        info!(robot = %self.id, "Robot destroyed");
        self.death.fire();
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("id", &self.id)
            .field("comm_id", &self.comm_id)
            .field("interfaces", &self.interfaces.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{DeliveryConfig, DeliveryError};
    use crate::ports::outbound::mocks::{Notification, RecordingNotifier};
    use serde_json::json;
    use shared_types::ErrorKind;
    use std::time::Duration;

    fn robot_with(config: DeliveryConfig) -> (Arc<Robot>, Arc<RecordingNotifier>, Arc<DeliveryPool>) {
        let client = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn ClientNotifier> = client.clone();
        let pool = DeliveryPool::start(config);
        let robot = Robot::new("robotA", "ZZrobotA", pool.clone(), Arc::downgrade(&notifier));
        (robot, client, pool)
    }

    fn converter(tag: &str) -> InterfaceSpec {
        InterfaceSpec {
            tag: tag.into(),
            itype: "SubscriberConverter".parse().unwrap(),
            message_type: "std/Type".parse().unwrap(),
            address: Some("/ignored".into()),
        }
    }

    fn data(tag: &str, type_name: &str) -> InterfaceMessage {
        InterfaceMessage {
            interface_tag: tag.into(),
            msg_id: "7".into(),
            type_name: type_name.into(),
            payload: json!({"x": 1}),
        }
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_robot_rejects_container_binding() {
        let (robot, _, _) = robot_with(DeliveryConfig::default());
        let mut spec = converter("r1");
        spec.itype = "PublisherInterface".parse().unwrap();
        let err = robot.add_interface(spec).unwrap_err();
        assert!(matches!(err, EndpointError::WrongBinding { endpoint: "robot", .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_robot_interface_has_no_address() {
        let (robot, _, _) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        robot.add_interface(converter("r1")).unwrap();
        let iface = robot.get_interface("r1").unwrap();
        assert_eq!(iface.address(), None);
        assert_eq!(iface.reference().to_string(), "robotA/r1");
        assert_eq!(iface.endpoint_comm_id(), "ZZrobotA");
    }

    #[tokio::test]
    async fn test_robot_message_unknown_interface() {
        let (robot, _, _) = robot_with(DeliveryConfig::default());
        let err = robot.robot_message(data("ghost", "std/Type")).unwrap_err();
        assert_eq!(err, EndpointError::InterfaceNotFound("ghost".into()));
    }

    #[tokio::test]
    async fn test_robot_message_fans_out_to_users() {
        let (robot, client, _) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        let iface = robot.get_interface("r1").unwrap();
        iface.register_user("C1/i1", "COc1");
        iface.register_user("C2/i1", "COc2");

        robot.robot_message(data("r1", "std/Type")).unwrap();
        wait_for(|| client.events.lock().len() == 2).await;

        let mut users: Vec<String> = client
            .take()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Received { endpoint_tag, user_id, .. } if endpoint_tag == "robotA" => {
                    Some(user_id)
                }
                _ => None,
            })
            .collect();
        users.sort();
        assert_eq!(users, vec!["C1/i1".to_string(), "C2/i1".to_string()]);
    }

    #[tokio::test]
    async fn test_interface_send_reaches_robot() {
        let (robot, client, _) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        let iface = robot.get_interface("r1").unwrap();

        let mut msg = data("peer_tag", "std/Type");
        msg.msg_id = "9".into();
        iface.send(msg, "C1/i1").unwrap();

        let events = client.take();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Notification::ToRobot(id, msg) => {
                assert_eq!(id, "robotA");
                assert_eq!(msg.interface_tag, "r1");
                assert_eq!(msg.msg_id, "9");
            }
            other => panic!("unexpected notification {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interface_send_type_mismatch() {
        let (robot, _, _) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        let iface = robot.get_interface("r1").unwrap();
        let err = iface.send(data("r1", "other/Type"), "C1/i1").unwrap_err();
        assert!(matches!(err, EndpointError::MessageTypeMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_unregister_unknown_user() {
        let (robot, _, _) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        let iface = robot.get_interface("r1").unwrap();
        iface.register_user("u", "c");
        iface.register_user("u", "c");
        assert_eq!(iface.users().len(), 1);
        iface.unregister_user("u", "c").unwrap();
        assert!(iface.unregister_user("u", "c").is_err());
    }

    #[tokio::test]
    async fn test_removed_interface_stops_traffic() {
        let (robot, client, _) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        let iface = robot.get_interface("r1").unwrap();
        iface.register_user("C1/i1", "COc1");

        robot.remove_interface("r1").unwrap();
        assert!(iface.is_detached());
        assert!(iface.users().is_empty());
        iface.send(data("r1", "std/Type"), "C1/i1").unwrap();
        iface.receive(data("r1", "std/Type"));
        assert!(client.take().is_empty());
        assert!(robot.remove_interface("r1").is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_pool_discards_jobs_for_removed_interface() {
        let (robot, client, _) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        robot
            .get_interface("r1")
            .unwrap()
            .register_user("C1/i1", "COc1");

        // Workers cannot run before this task yields.
        robot.robot_message(data("r1", "std/Type")).unwrap();
        robot.remove_interface("r1").unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.take().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_pool_saturation_rejects() {
        let (robot, _, _) = robot_with(DeliveryConfig {
            workers: 1,
            queue_capacity: 2,
        });
        robot.add_interface(converter("r1")).unwrap();

        robot.robot_message(data("r1", "std/Type")).unwrap();
        robot.robot_message(data("r1", "std/Type")).unwrap();
        let err = robot.robot_message(data("r1", "std/Type")).unwrap_err();
        assert_eq!(err, EndpointError::Delivery(DeliveryError::Saturated));
    }

    #[tokio::test]
    async fn test_pool_shutdown_drains_then_stops() {
        let (robot, client, pool) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        robot
            .get_interface("r1")
            .unwrap()
            .register_user("C1/i1", "COc1");

        robot.robot_message(data("r1", "std/Type")).unwrap();
        pool.shutdown().await;
        assert_eq!(client.take().len(), 1);

        let err = robot.robot_message(data("r1", "std/Type")).unwrap_err();
        assert_eq!(err, EndpointError::Delivery(DeliveryError::Stopped));
    }

    #[tokio::test]
    async fn test_destroy_fires_observers_once() {
        let (robot, _, _) = robot_with(DeliveryConfig::default());
        robot.add_interface(converter("r1")).unwrap();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = count.clone();
        robot.notify_on_death(Box::new(move || {
            c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }));
        robot.destroy();
        robot.destroy();
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(robot.interface_tags().is_empty());

        // Observers registered after death run immediately.
        let c = count.clone();
        assert!(robot
            .notify_on_death(Box::new(move || {
                c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }))
            .is_none());
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
