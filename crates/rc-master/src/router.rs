//! Inbound bus router.
//!
//! Environment messages are addressed to the master and carry the
//! container's commID as origin. The router resolves the origin through the
//! session directory and hands the message to the owning container.

use rc_01_endpoints::Container;
use rc_03_rpc_gateway::SessionManager;
use rc_telemetry::INBOUND_DROPPED;
use shared_bus::{describe, MessageFilter};
use shared_types::{MessageContent, MsgType, RoutedMessage};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::adapters::LocalRealm;

/// Dispatches environment messages to containers.
pub struct InboundRouter {
    sessions: Arc<SessionManager>,
    realm: Arc<LocalRealm>,
}

impl InboundRouter {
    /// Create a router over the session directory.
    pub fn new(sessions: Arc<SessionManager>, realm: Arc<LocalRealm>) -> Self {
        Self { sessions, realm }
    }

    /// Filter selecting traffic addressed to the master.
    pub fn filter(master_comm_id: &str) -> MessageFilter {
        MessageFilter::to(master_comm_id).with_types([
            MsgType::ContainerStatus,
            MsgType::InterfaceData,
            MsgType::InterfaceActivate,
            MsgType::InterfaceDeactivate,
        ])
    }

    /// Route one message.
    pub fn route(&self, msg: RoutedMessage) {
        let Some(container) = self.sessions.container_by_comm_id(&msg.orig) else {
            INBOUND_DROPPED.inc();
            warn!(msg = %describe(&msg), "Message from unknown origin dropped");
            return;
        };
        let summary = describe(&msg);
        self.dispatch(&container, msg, &summary);
    }

    fn dispatch(&self, container: &Container, msg: RoutedMessage, summary: &str) {
        let result = match (msg.msg_type, msg.content) {
            (MsgType::ContainerStatus, MessageContent::Status { connected }) => {
                self.realm.mark_connected(&msg.orig, connected);
                container.set_connected_flag(connected)
            }
            (MsgType::InterfaceData, MessageContent::Data(data)) => container.receive(data),
            (
                MsgType::InterfaceActivate,
                MessageContent::Binding {
                    interface_tag,
                    user_id,
                    comm_id,
                },
            ) => container.activate_interface(&interface_tag, &user_id, &comm_id),
            (
                MsgType::InterfaceDeactivate,
                MessageContent::Binding {
                    interface_tag,
                    user_id,
                    comm_id,
                },
            ) => container.deactivate_interface(&interface_tag, &user_id, &comm_id),
            (msg_type, content) => {
                INBOUND_DROPPED.inc();
                warn!(
                    msg_type = %msg_type,
                    content = content.variant_name(),
                    "Unexpected inbound message dropped"
                );
                return;
            }
        };

        match result {
            Ok(()) => debug!(msg = %summary, "Inbound message routed"),
            Err(e) => error!(msg = %summary, error = %e, "Inbound message failed"),
        }
    }

    /// Route every message of `messages` until it ends or shutdown is
    /// signalled.
    pub async fn run(
        self,
        mut messages: impl Stream<Item = RoutedMessage> + Unpin,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                msg = messages.next() => match msg {
                    Some(msg) => self.route(msg),
                    None => break,
                },
                _ = shutdown.changed() => {
                    info!("Inbound router stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_01_endpoints::{DeliveryConfig, DeliveryPool, Endpoint};
    use rc_03_rpc_gateway::ClientSink;
    use shared_bus::{CommManager, InMemoryCommBus};
    use shared_types::InterfaceMessage;
    use std::time::Duration;

    use crate::adapters::{ChannelClientSink, ClientEvent};

    struct Fixture {
        router: InboundRouter,
        sessions: Arc<SessionManager>,
        realm: Arc<LocalRealm>,
        events: tokio::sync::mpsc::Receiver<ClientEvent>,
        container: Arc<Container>,
    }

    fn fixture() -> Fixture {
        let bus: Arc<dyn CommManager> = Arc::new(InMemoryCommBus::new("ZZMASTER"));
        let (sink, events) = ChannelClientSink::new(16);
        let sink: Arc<dyn ClientSink> = Arc::new(sink);
        let sessions = Arc::new(SessionManager::new(
            bus.clone(),
            DeliveryPool::start(DeliveryConfig::default()),
            sink,
        ));
        let realm = Arc::new(LocalRealm::new(bus, Duration::from_millis(100), 4));
        let container = sessions
            .avatar("alice")
            .reserve_container("C1", "COc1")
            .unwrap();
        sessions.register_container(&container);
        container.start().unwrap();
        Fixture {
            router: InboundRouter::new(sessions.clone(), realm.clone()),
            sessions,
            realm,
            events,
            container,
        }
    }

    fn from(orig: &str, msg_type: MsgType, content: MessageContent) -> RoutedMessage {
        RoutedMessage {
            msg_type,
            dest: "ZZMASTER".into(),
            orig: orig.into(),
            content,
        }
    }

    #[tokio::test]
    async fn test_status_sets_flag_and_readiness() {
        let mut f = fixture();
        f.router.route(from(
            "COc1",
            MsgType::ContainerStatus,
            MessageContent::Status { connected: true },
        ));
        assert!(f.container.is_connected());
        assert_eq!(f.realm.active_containers(), 1);
        assert_eq!(
            f.events.recv().await.unwrap(),
            ClientEvent::ContainerStatus {
                user: "alice".into(),
                tag: "C1".into(),
                connected: true
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_origin_dropped() {
        let f = fixture();
        let before = INBOUND_DROPPED.get();
        f.router.route(from(
            "COghost",
            MsgType::ContainerStatus,
            MessageContent::Status { connected: true },
        ));
        assert!(INBOUND_DROPPED.get() >= before + 1.0);
        assert!(!f.container.is_connected());
    }

    #[tokio::test]
    async fn test_activation_requires_connection() {
        let f = fixture();
        let binding = || MessageContent::Binding {
            interface_tag: "i1".into(),
            user_id: "robotX".into(),
            comm_id: "ZZr".into(),
        };
        // Not connected: logged, nothing changes.
        f.router
            .route(from("COc1", MsgType::InterfaceActivate, binding()));
        assert!(f.container.interface_tags().is_empty());

        f.router.route(from(
            "COc1",
            MsgType::ContainerStatus,
            MessageContent::Status { connected: true },
        ));
        f.router
            .route(from("COc1", MsgType::InterfaceDeactivate, binding()));
        assert!(f.container.is_connected());
    }

    #[tokio::test]
    async fn test_data_for_unknown_interface_is_logged() {
        let f = fixture();
        f.router.route(from(
            "COc1",
            MsgType::InterfaceData,
            MessageContent::Data(InterfaceMessage {
                interface_tag: "nope".into(),
                msg_id: String::new(),
                type_name: "std/Type".into(),
                payload: serde_json::Value::Null,
            }),
        ));
        assert!(f.sessions.container_by_comm_id("COc1").is_some());
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let f = fixture();
        let (tx, rx) = watch::channel(false);
        let (msg_tx, msg_rx) = tokio::sync::mpsc::unbounded_channel();
        let stream = tokio_stream::wrappers::UnboundedReceiverStream::new(msg_rx);
        let container = f.container.clone();
        let task = tokio::spawn(f.router.run(stream, rx));

        msg_tx
            .send(from(
                "COc1",
                MsgType::ContainerStatus,
                MessageContent::Status { connected: true },
            ))
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !container.is_connected() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
