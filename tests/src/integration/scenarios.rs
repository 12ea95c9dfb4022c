//! # Core Scenarios
//!
//! Container, interface and connection rules exercised through the public
//! APIs of rc-01, rc-02 and rc-03 together, over a real in-memory bus.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use rc_01_endpoints::{
        ClientNotifier, Container, DeliveryConfig, DeliveryPool, Endpoint, InterfaceSpec,
    };
    use rc_02_connection::{Connection, ConnectionError};
    use rc_03_rpc_gateway::{codes, Avatar, ClientSink};
    use shared_bus::{CommManager, InMemoryCommBus, MessageFilter, Subscription};
    use shared_types::{
        ErrorKind, InterfaceMessage, MessageContent, MsgType, NodeSpec, ParameterValue,
    };

    // =========================================================================
    // FIXTURES
    // =========================================================================

    #[derive(Default)]
    struct Updates {
        connected: Mutex<Vec<(String, bool)>>,
    }

    impl ClientNotifier for Updates {
        fn container_update(&self, tag: &str, connected: bool) {
            self.connected.lock().push((tag.to_string(), connected));
        }

        fn received_from_interface(&self, _: &str, _: &str, _: InterfaceMessage) {}

        fn deliver_to_robot(&self, _: &str, _: InterfaceMessage) {}
    }

    struct NullSink;

    impl ClientSink for NullSink {
        fn container_status(&self, _: &str, _: &str, _: bool) {}
        fn deliver(&self, _: &str, _: &str, _: &str, _: InterfaceMessage) {}
    }

    struct World {
        bus: Arc<InMemoryCommBus>,
        pool: Arc<DeliveryPool>,
        updates: Arc<Updates>,
        notifier: Arc<dyn ClientNotifier>,
        env: Subscription,
    }

    impl World {
        fn new() -> Self {
            let bus = Arc::new(InMemoryCommBus::new("ZZMASTER"));
            let env = bus.subscribe(MessageFilter::all());
            let updates = Arc::new(Updates::default());
            let notifier: Arc<dyn ClientNotifier> = updates.clone();
            Self {
                bus,
                pool: DeliveryPool::start(DeliveryConfig::default()),
                updates,
                notifier,
                env,
            }
        }

        fn container(&self, tag: &str, comm_id: &str) -> Arc<Container> {
            Container::new(
                tag,
                comm_id,
                self.bus.clone(),
                self.pool.clone(),
                Arc::downgrade(&self.notifier),
            )
        }

        fn avatar(&self) -> Arc<Avatar> {
            Avatar::new("alice", self.bus.clone(), self.pool.clone(), Arc::new(NullSink))
        }

        fn drain(&mut self) -> Vec<shared_types::RoutedMessage> {
            let mut out = Vec::new();
            while let Ok(Some(msg)) = self.env.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    fn spec(tag: &str, itype: &str, message_type: &str, address: &str) -> InterfaceSpec {
        InterfaceSpec {
            tag: tag.into(),
            itype: itype.parse().unwrap(),
            message_type: message_type.parse().unwrap(),
            address: Some(address.into()),
        }
    }

    // =========================================================================
    // CONTAINER LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_start_twice_and_stop_before_start_are_protocol_errors() {
        let w = World::new();
        let c = w.container("C1", "COc1");
        assert_eq!(c.stop().unwrap_err().kind(), ErrorKind::Protocol);
        c.start().unwrap();
        assert_eq!(c.start().unwrap_err().kind(), ErrorKind::Protocol);
        c.stop().unwrap();
        assert!(!c.is_running());
    }

    #[tokio::test]
    async fn test_connected_flag_rules() {
        let w = World::new();
        let c = w.container("C1", "COc1");
        assert_eq!(
            c.set_connected_flag(true).unwrap_err().kind(),
            ErrorKind::Protocol
        );

        c.start().unwrap();
        c.set_connected_flag(true).unwrap();
        assert_eq!(
            c.set_connected_flag(true).unwrap_err().kind(),
            ErrorKind::Protocol
        );
        c.set_connected_flag(false).unwrap();
        c.set_connected_flag(false).unwrap();
        c.set_connected_flag(true).unwrap();

        let updates = w.updates.connected.lock().clone();
        assert_eq!(updates.first(), Some(&("C1".to_string(), true)));
        assert_eq!(updates.len(), 4);
    }

    // =========================================================================
    // INTERFACES AND ADDRESSES
    // =========================================================================

    #[tokio::test]
    async fn test_interface_readd_is_idempotent_only_when_identical() {
        let w = World::new();
        let c = w.container("C1", "COc1");
        c.add_interface(spec("i1", "PublisherInterface", "std/Type", "/a"))
            .unwrap();
        c.add_interface(spec("i1", "PublisherInterface", "std/Type", "/a"))
            .unwrap();

        let err = c
            .add_interface(spec("i1", "SubscriberInterface", "std/Type", "/a"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(c.interface_tags(), vec!["i1".to_string()]);
    }

    #[tokio::test]
    async fn test_address_reservation() {
        let w = World::new();
        let c = w.container("C1", "COc1");
        c.add_interface(spec("i1", "PublisherInterface", "std/Type", "/a"))
            .unwrap();
        assert!(c.is_address_reserved("/a"));

        let err = c.reserve_address("/a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = c
            .add_interface(spec("i2", "PublisherInterface", "std/Type", "/a"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Freeing an unreserved address is a no-op.
        c.free_address("/never");
        c.remove_interface("i1").unwrap();
        assert!(!c.is_address_reserved("/a"));
        c.add_interface(spec("i2", "PublisherInterface", "std/Type", "/a"))
            .unwrap();
    }

    #[tokio::test]
    async fn test_removing_unknown_interface_raises_but_node_removal_does_not() {
        let mut w = World::new();
        let c = w.container("C1", "COc1");
        c.start().unwrap();
        assert_eq!(
            c.remove_interface("ghost").unwrap_err().kind(),
            ErrorKind::InvalidRequest
        );
        c.remove_node("ghost").unwrap();

        let sent = w.drain();
        let removal = sent.last().unwrap();
        assert_eq!(removal.msg_type, MsgType::ComponentRemove);
        assert_eq!(removal.dest, "COc1");
    }

    // =========================================================================
    // CONNECTIONS
    // =========================================================================

    #[tokio::test]
    async fn test_connection_type_and_kind_rules() {
        let w = World::new();
        let c1 = w.container("C1", "COc1");
        let c2 = w.container("C2", "COc2");
        c1.add_interface(spec("pub", "PublisherInterface", "std/Type", "/a"))
            .unwrap();
        c2.add_interface(spec("sub", "SubscriberInterface", "std/Type", "/b"))
            .unwrap();
        c2.add_interface(spec("other", "SubscriberInterface", "std/Other", "/c"))
            .unwrap();
        c2.add_interface(spec("pub2", "PublisherInterface", "std/Type", "/d"))
            .unwrap();

        let a = c1.get_interface("pub").unwrap();
        let err = Connection::create(a.clone(), c2.get_interface("other").unwrap()).unwrap_err();
        assert!(matches!(err, ConnectionError::TypeMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = Connection::create(a.clone(), c2.get_interface("pub2").unwrap()).unwrap_err();
        assert!(matches!(err, ConnectionError::NotConnectable { .. }));

        let conn = Connection::create(a, c2.get_interface("sub").unwrap()).unwrap();
        assert_eq!(conn.key().to_string(), "C1/pub <-> C2/sub");
        assert!(conn.destroy());
        assert!(!conn.destroy());
    }

    #[tokio::test]
    async fn test_duplicate_connection_is_rejected() {
        let w = World::new();
        let avatar = w.avatar();
        for (tag, comm_id) in [("C1", "COc1"), ("C2", "COc2")] {
            avatar.reserve_container(tag, comm_id).unwrap();
        }
        avatar
            .add_interface("C1", spec("i1", "PublisherInterface", "std/Type", "/a"))
            .unwrap();
        avatar
            .add_interface("C2", spec("i2", "SubscriberInterface", "std/Type", "/b"))
            .unwrap();

        avatar.add_connection("C1/i1", "C2/i2").unwrap();
        let err = avatar.add_connection("C1/i1", "C2/i2").unwrap_err();
        assert_eq!(err.code, codes::INVALID_REQUEST);
        assert!(err.message.contains("already connected"));
    }

    #[tokio::test]
    async fn test_destroying_an_endpoint_cascades_to_connections() {
        let w = World::new();
        let avatar = w.avatar();
        avatar.reserve_container("C1", "COc1").unwrap();
        avatar.reserve_container("C2", "COc2").unwrap();
        avatar
            .add_interface("C1", spec("i1", "PublisherInterface", "std/Type", "/a"))
            .unwrap();
        avatar
            .add_interface("C2", spec("i2", "SubscriberInterface", "std/Type", "/b"))
            .unwrap();
        avatar.add_connection("C1/i1", "C2/i2").unwrap();

        let c2 = avatar.take_container("C2").unwrap();
        c2.destroy();
        assert!(avatar.connection_keys().is_empty());
        assert!(!avatar
            .container("C1")
            .unwrap()
            .get_interface("i1")
            .unwrap()
            .has_user("C2/i2"));
    }

    // =========================================================================
    // END-TO-END CONTAINER SCENARIOS
    // =========================================================================

    #[tokio::test]
    async fn test_node_interface_activation_scenario() {
        let mut w = World::new();
        let c = w.container("C1", "COc1");
        c.start().unwrap();
        c.add_node(NodeSpec {
            tag: "n1".into(),
            package: "pkg_a".into(),
            executable: "exe_a".into(),
            args: String::new(),
            name: String::new(),
            namespace: "/ns".into(),
        })
        .unwrap();
        c.add_interface(spec("i1", "PublisherInterface", "std/Type", "/i1"))
            .unwrap();

        // Not connected yet.
        let err = c
            .deactivate_interface("i1", "robotX", "comm1")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        c.set_connected_flag(true).unwrap();
        c.activate_interface("i1", "robotX", "comm1").unwrap();
        assert!(c.get_interface("i1").unwrap().has_user("robotX"));
        c.deactivate_interface("i1", "robotX", "comm1").unwrap();

        let sent = w.drain();
        assert_eq!(sent[0].msg_type, MsgType::ContainerStart);
        assert!(matches!(
            &sent[1].content,
            MessageContent::Node(node) if node.namespace == "/ns"
        ));
    }

    #[tokio::test]
    async fn test_illegal_parameter_name_routes_nothing() {
        let mut w = World::new();
        let c = w.container("C1", "COc1");
        c.start().unwrap();
        w.drain();

        let err = c
            .add_parameter("1bad-name", ParameterValue::Int(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(w.drain().is_empty());
        assert_eq!(w.bus.comm_id(), "ZZMASTER");
    }
}
