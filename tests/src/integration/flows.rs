//! # End-to-End Flows
//!
//! Drives a complete master (bus, router, loopback host, gateway) through
//! its HTTP router:
//!
//! ```text
//! POST /rpc ──► gateway ──► Container ──ContainerStart──► LoopbackHost
//!                              ▲                              │
//!                              └── InboundRouter ◄──Status────┘
//! ```
//!
//! 1. **Container lifecycle**: creation waits for the environment
//! 2. **Data paths**: environment → robot, robot → environment
//! 3. **Teardown**: destroying a container drops its connections
//! 4. **Timeout**: an environment that never reports rolls back

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rc_01_endpoints::Endpoint;
    use rc_03_rpc_gateway::codes;
    use rc_master::adapters::ClientEvent;
    use rc_master::{MasterConfig, MasterRuntime};
    use serde_json::{json, Value};
    use shared_bus::{CommManager, MessageFilter};
    use shared_types::{InterfaceMessage, MessageContent, MsgType, RoutedMessage};
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tower::ServiceExt;

    const WAIT: Duration = Duration::from_secs(2);

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn master(config: MasterConfig) -> (MasterRuntime, mpsc::Receiver<ClientEvent>) {
        let runtime = MasterRuntime::new(config).unwrap();
        let events = runtime.take_client_events().unwrap();
        runtime.start();
        (runtime, events)
    }

    async fn call(runtime: &MasterRuntime, user: &str, method: &str, params: Value) -> Value {
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        let request = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .header("x-client-id", user)
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = timeout(WAIT, runtime.gateway().router().oneshot(request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn ok(runtime: &MasterRuntime, user: &str, method: &str, params: Value) -> Value {
        let response = call(runtime, user, method, params).await;
        assert!(response.get("error").is_none(), "{method} failed: {response}");
        response["result"].clone()
    }

    fn interface(endpoint: &str, tag: &str, itype: &str, address: Option<&str>) -> Value {
        json!({
            "endpointTag": endpoint,
            "interfaceTag": tag,
            "interfaceType": itype,
            "messageType": "std/Type",
            "address": address,
        })
    }

    fn data(tag: &str, payload: Value) -> InterfaceMessage {
        InterfaceMessage {
            interface_tag: tag.into(),
            msg_id: "m1".into(),
            type_name: "std/Type".into(),
            payload,
        }
    }

    async fn next_message(events: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
        timeout(WAIT, async {
            loop {
                match events.recv().await {
                    Some(event @ ClientEvent::Message { .. }) => return event,
                    Some(_) => continue,
                    None => panic!("client event stream closed"),
                }
            }
        })
        .await
        .unwrap()
    }

    /// Container C1 with a publisher and a subscriber, robot R1 with the
    /// matching converters, connected both ways.
    async fn wired(runtime: &MasterRuntime) {
        ok(runtime, "alice", "createContainer", json!({"tag": "C1"})).await;
        ok(runtime, "alice", "registerRobot", json!({"robotId": "R1"})).await;
        for params in [
            interface("C1", "pub", "PublisherInterface", Some("/out")),
            interface("C1", "sub", "SubscriberInterface", Some("/in")),
            interface("R1", "rsub", "SubscriberConverter", None),
            interface("R1", "rpub", "PublisherConverter", None),
        ] {
            ok(runtime, "alice", "addInterface", params).await;
        }
        ok(runtime, "alice", "addConnection", json!({"tagA": "C1/pub", "tagB": "R1/rsub"})).await;
        ok(runtime, "alice", "addConnection", json!({"tagA": "R1/rpub", "tagB": "C1/sub"})).await;
    }

    fn comm_id_of(runtime: &MasterRuntime, user: &str, tag: &str) -> String {
        runtime
            .sessions()
            .container_infos(Some(user))
            .into_iter()
            .find(|c| c.tag == tag)
            .map(|c| c.comm_id)
            .unwrap()
    }

    // =========================================================================
    // CONTAINER LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_create_container_waits_for_environment() {
        let (runtime, mut events) = master(MasterConfig::default());

        let result = ok(&runtime, "alice", "createContainer", json!({"tag": "C1"})).await;
        assert_eq!(result, json!("Container C1 successfully created."));

        let status = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        assert_eq!(
            status,
            ClientEvent::ContainerStatus {
                user: "alice".into(),
                tag: "C1".into(),
                connected: true,
            }
        );
        assert_eq!(runtime.realm().active_containers(), 1);

        let containers = ok(&runtime, "admin", "listContainers", json!({})).await;
        assert_eq!(containers[0]["tag"], "C1");
        assert_eq!(containers[0]["connected"], true);
        assert!(containers[0]["commId"].as_str().unwrap().starts_with("CO"));

        let duplicate = call(&runtime, "alice", "createContainer", json!({"tag": "C1"})).await;
        assert_eq!(duplicate["error"]["code"], codes::INVALID_REQUEST);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_create_container_times_out_and_rolls_back() {
        let mut config = MasterConfig::default();
        config.realm.loopback_host = false;
        config.realm.ready_timeout_secs = 1;
        let (runtime, _events) = master(config);

        let response = timeout(
            Duration::from_secs(5),
            call(&runtime, "alice", "createContainer", json!({"tag": "C1"})),
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], codes::TIMEOUT);

        assert_eq!(runtime.realm().active_containers(), 0);
        let containers = ok(&runtime, "admin", "listContainers", json!({})).await;
        assert_eq!(containers, json!([]));

        // The tag is free again.
        let retry = call(&runtime, "alice", "createContainer", json!({"tag": "C1"})).await;
        assert_eq!(retry["error"]["code"], codes::TIMEOUT);

        runtime.shutdown().await;
    }

    // =========================================================================
    // DATA PATHS
    // =========================================================================

    #[tokio::test]
    async fn test_environment_data_reaches_robot() {
        let (runtime, mut events) = master(MasterConfig::default());
        wired(&runtime).await;
        let comm_id = comm_id_of(&runtime, "alice", "C1");

        runtime
            .bus()
            .send_message(RoutedMessage {
                msg_type: MsgType::InterfaceData,
                dest: runtime.config().realm.comm_id.clone(),
                orig: comm_id,
                content: MessageContent::Data(data("pub", json!({"data": 7}))),
            })
            .unwrap();

        match next_message(&mut events).await {
            ClientEvent::Message {
                user, robot_id, msg, ..
            } => {
                assert_eq!(user, "alice");
                assert_eq!(robot_id, "R1");
                assert_eq!(msg.interface_tag, "rsub");
                assert_eq!(msg.payload, json!({"data": 7}));
            }
            other => panic!("unexpected event {other:?}"),
        }

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_robot_message_reaches_environment() {
        let (runtime, _events) = master(MasterConfig::default());
        wired(&runtime).await;
        let comm_id = comm_id_of(&runtime, "alice", "C1");
        let mut env = runtime
            .bus()
            .subscribe(MessageFilter::to(comm_id.clone()).with_types([MsgType::InterfaceData]));

        let params = json!({
            "robotId": "R1",
            "message": data("rpub", json!({"data": 3})),
        });
        ok(&runtime, "alice", "robotMessage", params).await;

        let msg = timeout(WAIT, env.recv()).await.unwrap().unwrap();
        assert_eq!(msg.dest, comm_id);
        match msg.content {
            MessageContent::Data(data) => {
                assert_eq!(data.interface_tag, "sub");
                assert_eq!(data.payload, json!({"data": 3}));
            }
            other => panic!("unexpected content {other:?}"),
        }

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_robot_message_type_must_match_interface() {
        let (runtime, _events) = master(MasterConfig::default());
        wired(&runtime).await;

        let mut msg = data("rpub", json!(1));
        msg.type_name = "std/Other".into();
        // Accepted for delivery; the mismatch is caught by the worker.
        ok(&runtime, "alice", "robotMessage", json!({"robotId": "R1", "message": msg})).await;

        let unknown = call(
            &runtime,
            "alice",
            "robotMessage",
            json!({"robotId": "R1", "message": data("nope", json!(1))}),
        )
        .await;
        assert_eq!(unknown["error"]["code"], codes::INVALID_REQUEST);

        runtime.shutdown().await;
    }

    // =========================================================================
    // TEARDOWN AND ISOLATION
    // =========================================================================

    #[tokio::test]
    async fn test_destroy_container_drops_connections() {
        let (runtime, _events) = master(MasterConfig::default());
        wired(&runtime).await;
        let avatar = runtime.sessions().existing("alice").unwrap();
        assert_eq!(avatar.connection_keys().len(), 2);

        ok(&runtime, "alice", "destroyContainer", json!({"tag": "C1"})).await;
        assert!(avatar.connection_keys().is_empty());
        assert_eq!(runtime.realm().active_containers(), 0);

        let removal = call(
            &runtime,
            "alice",
            "removeConnection",
            json!({"tagA": "C1/pub", "tagB": "R1/rsub"}),
        )
        .await;
        assert_eq!(removal["error"]["code"], codes::INVALID_REQUEST);

        let robots = ok(&runtime, "admin", "listRobotsByUser", json!({"user": "alice"})).await;
        assert_eq!(robots[0]["robotId"], "R1");

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let (runtime, _events) = master(MasterConfig::default());
        ok(&runtime, "alice", "createContainer", json!({"tag": "C1"})).await;

        let foreign = call(&runtime, "bob", "destroyContainer", json!({"tag": "C1"})).await;
        assert_eq!(foreign["error"]["code"], codes::INVALID_REQUEST);
        ok(&runtime, "bob", "createContainer", json!({"tag": "C1"})).await;

        let alices = ok(&runtime, "admin", "listContainersByUser", json!({"user": "alice"})).await;
        assert_eq!(alices.as_array().unwrap().len(), 1);
        let all = ok(&runtime, "admin", "listContainers", json!({})).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(runtime.realm().active_containers(), 2);

        runtime.shutdown().await;
        assert_eq!(runtime.realm().active_containers(), 0);
    }

    #[tokio::test]
    async fn test_environment_activation_registers_user() {
        let (runtime, _events) = master(MasterConfig::default());
        ok(&runtime, "alice", "createContainer", json!({"tag": "C1"})).await;
        ok(
            &runtime,
            "alice",
            "addInterface",
            interface("C1", "srv", "ServiceProviderInterface", Some("/srv")),
        )
        .await;
        let comm_id = comm_id_of(&runtime, "alice", "C1");

        runtime
            .bus()
            .send_message(RoutedMessage {
                msg_type: MsgType::InterfaceActivate,
                dest: runtime.config().realm.comm_id.clone(),
                orig: comm_id.clone(),
                content: MessageContent::Binding {
                    interface_tag: "srv".into(),
                    user_id: "robotX".into(),
                    comm_id: "ZZrobotX".into(),
                },
            })
            .unwrap();

        let container = runtime.sessions().container_by_comm_id(&comm_id).unwrap();
        timeout(WAIT, async {
            loop {
                if container.get_interface("srv").unwrap().has_user("robotX") {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        runtime.shutdown().await;
    }
}
