//! Client link: robots attaching to and talking through a session.

use serde_json::Value;
use tracing::instrument;

use super::{parse_params, RequestContext};
use crate::domain::params::{RegisterRobotParams, RobotMessageParams, RobotParams};
use crate::domain::RpcResult;

/// registerRobot
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn register_robot(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: RegisterRobotParams = parse_params(params)?;
    let comm_id = match p.comm_id {
        Some(comm_id) => comm_id,
        None => ctx.gateway.realm.comm_manager().comm_id().to_string(),
    };
    ctx.avatar().register_robot(&p.robot_id, &comm_id)?;
    Ok(Value::Null)
}

/// unregisterRobot
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn unregister_robot(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: RobotParams = parse_params(params)?;
    ctx.avatar().unregister_robot(&p.robot_id)?;
    Ok(Value::Null)
}

/// robotMessage - Inject a message from a robot into one of its interfaces.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn robot_message(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: RobotMessageParams = parse_params(params)?;
    ctx.avatar().robot_message(&p.robot_id, p.message)?;
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use crate::domain::{codes, Operation};
    use crate::handlers::test_support::gateway;
    use rc_01_endpoints::Endpoint;
    use serde_json::json;
    use shared_types::{MessageContent, MsgType};
    use std::time::Duration;

    fn message(interface: &str) -> serde_json::Value {
        json!({
            "robotId": "robotA",
            "message": {
                "interface_tag": interface,
                "msg_id": "m1",
                "type_name": "std/Type",
                "payload": {"data": 7}
            }
        })
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let gw = gateway();
        gw.call("alice", Operation::RegisterRobot, json!({"robotId": "robotA"}))
            .await
            .unwrap();
        let robot = gw.context.sessions.avatar("alice").robot("robotA").unwrap();
        assert_eq!(robot.comm_id(), "ZZMASTER");

        let err = gw
            .call("alice", Operation::RegisterRobot, json!({"robotId": "robotA"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::INVALID_REQUEST);

        gw.call("alice", Operation::UnregisterRobot, json!({"robotId": "robotA"}))
            .await
            .unwrap();
        let err = gw
            .call("alice", Operation::UnregisterRobot, json!({"robotId": "robotA"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_register_with_explicit_link() {
        let gw = gateway();
        gw.call(
            "alice",
            Operation::RegisterRobot,
            json!({"robotId": "robotA", "commId": "ZZlink01"}),
        )
        .await
        .unwrap();
        let robot = gw.context.sessions.avatar("alice").robot("robotA").unwrap();
        assert_eq!(robot.comm_id(), "ZZlink01");
    }

    #[tokio::test]
    async fn test_robot_message_unknown_interface() {
        let gw = gateway();
        gw.call("alice", Operation::RegisterRobot, json!({"robotId": "robotA"}))
            .await
            .unwrap();
        let err = gw
            .call("alice", Operation::RobotMessage, message("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::INVALID_REQUEST);

        let err = gw
            .call("bob", Operation::RobotMessage, message("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_robot_message_reaches_container() {
        let gw = gateway();
        gw.call("alice", Operation::CreateContainer, json!({"tag": "C1"}))
            .await
            .unwrap();
        gw.call("alice", Operation::RegisterRobot, json!({"robotId": "robotA"}))
            .await
            .unwrap();
        gw.call(
            "alice",
            Operation::AddInterface,
            json!({
                "endpointTag": "robotA",
                "interfaceTag": "cmd",
                "interfaceType": "PublisherConverter",
                "messageType": "std/Type"
            }),
        )
        .await
        .unwrap();
        gw.call(
            "alice",
            Operation::AddInterface,
            json!({
                "endpointTag": "C1",
                "interfaceTag": "sub",
                "interfaceType": "SubscriberInterface",
                "messageType": "std/Type",
                "address": "/cmd"
            }),
        )
        .await
        .unwrap();
        gw.call(
            "alice",
            Operation::AddConnection,
            json!({"tagA": "robotA/cmd", "tagB": "C1/sub"}),
        )
        .await
        .unwrap();

        gw.call("alice", Operation::RobotMessage, message("cmd"))
            .await
            .unwrap();

        let comm = gw.realm.comm.clone();
        tokio::time::timeout(Duration::from_secs(1), async move {
            loop {
                let delivered = comm.sent.lock().iter().any(|m| {
                    m.msg_type == MsgType::InterfaceData
                        && matches!(&m.content, MessageContent::Data(d) if d.interface_tag == "sub")
                });
                if delivered {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("message not delivered");
    }
}
