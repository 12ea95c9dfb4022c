//! Robot view: operations a client issues against its own session.

use rc_01_endpoints::{Endpoint, InterfaceSpec};
use rc_telemetry::{CONTAINERS_CREATED, CONTAINERS_DESTROYED};
use serde_json::{json, Value};
use shared_types::{names, InterfaceType, MessageType, NodeSpec, ParameterValue};
use tracing::{info, instrument, warn};

use super::{parse_params, RequestContext};
use crate::domain::params::{
    AddInterfaceParams, AddNodeParams, AddParameterParams, ConnectionParams, ContainerParams,
    RemoveInterfaceParams, RemoveNodeParams, RemoveParameterParams,
};
use crate::domain::{RpcError, RpcResult};

/// createContainer - Start a container and wait until its environment is
/// live.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn create_container(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: ContainerParams = parse_params(params)?;
    let gateway = &ctx.gateway;
    let avatar = ctx.avatar();

    let comm_id = gateway.realm.new_comm_id();
    let container = avatar.reserve_container(&p.tag, &comm_id)?;
    gateway.sessions.register_container(&container);

    let ready = match container.start() {
        Ok(()) => gateway
            .realm
            .await_container_ready(&comm_id)
            .await
            .map_err(RpcError::from),
        Err(e) => Err(RpcError::from(e)),
    };

    if let Err(e) = ready {
        warn!(container = %p.tag, comm_id = %comm_id, error = %e, "Container creation failed, rolling back");
        avatar.forget_container(&container);
        container.destroy();
        gateway.sessions.forget_container(&comm_id);
        gateway.realm.release_container(&comm_id);
        return Err(e);
    }

    CONTAINERS_CREATED.inc();
    info!(container = %p.tag, comm_id = %comm_id, "Container created");
    Ok(json!(format!("Container {} successfully created.", p.tag)))
}

/// destroyContainer - Tear a container down. Connections through its
/// interfaces die with it.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn destroy_container(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: ContainerParams = parse_params(params)?;
    let container = ctx.avatar().take_container(&p.tag)?;
    container.destroy();

    ctx.gateway.sessions.forget_container(container.comm_id());
    ctx.gateway.realm.release_container(container.comm_id());
    CONTAINERS_DESTROYED.inc();
    info!(container = %p.tag, "Container destroyed");
    Ok(Value::Null)
}

/// addNode - Launch a node inside a container.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn add_node(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: AddNodeParams = parse_params(params)?;
    ctx.avatar().container(&p.container_tag)?.add_node(NodeSpec {
        tag: p.node_tag,
        package: p.package,
        executable: p.executable,
        args: p.args,
        name: p.name,
        namespace: p.namespace,
    })?;
    Ok(Value::Null)
}

/// removeNode - Stop a node. Unknown nodes are the environment's concern.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn remove_node(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: RemoveNodeParams = parse_params(params)?;
    ctx.avatar()
        .container(&p.container_tag)?
        .remove_node(&p.node_tag)?;
    Ok(Value::Null)
}

/// addParameter - Set a typed parameter inside a container.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn add_parameter(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: AddParameterParams = parse_params(params)?;
    let container = ctx.avatar().container(&p.container_tag)?;
    names::validate_name(&p.name)?;
    let value = ParameterValue::from_json(&p.name, &p.value, p.kind)?;
    container.add_parameter(&p.name, value)?;
    Ok(Value::Null)
}

/// removeParameter - Remove a parameter from a container.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn remove_parameter(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: RemoveParameterParams = parse_params(params)?;
    ctx.avatar()
        .container(&p.container_tag)?
        .remove_parameter(&p.name)?;
    Ok(Value::Null)
}

/// addInterface - Attach an interface to a container or robot.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn add_interface(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: AddInterfaceParams = parse_params(params)?;
    let itype: InterfaceType = p.interface_type.parse()?;
    let message_type: MessageType = p.message_type.parse()?;
    ctx.avatar().add_interface(
        &p.endpoint_tag,
        InterfaceSpec {
            tag: p.interface_tag,
            itype,
            message_type,
            address: p.address,
        },
    )?;
    Ok(Value::Null)
}

/// removeInterface - Detach an interface. Connections through it die.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn remove_interface(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: RemoveInterfaceParams = parse_params(params)?;
    ctx.avatar()
        .remove_interface(&p.endpoint_tag, &p.interface_tag)?;
    Ok(Value::Null)
}

/// addConnection - Connect two `endpoint/interface` references.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn add_connection(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: ConnectionParams = parse_params(params)?;
    ctx.avatar().add_connection(&p.tag_a, &p.tag_b)?;
    Ok(Value::Null)
}

/// removeConnection - Disconnect two `endpoint/interface` references.
#[instrument(skip_all, fields(user = %ctx.user_id))]
pub async fn remove_connection(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: ConnectionParams = parse_params(params)?;
    ctx.avatar().remove_connection(&p.tag_a, &p.tag_b)?;
    Ok(Value::Null)
}
