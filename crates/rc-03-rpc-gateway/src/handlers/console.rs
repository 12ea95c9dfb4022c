//! Console view: administrative listings and user management.
//!
//! Console operations are open to every authenticated identity.

use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{parse_params, RequestContext};
use crate::domain::params::{UserCredentialsParams, UserParams};
use crate::domain::RpcResult;

/// listMachines
#[instrument(skip_all)]
pub async fn list_machines(ctx: RequestContext, _params: Value) -> RpcResult<Value> {
    Ok(serde_json::to_value(ctx.gateway.realm.machines())?)
}

/// listContainers
#[instrument(skip_all)]
pub async fn list_containers(ctx: RequestContext, _params: Value) -> RpcResult<Value> {
    Ok(serde_json::to_value(ctx.gateway.sessions.container_infos(None))?)
}

/// listContainersByUser
#[instrument(skip_all)]
pub async fn list_containers_by_user(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: UserParams = parse_params(params)?;
    Ok(serde_json::to_value(
        ctx.gateway.sessions.container_infos(Some(&p.user)),
    )?)
}

/// listRobots
#[instrument(skip_all)]
pub async fn list_robots(ctx: RequestContext, _params: Value) -> RpcResult<Value> {
    Ok(serde_json::to_value(ctx.gateway.sessions.robot_infos(None))?)
}

/// listRobotsByUser
#[instrument(skip_all)]
pub async fn list_robots_by_user(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: UserParams = parse_params(params)?;
    Ok(serde_json::to_value(
        ctx.gateway.sessions.robot_infos(Some(&p.user)),
    )?)
}

/// listUsers
#[instrument(skip_all)]
pub async fn list_users(ctx: RequestContext, _params: Value) -> RpcResult<Value> {
    Ok(json!(ctx.gateway.users.list_users()))
}

/// addUser
#[instrument(skip_all, fields(by = %ctx.user_id))]
pub async fn add_user(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: UserCredentialsParams = parse_params(params)?;
    ctx.gateway.users.add_user(&p.user, &p.password)?;
    info!(user = %p.user, "User added");
    Ok(Value::Null)
}

/// removeUser - Delete a user and close their session.
#[instrument(skip_all, fields(by = %ctx.user_id))]
pub async fn remove_user(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: UserParams = parse_params(params)?;
    ctx.gateway.users.remove_user(&p.user)?;
    for comm_id in ctx.gateway.sessions.close(&p.user) {
        ctx.gateway.realm.release_container(&comm_id);
    }
    info!(user = %p.user, "User removed");
    Ok(Value::Null)
}

/// updateUser - Replace a user's password.
#[instrument(skip_all, fields(by = %ctx.user_id))]
pub async fn update_user(ctx: RequestContext, params: Value) -> RpcResult<Value> {
    let p: UserCredentialsParams = parse_params(params)?;
    ctx.gateway.users.update_user(&p.user, &p.password)?;
    Ok(Value::Null)
}
