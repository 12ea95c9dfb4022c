//! Operation handlers and the registry that maps operations to them.
//!
//! Every [`Operation`] must have exactly one handler. The registry is checked
//! at startup with [`HandlerRegistry::validate`], so a method that is part of
//! the operation set can never fall through to "method not found" at runtime.

pub mod client;
pub mod console;
pub mod robot;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Avatar, GatewayError, Operation, RpcError, RpcResult, SessionManager};
use crate::ports::{Realm, UserRegistry};

/// Collaborators shared by every request.
pub struct GatewayContext {
    pub sessions: Arc<SessionManager>,
    pub realm: Arc<dyn Realm>,
    pub users: Arc<dyn UserRegistry>,
}

/// One request, bound to an authenticated client.
#[derive(Clone)]
pub struct RequestContext {
    pub gateway: Arc<GatewayContext>,
    pub user_id: String,
}

impl RequestContext {
    /// Create a context for `user_id`.
    pub fn new(gateway: Arc<GatewayContext>, user_id: impl Into<String>) -> Self {
        Self {
            gateway,
            user_id: user_id.into(),
        }
    }

    /// Session of the requesting client.
    pub fn avatar(&self) -> Arc<Avatar> {
        self.gateway.sessions.avatar(&self.user_id)
    }
}

/// A typed operation handler.
pub type Handler = fn(RequestContext, Value) -> BoxFuture<'static, RpcResult<Value>>;

/// Adapt an `async fn(RequestContext, Value) -> RpcResult<Value>` to [`Handler`].
macro_rules! handler {
    ($f:path) => {{
        fn boxed(
            ctx: $crate::handlers::RequestContext,
            params: serde_json::Value,
        ) -> futures::future::BoxFuture<'static, $crate::domain::RpcResult<serde_json::Value>> {
            Box::pin($f(ctx, params))
        }
        boxed as $crate::handlers::Handler
    }};
}

/// Operation → handler table.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Operation, Handler>,
}

impl HandlerRegistry {
    /// Registry with no handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the handler of every operation.
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        // Robot view
        registry.register(Operation::CreateContainer, handler!(robot::create_container));
        registry.register(Operation::DestroyContainer, handler!(robot::destroy_container));
        registry.register(Operation::AddNode, handler!(robot::add_node));
        registry.register(Operation::RemoveNode, handler!(robot::remove_node));
        registry.register(Operation::AddParameter, handler!(robot::add_parameter));
        registry.register(Operation::RemoveParameter, handler!(robot::remove_parameter));
        registry.register(Operation::AddInterface, handler!(robot::add_interface));
        registry.register(Operation::RemoveInterface, handler!(robot::remove_interface));
        registry.register(Operation::AddConnection, handler!(robot::add_connection));
        registry.register(Operation::RemoveConnection, handler!(robot::remove_connection));

        // Client link
        registry.register(Operation::RegisterRobot, handler!(client::register_robot));
        registry.register(Operation::UnregisterRobot, handler!(client::unregister_robot));
        registry.register(Operation::RobotMessage, handler!(client::robot_message));

        // Console view
        registry.register(Operation::ListMachines, handler!(console::list_machines));
        registry.register(Operation::ListContainers, handler!(console::list_containers));
        registry.register(
            Operation::ListContainersByUser,
            handler!(console::list_containers_by_user),
        );
        registry.register(Operation::ListRobots, handler!(console::list_robots));
        registry.register(Operation::ListRobotsByUser, handler!(console::list_robots_by_user));
        registry.register(Operation::ListUsers, handler!(console::list_users));
        registry.register(Operation::AddUser, handler!(console::add_user));
        registry.register(Operation::RemoveUser, handler!(console::remove_user));
        registry.register(Operation::UpdateUser, handler!(console::update_user));

        registry
    }

    /// Install a handler, returning the one it replaces.
    pub fn register(&mut self, operation: Operation, handler: Handler) -> Option<Handler> {
        self.handlers.insert(operation, handler)
    }

    /// Check that every operation has a handler.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let missing: Vec<&str> = Operation::ALL
            .iter()
            .filter(|op| !self.handlers.contains_key(op))
            .map(|op| op.method_name())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::Config(format!(
                "no handler for: {}",
                missing.join(", ")
            )))
        }
    }

    /// Run the handler of `operation`.
    pub async fn dispatch(
        &self,
        operation: Operation,
        ctx: RequestContext,
        params: Value,
    ) -> RpcResult<Value> {
        match self.handlers.get(&operation) {
            Some(handler) => handler(ctx, params).await,
            None => Err(RpcError::method_not_found(operation.method_name())),
        }
    }
}

/// Deserialize named parameters. A missing params member counts as `{}`.
pub fn parse_params<T: DeserializeOwned>(params: Value) -> RpcResult<T> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(e.to_string()))
}
