//! # RPC Gateway (rc-03)
//!
//! Everything a client sees of the control plane. Each authenticated client
//! owns one session ([`Avatar`]) holding its containers, robots and
//! connections. Sessions never see each other's resources.
//!
//! ## Views
//!
//! | View | Operations |
//! |------|------------|
//! | Robot | container lifecycle, nodes, parameters, interfaces, connections |
//! | Client link | robot registration and robot-originated messages |
//! | Console | listings and user management |
//!
//! ## Architecture
//!
//! ```text
//! HTTP (axum) ──► RpcGatewayService ──► HandlerRegistry ──► Avatar
//!                                                            │
//!                       ┌────────────────────────────────────┤
//!                       ▼                                    ▼
//!               Container / Robot (rc-01)            Connection (rc-02)
//!                       │
//!                       ▼
//!               CommManager (shared-bus) ──► container environments
//! ```
//!
//! Outbound collaborators ([`Realm`], [`ClientSink`], [`UserRegistry`]) are
//! traits; the master process supplies the implementations.

pub mod domain;
pub mod handlers;
pub mod ports;
pub mod service;

pub use domain::{
    codes, Avatar, ConfigError, ContainerInfo, GatewayConfig, GatewayError, MachineInfo,
    Operation, OperationGroup, RealmError, RobotInfo, RpcError, RpcResult, SessionManager,
    UserError,
};
pub use handlers::{GatewayContext, HandlerRegistry, RequestContext};
pub use ports::{ClientSink, Realm, UserRegistry};
pub use service::RpcGatewayService;
