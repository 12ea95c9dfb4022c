//! Domain layer for the RPC gateway.

pub mod avatar;
pub mod config;
pub mod error;
pub mod operations;
pub mod params;
pub mod session;

pub use avatar::Avatar;
pub use config::{ConfigError, GatewayConfig};
pub use error::{codes, GatewayError, RealmError, RpcError, RpcResult, UserError};
pub use operations::{Operation, OperationGroup, UnknownOperation};
pub use params::{ContainerInfo, MachineInfo, RobotInfo};
pub use session::SessionManager;
