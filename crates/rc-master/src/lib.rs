//! # RoboCloud Master
//!
//! Library side of the master process, exposed for the binary and for
//! cross-crate tests.
//!
//! ```text
//!            RPC clients                          environments
//!                │                                     ▲   │
//!                ▼                                     │   │ ContainerStatus
//!      RpcGatewayService ──► sessions ──► Container ──►│   │ InterfaceData
//!                                ▲                     │   │ Interface(De)Activate
//!                                │               InMemoryCommBus
//!                                │                         │
//!                                └──── InboundRouter ◄─────┘
//! ```
//!
//! - `config` - `MasterConfig` with `RC_*` environment overrides
//! - `adapters/` - realm, user registry, client sink, metered bus, loopback host
//! - `router` - inbound bus routing by origin commID
//! - `runtime` - component ownership, startup and shutdown

pub mod adapters;
pub mod config;
pub mod router;
pub mod runtime;

pub use config::{ConfigError, MasterConfig};
pub use router::InboundRouter;
pub use runtime::MasterRuntime;
