//! # Endpoints Subsystem (rc-01)
//!
//! Containers and robots, the interfaces they own, and the pool that moves
//! payloads through those interfaces.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  add/remove   ┌───────────────────────────┐
//! │  RPC layer   │──────────────→│ Container / Robot         │
//! └──────────────┘               │   InterfaceTable          │
//!        ↑                       │   AddressRegistry         │
//!        │ ClientNotifier        │   DeathNotifier           │
//!        │                       └────────────┬──────────────┘
//!        │                                    │ submit
//!        │                       ┌────────────↓──────────────┐
//!        └───────────────────────│ DeliveryPool (N workers)  │
//!                                └───────────────────────────┘
//! ```
//!
//! Containers talk to their execution environment through a
//! [`shared_bus::CommManager`]; robots talk to their client through the
//! [`ClientNotifier`] port.

pub mod delivery;
pub mod domain;
pub mod ports;

pub use delivery::{DeliveryConfig, DeliveryError, DeliveryJob, DeliveryPool};
pub use domain::{
    AddressLease, AddressRegistry, Container, DeathCallback, DeathNotifier, EndpointError,
    EndpointResult, Interface, InterfaceSpec, InterfaceUser, ObserverId, Robot,
};
pub use ports::{ClientNotifier, Endpoint, EndpointKind};
