//! Ports layer (Hexagonal Architecture).

pub mod inbound;
pub mod outbound;

pub use inbound::{Endpoint, EndpointKind};
pub use outbound::ClientNotifier;
