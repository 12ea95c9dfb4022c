//! # Shared Types Crate
//!
//! This crate contains the value objects that flow between the RoboCloud
//! subsystems and over the message bus.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Interface types, message types and the
//!   routed-message envelope are defined once, here.
//! - **Validated at Construction**: Parsed values (`InterfaceType`,
//!   `MessageType`, `InterfaceRef`) cannot exist in an illegal form.
//! - **Closed Error Taxonomy**: Every domain error in the workspace reports an
//!   [`ErrorKind`], which is all the RPC layer needs to translate it.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ipc;
pub mod names;

pub use entities::*;
pub use envelope::{
    private_address, MessageContent, MsgType, OutboundMessage, RoutedMessage,
    ADDRESS_PREFIX_LENGTH, CONTAINER_ADDRESS_PREFIX, PRIVATE_ADDRESS_PREFIX,
};
pub use errors::*;
pub use ipc::*;
pub use names::{
    is_legal_base_name, is_legal_name, validate_launch_args, validate_name, validate_tag,
};
