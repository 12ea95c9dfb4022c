//! Domain layer for connections.

pub mod compatibility;
pub mod connection;
pub mod errors;
pub mod key;

pub use compatibility::check_connectable;
pub use connection::Connection;
pub use errors::{ConnectionError, ConnectionResult};
pub use key::ConnectionKey;
