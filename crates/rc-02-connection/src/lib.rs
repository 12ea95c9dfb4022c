//! # Connection Subsystem (rc-02)
//!
//! A connection links two interfaces of the same message type and
//! complementary kinds. Each interface becomes a user of the other, so a
//! message leaving one side is delivered into the other.
//!
//! ## Identity
//!
//! A connection is identified by its two fully-qualified interface
//! references in lexicographic order. `C1/i1 ↔ C2/i2` and `C2/i2 ↔ C1/i1`
//! are the same connection; no two distinct pairs share a key.
//!
//! ## Teardown
//!
//! A connection observes both interfaces. When either interface dies (it is
//! removed, or its endpoint is destroyed) the connection destroys itself and
//! notifies its own observers.

pub mod domain;

pub use domain::{check_connectable, Connection, ConnectionError, ConnectionKey, ConnectionResult};
