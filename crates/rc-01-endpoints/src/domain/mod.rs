//! Domain layer for the endpoints subsystem.

pub mod addresses;
pub mod container;
pub mod errors;
pub mod interface;
pub mod lifecycle;
pub mod robot;
pub mod table;

pub use addresses::{AddressLease, AddressRegistry};
pub use container::Container;
pub use errors::{EndpointError, EndpointResult};
pub use interface::{Interface, InterfaceSpec, InterfaceUser};
pub use lifecycle::{DeathCallback, DeathNotifier, ObserverId};
pub use robot::Robot;
pub use table::{Insertion, InterfaceTable};
