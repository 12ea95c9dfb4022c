//! Port implementations wired into the gateway by the master.

pub mod host;
pub mod metered;
pub mod realm;
pub mod sink;
pub mod users;

pub use host::LoopbackHost;
pub use metered::MeteredCommManager;
pub use realm::LocalRealm;
pub use sink::{ChannelClientSink, ClientEvent};
pub use users::InMemoryUserRegistry;
