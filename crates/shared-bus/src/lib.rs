//! # Shared Bus - Message Transport Contract
//!
//! The control plane never talks to a container process directly: every
//! instruction and every application payload is a [`RoutedMessage`] handed
//! to a [`CommManager`].
//!
//! ```text
//! ┌──────────────┐   send_message()   ┌──────────────┐
//! │  Container   │ ─────────────────> │   CommBus    │
//! └──────────────┘                    └──────┬───────┘
//!                                            │ subscribe(filter)
//!                         ┌──────────────────┴─────────┐
//!                         ▼                            ▼
//!                 ┌──────────────┐             ┌──────────────┐
//!                 │ Environment  │             │ Master router│
//!                 └──────────────┘             └──────────────┘
//! ```
//!
//! The in-memory bus is a single-process stand-in for the distributed
//! transport; it is independently synchronised, so callers never hold a lock
//! of their own while sending.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::MessageFilter;
pub use publisher::{BusError, CommManager, InMemoryCommBus};
pub use subscriber::{Subscription, SubscriptionError};

use shared_types::RoutedMessage;

/// Maximum messages buffered per subscriber before the slowest one lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Short description of a message for log lines.
pub fn describe(msg: &RoutedMessage) -> String {
    format!("{} {} -> {}", msg.msg_type, msg.orig, msg.dest)
}
