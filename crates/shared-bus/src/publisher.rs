//! # Message Publisher
//!
//! Defines the sending side of the bus.

use crate::events::MessageFilter;
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use shared_types::{CommId, ErrorKind, MessageError, RoutedMessage};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Errors from sending on the bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The message is not a well-formed routed message.
    #[error("Message rejected by the bus: {0}")]
    Rejected(#[from] MessageError),

    /// The bus has been shut down.
    #[error("Message bus is shut down")]
    ShutDown,
}

impl BusError {
    /// Bus failures are never caused by client input.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Protocol
    }
}

/// The transport collaborator.
///
/// `send_message` never blocks; delivery is the bus's concern.
pub trait CommManager: Send + Sync {
    /// Communication ID of the process owning this manager.
    fn comm_id(&self) -> &str;

    /// Hand a message to the transport.
    fn send_message(&self, msg: RoutedMessage) -> Result<(), BusError>;
}

/// In-memory implementation of the bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
/// semantics. Every subscriber sees every message and filters locally.
pub struct InMemoryCommBus {
    /// Communication ID of the owning process.
    comm_id: CommId,

    /// Broadcast sender for messages.
    sender: broadcast::Sender<RoutedMessage>,

    /// Live subscriptions.
    subscriptions: Arc<AtomicUsize>,

    /// Total messages accepted.
    messages_sent: AtomicU64,

    /// Set once the bus refuses further traffic.
    shut_down: AtomicBool,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryCommBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new(comm_id: impl Into<CommId>) -> Self {
        Self::with_capacity(comm_id, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with specified capacity.
    #[must_use]
    pub fn with_capacity(comm_id: impl Into<CommId>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            comm_id: comm_id.into(),
            sender,
            subscriptions: Arc::new(AtomicUsize::new(0)),
            messages_sent: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
            capacity,
        }
    }

    /// Subscribe to messages matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: MessageFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
        debug!(destinations = ?filter.destinations, types = ?filter.msg_types, "New subscription created");
        Subscription::new(receiver, filter, self.subscriptions.clone())
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.load(Ordering::Relaxed)
    }

    /// Total messages accepted by the bus.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Refuse further traffic.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}

impl CommManager for InMemoryCommBus {
    fn comm_id(&self) -> &str {
        &self.comm_id
    }

    fn send_message(&self, msg: RoutedMessage) -> Result<(), BusError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(BusError::ShutDown);
        }
        if msg.dest.is_empty() {
            return Err(MessageError::MissingDestination.into());
        }
        if !msg.content.fits(msg.msg_type) {
            return Err(MessageError::Malformed {
                msg_type: msg.msg_type.to_string(),
                content: msg.content.variant_name(),
            }
            .into());
        }

        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        let msg_type = msg.msg_type;
        let dest = msg.dest.clone();

        match self.sender.send(msg) {
            Ok(receivers) => {
                debug!(msg_type = %msg_type, dest = %dest, receivers, "Message sent");
            }
            Err(_) => {
                warn!(msg_type = %msg_type, dest = %dest, "Message dropped (no receivers)");
            }
        }
        Ok(())
    }
}
