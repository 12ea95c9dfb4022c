//! # Message Subscriber
//!
//! Defines the receiving side of the bus.

use crate::events::MessageFilter;
use shared_types::RoutedMessage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped.
    #[error("Message bus closed")]
    Closed,
}

/// A subscription handle for receiving messages.
///
/// When dropped, the subscription count of the bus is decremented.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<RoutedMessage>,

    /// Filter for this subscription.
    filter: MessageFilter,

    /// Releases the subscription slot on drop.
    _guard: SubscriptionGuard,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<RoutedMessage>,
        filter: MessageFilter,
        subscriptions: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            receiver,
            filter,
            _guard: SubscriptionGuard(subscriptions),
        }
    }

    /// Receive the next message that matches the filter.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<RoutedMessage> {
        loop {
            let msg = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some messages dropped");
                    continue;
                }
            };

            if self.filter.matches(&msg) {
                return Some(msg);
            }
        }
    }

    /// Try to receive the next message without waiting.
    ///
    /// - `Ok(Some(msg))` - a matching message was available
    /// - `Ok(None)` - nothing available right now
    /// - `Err(SubscriptionError::Closed)` - the bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<RoutedMessage>, SubscriptionError> {
        loop {
            let msg = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&msg) {
                return Ok(Some(msg));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &MessageFilter {
        &self.filter
    }

    /// Turn the subscription into a stream of matching messages.
    pub fn into_stream(self) -> impl Stream<Item = RoutedMessage> + Send + Unpin + 'static {
        let Subscription {
            receiver,
            filter,
            _guard: guard,
        } = self;

        BroadcastStream::new(receiver).filter_map(move |item| {
            let _held = &guard;
            match item {
                Ok(msg) if filter.matches(&msg) => Some(msg),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(count)) => {
                    debug!(lagged = count, "Stream lagged, some messages dropped");
                    None
                }
            }
        })
    }
}

/// Keeps the subscription count of the bus accurate.
struct SubscriptionGuard(Arc<AtomicUsize>);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
        debug!("Subscription dropped");
    }
}
