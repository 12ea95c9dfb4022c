//! Comm manager decorator counting routed messages by type.

use rc_telemetry::BUS_MESSAGES;
use shared_bus::{BusError, CommManager};
use shared_types::RoutedMessage;
use std::sync::Arc;

/// Counts every message handed to the wrapped manager.
pub struct MeteredCommManager {
    inner: Arc<dyn CommManager>,
}

impl MeteredCommManager {
    pub fn new(inner: Arc<dyn CommManager>) -> Self {
        Self { inner }
    }
}

impl CommManager for MeteredCommManager {
    fn comm_id(&self) -> &str {
        self.inner.comm_id()
    }

    fn send_message(&self, msg: RoutedMessage) -> Result<(), BusError> {
        BUS_MESSAGES.with_label_values(&[msg.msg_type.as_str()]).inc();
        self.inner.send_message(msg)
    }
}
