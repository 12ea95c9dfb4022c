//! Loopback environment host.
//!
//! Stands in for the remote machine that provisions container environments:
//! it answers every container start with a connected status report, as if
//! the environment came up immediately. Component instructions are only
//! logged.

use shared_bus::{describe, CommManager, MessageFilter, Subscription};
use shared_types::{private_address, MessageContent, MsgType, RoutedMessage};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// In-process environment host.
pub struct LoopbackHost {
    comm: Arc<dyn CommManager>,
}

impl LoopbackHost {
    /// Create a host answering on behalf of `comm`'s containers.
    pub fn new(comm: Arc<dyn CommManager>) -> Self {
        Self { comm }
    }

    /// Filter selecting the host's traffic.
    pub fn filter(&self) -> MessageFilter {
        MessageFilter::to(private_address(self.comm.comm_id()))
            .with_types([MsgType::ContainerStart, MsgType::ContainerStop])
    }

    /// React to one host message.
    pub fn handle(&self, msg: RoutedMessage) {
        match (msg.msg_type, msg.content) {
            (MsgType::ContainerStart, MessageContent::Container { comm_id }) => {
                info!(comm_id = %comm_id, "Environment up");
                let status = RoutedMessage {
                    msg_type: MsgType::ContainerStatus,
                    dest: self.comm.comm_id().to_string(),
                    orig: comm_id,
                    content: MessageContent::Status { connected: true },
                };
                if let Err(e) = self.comm.send_message(status) {
                    warn!(error = %e, "Failed to report environment status");
                }
            }
            (MsgType::ContainerStop, MessageContent::Container { comm_id }) => {
                info!(comm_id = %comm_id, "Environment down");
            }
            (msg_type, content) => {
                debug!(msg_type = %msg_type, content = content.variant_name(), "Ignored host message");
            }
        }
    }

    /// Serve until the subscription ends or shutdown is signalled.
    pub async fn run(self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                msg = subscription.recv() => match msg {
                    Some(msg) => {
                        debug!(msg = %describe(&msg), "Host message");
                        self.handle(msg);
                    }
                    None => break,
                },
                _ = shutdown.changed() => {
                    info!("Loopback host stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::InMemoryCommBus;

    #[tokio::test]
    async fn test_start_is_answered_with_status() {
        let bus = Arc::new(InMemoryCommBus::new("ZZMASTER"));
        let host = LoopbackHost::new(bus.clone());
        let mut master = bus.subscribe(MessageFilter::to("ZZMASTER"));

        let start = RoutedMessage {
            msg_type: MsgType::ContainerStart,
            dest: "PRMASTER".into(),
            orig: "ZZMASTER".into(),
            content: MessageContent::Container {
                comm_id: "COc1".into(),
            },
        };
        assert!(host.filter().matches(&start));
        host.handle(start);

        let status = master.try_recv().unwrap().unwrap();
        assert_eq!(status.msg_type, MsgType::ContainerStatus);
        assert_eq!(status.orig, "COc1");
        assert_eq!(status.content, MessageContent::Status { connected: true });
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let bus = Arc::new(InMemoryCommBus::new("ZZMASTER"));
        let host = LoopbackHost::new(bus.clone());
        let subscription = bus.subscribe(host.filter());
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(host.run(subscription, rx));
        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
