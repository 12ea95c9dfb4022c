//! Client sink forwarding pushes onto a channel.
//!
//! The robot-facing transport drains the receiving end. A full channel drops
//! the push with a warning; the sink never blocks the caller.

use rc_03_rpc_gateway::ClientSink;
use shared_types::InterfaceMessage;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A push towards a robot client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A container of `user` changed connectivity.
    ContainerStatus {
        user: String,
        tag: String,
        connected: bool,
    },
    /// A message for robot `robot_id` of `user`.
    Message {
        user: String,
        robot_id: String,
        endpoint_tag: String,
        msg: InterfaceMessage,
    },
}

/// Sink backed by a bounded mpsc channel.
pub struct ChannelClientSink {
    tx: mpsc::Sender<ClientEvent>,
}

impl ChannelClientSink {
    /// Create a sink and the receiver draining it.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    fn push(&self, event: ClientEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!(error = %e, "Client push dropped");
        }
    }
}

impl ClientSink for ChannelClientSink {
    fn container_status(&self, user_id: &str, tag: &str, connected: bool) {
        debug!(user = %user_id, container = %tag, connected, "Container status push");
        self.push(ClientEvent::ContainerStatus {
            user: user_id.to_string(),
            tag: tag.to_string(),
            connected,
        });
    }

    fn deliver(&self, user_id: &str, robot_id: &str, endpoint_tag: &str, msg: InterfaceMessage) {
        debug!(
            user = %user_id,
            robot = %robot_id,
            endpoint = %endpoint_tag,
            interface = %msg.interface_tag,
            "Message push"
        );
        self.push(ClientEvent::Message {
            user: user_id.to_string(),
            robot_id: robot_id.to_string(),
            endpoint_tag: endpoint_tag.to_string(),
            msg,
        });
    }
}
