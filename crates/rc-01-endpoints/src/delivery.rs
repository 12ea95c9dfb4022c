//! # Delivery Pool
//!
//! Payload delivery into and out of interfaces runs off the dispatcher on a
//! fixed set of worker tasks draining a bounded queue.
//!
//! ## Contract
//!
//! - `submit` never waits. A full queue rejects the job with
//!   [`DeliveryError::Saturated`].
//! - Callers get no result from a dispatched delivery; failures are logged.
//! - Jobs targeting an interface that was removed after submission are
//!   discarded when dequeued (fail-fast-discard).
//! - `shutdown` stops intake, lets workers drain what is queued, then joins
//!   them.

use parking_lot::Mutex;
use rc_telemetry::DELIVERIES;
use shared_types::InterfaceMessage;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::domain::Interface;

/// Default number of worker tasks.
pub const DEFAULT_WORKERS: usize = 4;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Delivery dispatch errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Queue is full
    #[error("Delivery queue is saturated")]
    Saturated,

    /// Pool has been shut down
    #[error("Delivery pool is stopped")]
    Stopped,
}

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Number of worker tasks.
    pub workers: usize,
    /// Maximum queued jobs.
    pub queue_capacity: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// A unit of delivery work.
#[derive(Debug)]
pub enum DeliveryJob {
    /// A message leaving the endpoint through `interface`.
    Receive {
        interface: Arc<Interface>,
        msg: InterfaceMessage,
    },
    /// A message from `user_id` entering the endpoint through `interface`.
    Send {
        interface: Arc<Interface>,
        user_id: String,
        msg: InterfaceMessage,
    },
}

impl DeliveryJob {
    fn interface(&self) -> &Interface {
        match self {
            Self::Receive { interface, .. } | Self::Send { interface, .. } => interface,
        }
    }

    fn run(self) {
        match self {
            Self::Receive { interface, msg } => interface.receive(msg),
            Self::Send {
                interface,
                user_id,
                msg,
            } => {
                if let Err(e) = interface.send(msg, &user_id) {
                    error!(
                        interface = %interface.reference(),
                        user_id = %user_id,
                        error = %e,
                        "Delivery into endpoint failed"
                    );
                }
            }
        }
    }
}

/// Bounded worker pool for interface deliveries.
pub struct DeliveryPool {
    sender: Mutex<Option<mpsc::Sender<DeliveryJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: DeliveryConfig,
}

impl DeliveryPool {
    /// Spawn the workers on the current tokio runtime.
    pub fn start(config: DeliveryConfig) -> Arc<Self> {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel::<DeliveryJob>(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        let Some(job) = job else { break };
                        if job.interface().is_detached() {
                            debug!(
                                worker = id,
                                interface = %job.interface().reference(),
                                "Discarding delivery for removed interface"
                            );
                            DELIVERIES.with_label_values(&["discarded"]).inc();
                            continue;
                        }
                        job.run();
                        DELIVERIES.with_label_values(&["delivered"]).inc();
                    }
                    debug!(worker = id, "Delivery worker stopped");
                })
            })
            .collect();

        debug!(workers, queue_capacity = config.queue_capacity, "Delivery pool started");

        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            config,
        })
    }

    /// Queue a job without waiting.
    pub fn submit(&self, job: DeliveryJob) -> Result<(), DeliveryError> {
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(DeliveryError::Stopped)?;
        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                warn!(
                    interface = %job.interface().reference(),
                    capacity = self.config.queue_capacity,
                    "Delivery queue saturated, job rejected"
                );
                DELIVERIES.with_label_values(&["rejected"]).inc();
                Err(DeliveryError::Saturated)
            }
            Err(TrySendError::Closed(_)) => Err(DeliveryError::Stopped),
        }
    }

    /// Configured sizing.
    pub fn config(&self) -> DeliveryConfig {
        self.config
    }

    /// Stop intake, drain queued jobs and join the workers.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Delivery worker panicked");
            }
        }
    }
}

impl Drop for DeliveryPool {
    fn drop(&mut self) {
        for handle in self.workers.lock().drain(..) {
            handle.abort();
        }
    }
}
