//! # Master Runtime
//!
//! Owns every long-lived component and their background tasks.
//!
//! ## Startup Sequence
//!
//! 1. Create the bus and wrap it in the metered comm manager
//! 2. Start the delivery pool and the session manager
//! 3. Create the realm, user registry and RPC gateway
//! 4. `start()`: subscribe the inbound router (and loopback host), spawn them
//! 5. `serve()`: run the RPC front until shutdown

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rc_01_endpoints::DeliveryPool;
use rc_03_rpc_gateway::{
    ClientSink, GatewayContext, Realm, RpcGatewayService, SessionManager, UserRegistry,
};
use shared_bus::{CommManager, InMemoryCommBus};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::adapters::{
    ChannelClientSink, ClientEvent, InMemoryUserRegistry, LocalRealm, LoopbackHost,
    MeteredCommManager,
};
use crate::config::MasterConfig;
use crate::router::InboundRouter;

/// Pushes buffered towards robot clients.
const CLIENT_EVENT_CAPACITY: usize = 1024;

/// The running master process.
pub struct MasterRuntime {
    config: MasterConfig,
    bus: Arc<InMemoryCommBus>,
    comm: Arc<dyn CommManager>,
    pool: Arc<DeliveryPool>,
    sessions: Arc<SessionManager>,
    realm: Arc<LocalRealm>,
    users: Arc<InMemoryUserRegistry>,
    gateway: RpcGatewayService,
    client_events: Mutex<Option<mpsc::Receiver<ClientEvent>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl MasterRuntime {
    /// Build every component. Nothing runs until [`start`](Self::start).
    pub fn new(config: MasterConfig) -> Result<Self> {
        config.validate().context("Invalid master configuration")?;
        info!(comm_id = %config.realm.comm_id, "Creating RoboCloud master");

        let bus = Arc::new(InMemoryCommBus::with_capacity(
            config.realm.comm_id.clone(),
            config.bus.capacity,
        ));
        let comm: Arc<dyn CommManager> = Arc::new(MeteredCommManager::new(bus.clone()));
        let pool = DeliveryPool::start(config.delivery);

        let (sink, client_events) = ChannelClientSink::new(CLIENT_EVENT_CAPACITY);
        let sink: Arc<dyn ClientSink> = Arc::new(sink);
        let sessions = Arc::new(SessionManager::new(comm.clone(), pool.clone(), sink));

        let realm = Arc::new(LocalRealm::new(
            comm.clone(),
            config.realm.ready_timeout(),
            config.realm.capacity,
        ));
        let users = Arc::new(InMemoryUserRegistry::new());
        for (name, password) in &config.admin.users {
            users
                .add_user(name, password)
                .with_context(|| format!("Failed to seed user {name}"))?;
        }

        let context = Arc::new(GatewayContext {
            sessions: sessions.clone(),
            realm: realm.clone() as Arc<dyn Realm>,
            users: users.clone() as Arc<dyn UserRegistry>,
        });
        let gateway = RpcGatewayService::new(config.gateway.clone(), context)
            .context("Failed to create RPC gateway")?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            bus,
            comm,
            pool,
            sessions,
            realm,
            users,
            gateway,
            client_events: Mutex::new(Some(client_events)),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Spawn the background tasks.
    ///
    /// Subscriptions are taken before this returns, so no message sent
    /// afterwards is missed.
    pub fn start(&self) {
        let router = InboundRouter::new(self.sessions.clone(), self.realm.clone());
        let inbound = self
            .bus
            .subscribe(InboundRouter::filter(self.comm.comm_id()))
            .into_stream();
        tokio::spawn(router.run(inbound, self.shutdown_rx.clone()));
        info!("Inbound router started");

        if self.config.realm.loopback_host {
            let host = LoopbackHost::new(self.comm.clone());
            let subscription = self.bus.subscribe(host.filter());
            tokio::spawn(host.run(subscription, self.shutdown_rx.clone()));
            info!("Loopback environment host started");
        }
    }

    /// Run the RPC front until [`shutdown`](Self::shutdown).
    pub async fn serve(&self) -> Result<()> {
        self.gateway.serve().await.context("RPC gateway failed")
    }

    /// Take the stream of pushes towards robot clients.
    ///
    /// Returns `None` after the first call.
    pub fn take_client_events(&self) -> Option<mpsc::Receiver<ClientEvent>> {
        self.client_events.lock().take()
    }

    /// Stop serving, close every session and drain the delivery pool.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.gateway.shutdown();
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for comm_id in self.sessions.close_all() {
            self.realm.release_container(&comm_id);
        }
        self.pool.shutdown().await;
        self.bus.shutdown();
        info!("Shutdown complete");
    }

    /// Configuration in effect.
    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Session manager.
    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }

    /// Container realm.
    pub fn realm(&self) -> Arc<LocalRealm> {
        Arc::clone(&self.realm)
    }

    /// Credential store.
    pub fn users(&self) -> Arc<InMemoryUserRegistry> {
        Arc::clone(&self.users)
    }

    /// Raw message bus.
    pub fn bus(&self) -> Arc<InMemoryCommBus> {
        Arc::clone(&self.bus)
    }

    /// RPC gateway.
    pub fn gateway(&self) -> &RpcGatewayService {
        &self.gateway
    }
}
