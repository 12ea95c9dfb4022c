//! RoboCloud master entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rc_master::adapters::ClientEvent;
use rc_master::{MasterConfig, MasterRuntime};
use rc_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = MasterConfig::from_env();
    let runtime = Arc::new(MasterRuntime::new(config)?);
    runtime.start();

    // No robot transport is attached; pushes are logged.
    if let Some(mut events) = runtime.take_client_events() {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ClientEvent::ContainerStatus {
                        user,
                        tag,
                        connected,
                    } => info!(user = %user, container = %tag, connected, "Container status"),
                    ClientEvent::Message {
                        user,
                        robot_id,
                        endpoint_tag,
                        msg,
                    } => info!(
                        user = %user,
                        robot = %robot_id,
                        endpoint = %endpoint_tag,
                        interface = %msg.interface_tag,
                        "Message for robot"
                    ),
                }
            }
        });
    }

    let mut server = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.serve().await })
    };

    info!("Master is running. Press Ctrl+C to stop.");
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
        }
        result = &mut server => {
            match result {
                Ok(Err(e)) => error!(error = %e, "RPC gateway stopped"),
                Err(e) => error!(error = %e, "RPC gateway task failed"),
                Ok(Ok(())) => {}
            }
        }
    }

    runtime.shutdown().await;
    if !server.is_finished() {
        let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
    }
    Ok(())
}
