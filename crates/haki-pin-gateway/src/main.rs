//! Pin gateway binary.
//!
//! Configuration comes from the environment; see [`GatewayConfig::from_env`].

use anyhow::{Context, Result};
use haki_pin_gateway::{GatewayConfig, PinGatewayService};
use haki_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_component("pin-gateway"))
        .await
        .context("failed to initialize telemetry")?;

    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;
    info!(
        addr = %config.http_addr(),
        pinata = %config.pinata.url,
        auth = config.pinata.credentials.as_ref().map_or("none", |c| c.mode()),
        "Starting pin gateway"
    );

    let mut service = PinGatewayService::with_pinata(config)?;
    service.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    service.shutdown().await;
    Ok(())
}
