// main.rs
// Axum server wiring: connects to MongoDB, builds the router, and serves the balances API.
//
// Endpoints (all scoped by the `x-company-id` header):
// - GET /balances?customer=...&date=...
//     per-client balances
// - GET /balances/details?customer=...&start_date=...&end_date=...
//     opening balances plus the period's documents

use anyhow::Context;
use dotenvy::dotenv;
use std::{env, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

use compani::{routes, state, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init();

    let state = Arc::new(
        state::init_state()
            .await
            .context("failed to initialize MongoDB state")?,
    );

    let app = routes::router(state);

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .context("invalid BIND_ADDR")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
