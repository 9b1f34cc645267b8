use anyhow::Context;
use lluvia_node::collector::{CollectorConfig, CollectorLink, ReconnectStrategy};
use lluvia_node::config::NodeConfig;
use lluvia_node::control::{router, AppState};
use lluvia_node::emission::EmissionLoop;
use lluvia_node::reading::ReadingGenerator;
use lluvia_node::registry::ControlAdvertiser;
use lluvia_node::state::{SensorState, DEFAULT_INTERVAL};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lluvia_node=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = NodeConfig::from_env()?;

    // Data channel first: a collector we cannot reach at startup is fatal
    let link = CollectorLink::connect(CollectorConfig::new(
        config.collector_host.clone(),
        config.collector_port,
    ))
    .context("collector connection failed at startup")?;

    let state = Arc::new(SensorState::new(DEFAULT_INTERVAL));
    let emission = EmissionLoop::new(
        state.clone(),
        link,
        ReadingGenerator::new(),
        ReconnectStrategy::default(),
    );
    let emission_handle = emission.spawn().context("failed to spawn emission thread")?;

    // Name advertisement is best-effort; the HTTP endpoint serves regardless.
    // The advertiser must stay alive until shutdown: dropping it tears down
    // the mDNS daemon and withdraws the name.
    let advertiser = match ControlAdvertiser::new() {
        Ok(advertiser) => {
            if let Err(e) = advertiser.advertise(&config.hostname, config.control_port) {
                tracing::warn!("control-name advertisement failed: {}", e);
            }
            Some(advertiser)
        }
        Err(e) => {
            tracing::warn!("mDNS daemon unavailable: {}", e);
            None
        }
    };

    let app = router(AppState {
        sensor: state.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.control_port));
    tracing::info!("control endpoint listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind control port")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Withdraw the control name, then stop the emission thread through its
    // one cancellation signal and wait for it to drain
    if let Some(advertiser) = advertiser {
        advertiser.stop();
    }
    state.set_running(false);
    if emission_handle.join().is_err() {
        tracing::error!("emission thread panicked");
    }

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested");
    }
}
