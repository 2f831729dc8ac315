use std::net::{Ipv4Addr, SocketAddrV4};

use anime_relay::{AppState, app, config::Config, upstream::Upstream};
use tokio::{net::TcpListener, signal};
use tracing::{instrument, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .build()?;
    let state = AppState::new(client, Upstream::new(config.upstream_base.clone()))
        .with_upstream_timeout(config.upstream_timeout);
    let app = app(state);

    let ip = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port);

    tracing::info!(upstream = %config.upstream_base, "running server at :{}", config.port);

    let listener = TcpListener::bind(ip).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await?;

    Ok(())
}

#[instrument(skip_all)]
async fn shutdown() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutting down..");
}
