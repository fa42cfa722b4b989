use clap::Parser;
use cluster_state::config::Cli;
use cluster_state::coordinator::StateServer;
use cluster_state::transport::serve;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let server = StateServer::new(config);
    tracing::info!(
        "Starting cluster state server {} (v{})",
        server.id(),
        server.compatibility().server_version
    );
    if server.config().secret.is_none() {
        tracing::warn!("No cluster secret configured, any instance may connect");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    server.start();

    tracing::info!(
        "Listening on {} (socket path {})",
        addr,
        server.config().path
    );
    tracing::info!("Press Ctrl+C to shutdown");

    serve(server, listener).await?;

    Ok(())
}
