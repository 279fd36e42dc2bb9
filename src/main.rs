use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use classpoll::config::ServerConfig;
use classpoll::server::{serve, AppState};

/// Real-time classroom polling server
#[derive(Debug, Parser)]
#[command(name = "classpolld", version)]
struct Cli {
    /// Bind address
    #[arg(long)]
    bind: Option<String>,
    /// Listen port (overrides the PORT environment variable)
    #[arg(long)]
    port: Option<u16>,
    /// Log filter, e.g. "info" or "classpoll=debug"
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log)),
        )
        .init();

    let mut config = ServerConfig::from_env();
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let state = AppState::new(&config);
    if let Err(err) = serve(&config, state).await {
        error!(%err, "server failed");
        std::process::exit(1);
    }
}
