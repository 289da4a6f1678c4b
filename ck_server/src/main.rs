//! Chkobba matchmaking and play server.
//!
//! Runs one lobby: a background matching loop plus an actor per live match,
//! exposed over HTTP and WebSocket.

use std::net::SocketAddr;

use anyhow::Error;
use chkobba::Lobby;
use ck_server::{
    api,
    config::{ServerConfig, parse_stakes},
    logging, metrics,
};
use log::{error, info};
use pico_args::Arguments;

const HELP: &str = "\
Run a Chkobba matchmaking server

USAGE:
  ck_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3001]
  --stakes     LIST        Allowed stakes, comma separated  [default: env VALID_STAKES or 1,3,5,10]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:3001)
  METRICS_BIND             Prometheus scrape address; metrics are off when unset
  VALID_STAKES             Allowed stakes (e.g., 1,3,5,10)
  QUEUE_WAIT_SECS          Wait before humans are seated together  [default: 20]
  QUEUE_MAX_WAIT_SECS      Wait before fallback players fill seats  [default: 30]
  MATCHING_INTERVAL_MS     Background matching pass period  [default: 1000]
  FALLBACK_THINK_MS        Delay between fallback moves  [default: 1000]
  RUST_LOG                 Log filter  [default: info]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let stakes = pargs.opt_value_from_fn("--stakes", parse_stakes)?;

    let config = ServerConfig::from_env(bind, stakes)?;
    config.validate()?;

    logging::init();
    info!("Starting Chkobba server at {}", config.bind);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics at http://{metrics_bind}/metrics");
    }

    info!(
        "Stakes {:?}, queue wait {}s, max wait {}s",
        config.lobby.valid_stakes, config.lobby.queue_wait_secs, config.lobby.queue_max_wait_secs
    );
    let lobby = Lobby::new(config.lobby.clone());
    let matching = tokio::spawn(lobby.clone().run_matching_loop());

    let app = api::create_router(api::AppState { lobby });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    matching.abort();

    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
