//! dagboard server binary.
//!
//! Usage: `dagboard-server [CONFIG_PATH]`. Without an argument the path comes
//! from `DAGBOARD_CONFIG_PATH`, then `config.toml`; a missing file means
//! defaults.

use dagboard_server::config::{self, Config, LoadedConfig, LoggingConfig};
use dagboard_server::{app, AppState};
use std::net::SocketAddr;
use std::process::ExitCode;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Store(#[from] dagboard_db::StoreError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Picks the config file and names where the choice came from.
fn config_path() -> (String, &'static str) {
    let given = |value: &String| !value.trim().is_empty();

    if let Some(path) = std::env::args().nth(1).filter(given) {
        return (path, "cli-arg");
    }
    match std::env::var("DAGBOARD_CONFIG_PATH").ok().filter(given) {
        Some(path) => (path, "env-var"),
        None => (DEFAULT_CONFIG_PATH.to_string(), "default"),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let (path, chosen_by) = config_path();

    // No subscriber exists yet, so a config failure goes straight to stderr.
    let LoadedConfig {
        config,
        origin,
        ignored_env,
    } = match config::load_config(Some(&path)) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("dagboard-server: {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);
    tracing::info!(%path, chosen_by, origin = origin.as_str(), "configuration loaded");
    for key in ignored_env {
        tracing::warn!(key, "ignoring unparseable environment override");
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("dagboard server shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "dagboard server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    let pool = dagboard_db::open(&config.database.path, config.database.runtime_settings())?;

    let state = AppState::new(pool, &config.server.static_dir)
        .with_max_body_bytes(config.server.max_body_bytes);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!(
        %addr,
        static_dir = %config.server.static_dir,
        max_body_bytes = ?config.server.max_body_bytes,
        "dagboard server listening"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let signal = shutdown_requested().await;
            tracing::info!(signal, "draining connections before shutdown");
        })
        .await
        .map_err(StartupError::Serve)
}

/// Resolves when the process is asked to stop, naming the signal.
#[cfg(unix)]
async fn shutdown_requested() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting on Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn shutdown_requested() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl-c"
}
