//! Server lifecycle: bind, serve, shut down.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::router::{build_router, AppState};

/// Owns the application state and serves it over HTTP until shut down.
pub struct Server {
    state: AppState,
    bind_addr: SocketAddr,
    shutdown_token: CancellationToken,
}

impl Server {
    /// Create a server from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        let bind_addr: SocketAddr = config
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address: {}", config.server.bind_addr))?;

        let state = AppState::new(config).context("Failed to open library root")?;

        info!(root = %state.root().path().display(), "Library root ready");

        Ok(Self {
            state,
            bind_addr,
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind_addr))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until the shutdown token fires.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr().context("Failed to read local address")?;
        info!(addr = %local_addr, "Listening");

        let token = self.shutdown_token.clone();
        axum::serve(listener, build_router(self.state))
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .context("Server error")?;

        info!("Server stopped");
        Ok(())
    }
}

/// Wait for Ctrl-C or SIGTERM.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Received Ctrl-C");
    }
}
