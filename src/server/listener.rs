use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::server::state::ServerState;

/// Pause after a failed accept, e.g. when the process is out of descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let state = Arc::new(ServerState::from_config(cfg)?);
    info!(
        root = %state.root.path().display(),
        extensions = ?state.root.allowed_extensions(),
        requests_per_second = cfg.limits.requests_per_second,
        counter = ?state.counter.mode(),
        "Serving directory"
    );

    let listener = bind_with_retry(
        &cfg.server.listen_addr(),
        cfg.server.bind_attempts,
        cfg.server.bind_retry_delay(),
    )
    .await?;

    serve(listener, state, cfg.server.max_workers).await
}

/// Binds `addr`, retrying up to `attempts` times with `delay` in between.
pub async fn bind_with_retry(
    addr: &str,
    attempts: u32,
    delay: Duration,
) -> anyhow::Result<TcpListener> {
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if attempt < attempts => {
                warn!(
                    address = addr,
                    attempt,
                    attempts,
                    error = %e,
                    "Bind failed, retrying in {}s",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to bind {} after {} attempts", addr, attempts));
            }
        }
    }
}

/// Accepts connections forever, running at most `max_workers` at once.
pub async fn serve(
    listener: TcpListener,
    state: Arc<ServerState>,
    max_workers: usize,
) -> anyhow::Result<()> {
    let workers = Arc::new(Semaphore::new(max_workers.max(1)));
    info!("Listening on {}", listener.local_addr()?);

    loop {
        // Wait for a free worker before taking the next connection off the backlog
        let permit = Arc::clone(&workers).acquire_owned().await?;

        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };
        tracing::debug!("Accepted connection from {}", peer);

        let shared = Arc::clone(&state);
        tokio::spawn(async move {
            let _permit = permit;
            let conn = Connection::new(socket, peer.ip(), shared);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {:#}", peer, e);
            }
        });
    }
}
