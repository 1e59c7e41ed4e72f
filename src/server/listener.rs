//! The TCP listener and accept loop.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

use super::connection::ConnectionHandler;
use crate::hit::HitHandler;
use crate::metrics::MetricsSink;

/// A bound, not-yet-serving listener. Split from `serve` so callers (and
/// tests) can learn the bound address — relevant when binding an ephemeral
/// port (`:0`) — before the accept loop starts running.
pub struct Listener {
    listener: TcpListener,
    max_line_bytes: usize,
    max_connections: Option<usize>,
    shutdown_grace: Duration,
    hit_handler: Arc<HitHandler>,
    metrics: Arc<dyn MetricsSink>,
}

impl Listener {
    pub async fn bind(
        addr: &str,
        max_line_bytes: usize,
        max_connections: Option<usize>,
        shutdown_grace: Duration,
        hit_handler: Arc<HitHandler>,
        metrics: Arc<dyn MetricsSink>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Listener {
            listener,
            max_line_bytes,
            max_connections,
            shutdown_grace,
            hit_handler,
            metrics,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires, then stop accepting and
    /// drain in-flight connections up to `shutdown_grace` before returning.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let bound_addr = self.local_addr()?;
        info!(addr = %bound_addr, "listening");

        let active_connections = Arc::new(AtomicI64::new(0));
        let mut tasks = tokio::task::JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            if let Some(cap) = self.max_connections {
                                if active_connections.load(Ordering::Relaxed) as usize >= cap {
                                    drop(stream);
                                    continue;
                                }
                            }
                            let count = active_connections.fetch_add(1, Ordering::Relaxed) + 1;
                            self.metrics.gauge("connections", count);

                            let hit_handler = self.hit_handler.clone();
                            let metrics = self.metrics.clone();
                            let max_line_bytes = self.max_line_bytes;
                            let active_connections = active_connections.clone();
                            let mut conn_shutdown = shutdown.resubscribe();

                            tasks.spawn(async move {
                                let handler = ConnectionHandler::new(
                                    stream,
                                    peer_addr.to_string(),
                                    max_line_bytes,
                                    hit_handler,
                                    metrics.clone(),
                                );
                                tokio::select! {
                                    _ = handler.run() => {}
                                    _ = conn_shutdown.recv() => {}
                                }
                                let count = active_connections.fetch_sub(1, Ordering::Relaxed) - 1;
                                metrics.gauge("connections", count);
                            });
                        }
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }
            }
        }

        info!(grace_seconds = self.shutdown_grace.as_secs(), "draining connections");
        let _ = tokio::time::timeout(self.shutdown_grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        tasks.shutdown().await;

        Ok(())
    }
}
