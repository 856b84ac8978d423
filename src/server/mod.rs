//! HTTP listener for the link service.
//!
//! [`Server`] accepts TCP connections, serves HTTP/1.1 and HTTP/2 through
//! hyper-util's auto builder, and hands every buffered request to a
//! [`Router`].
//!
//! # Graceful Shutdown
//!
//! Shutdown is triggered by Ctrl+C or a [`ShutdownHandle`]. The accept loop
//! stops, open connections finish their in-flight requests within the drain
//! timeout, and the [`ApplicationContext`] is cancelled last.
//!
//! ```rust,ignore
//! let server = Server::bind(&config.server, router, context).await?;
//! let shutdown = server.shutdown_handle();
//! tokio::spawn(server.run());
//! // ...
//! shutdown.trigger();
//! ```

mod connection;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::core::ApplicationContext;
use crate::router::Router;
use connection::ConnectionContext;

/// Bound HTTP server.
pub struct Server {
    listener: TcpListener,
    context: ApplicationContext,
    connections: Arc<ConnectionContext>,
    drain_timeout: Duration,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Triggers graceful shutdown of a running [`Server`].
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Server {
    /// Bind the configured listen address.
    pub async fn bind(
        config: &ServerConfig,
        router: Router,
        context: ApplicationContext,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr.as_str()).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            listener,
            context,
            connections: Arc::new(ConnectionContext {
                router: Arc::new(router),
                max_body_bytes: config.max_body_bytes,
            }),
            drain_timeout: config.drain_timeout(),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Accept connections until shutdown, then drain.
    pub async fn run(self) -> io::Result<()> {
        info!("Server listening on http://{}", self.local_addr()?);

        let mut shutdown_rx = self.shutdown_rx.clone();
        let builder = auto::Builder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();

        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Accept error");
                            continue;
                        }
                    };
                    let _ = stream.set_nodelay(true);

                    let ctx = Arc::clone(&self.connections);
                    let service = service_fn(move |req| {
                        let ctx = Arc::clone(&ctx);
                        async move { ctx.handle_request(req).await }
                    });

                    let conn = builder
                        .serve_connection_with_upgrades(TokioIo::new(stream), service)
                        .into_owned();
                    let conn = graceful.watch(conn);
                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            debug!(remote_addr = %remote_addr, "Connection error: {:?}", err);
                        }
                    });
                }
                _ = shutdown_rx.changed() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        drop(self.listener);

        tokio::select! {
            _ = graceful.shutdown() => debug!("All connections drained"),
            _ = tokio::time::sleep(self.drain_timeout) => {
                warn!(timeout_secs = self.drain_timeout.as_secs(), "Drain timeout reached");
            }
        }

        self.context.cancel();
        info!("Server stopped");
        Ok(())
    }
}
