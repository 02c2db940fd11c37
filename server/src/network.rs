//! Connection acceptor: admits TCP clients and runs one session task each

use crate::registry::{Registry, SharedRegistry};
use crate::session::{Session, SessionEnd};
use log::{error, info, warn};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

/// Game server owning the listening socket and the shared registry
pub struct Server {
    listener: TcpListener,
    registry: SharedRegistry,
}

impl Server {
    pub async fn bind(addr: &str, max_clients: usize) -> Result<Self, Box<dyn std::error::Error>> {
        if max_clients == 0 {
            return Err("max_clients must be at least 1".into());
        }

        let listener = TcpListener::bind(addr).await?;
        info!(
            "Server listening on {} with {} player slots",
            listener.local_addr()?,
            max_clients
        );

        Ok(Server {
            listener,
            registry: Registry::shared(max_clients),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Accepts connections until `shutdown` resolves
    ///
    /// On shutdown the acceptor stops accepting, drops every connection from
    /// the registry and waits for all sessions to flush and close.
    pub async fn run<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut sessions: JoinSet<SessionEnd> = JoinSet::new();

        info!("Server started successfully");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr, &mut sessions).await,
                    Err(e) => {
                        error!("Accept failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },

                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        error!("Session task failed: {}", e);
                    }
                }
            }
        }

        self.registry.lock().await.close_all();
        while let Some(finished) = sessions.join_next().await {
            if let Err(e) = finished {
                error!("Session task failed: {}", e);
            }
        }

        info!("All sessions closed");
        Ok(())
    }

    async fn admit(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        sessions: &mut JoinSet<SessionEnd>,
    ) {
        let admission = self.registry.lock().await.join(addr);

        match admission {
            Ok(admission) => {
                let session = Session::new(admission, stream, self.registry());
                sessions.spawn(session.run());
            }
            Err(e) => {
                // Dropping the stream closes it
                warn!("Rejecting connection from {}: {}", addr, e);
            }
        }
    }
}
