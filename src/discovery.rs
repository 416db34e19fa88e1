//! UDP discovery of gateways on the local network.
//!
//! Gateways answer a broadcast on a fixed port. Every datagram that arrives
//! while the collection window is open counts as one discovered device.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::error::Result;
use crate::protocol::{CommandCode, build_frame};

/// Local port gateways send discovery replies to.
pub const DISCOVERY_PORT: u16 = 59387;

/// Address the discovery probe is broadcast to.
pub const DEFAULT_PROBE_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), 46000);

/// Default collection window.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Consecutive receive errors tolerated before the window is closed early.
pub const MAX_RECEIVE_ERRORS: u32 = 8;

/// Configuration for discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Local port to listen on.
    pub bind_port: u16,
    /// Where to send a broadcast probe before listening, if anywhere.
    pub probe: Option<SocketAddr>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind_port: DISCOVERY_PORT,
            probe: None,
        }
    }
}

impl DiscoveryConfig {
    /// Creates a listen-only configuration on [`DISCOVERY_PORT`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the local port.
    #[must_use]
    pub const fn bind_port(mut self, port: u16) -> Self {
        self.bind_port = port;
        self
    }

    /// Sends a [`CommandCode::Broadcast`] probe to `addr` before listening.
    #[must_use]
    pub const fn probe(mut self, addr: SocketAddr) -> Self {
        self.probe = Some(addr);
        self
    }
}

/// A bound discovery socket.
#[derive(Debug)]
pub struct Discovery {
    socket: UdpSocket,
    probe: Option<SocketAddr>,
}

impl Discovery {
    /// Binds the discovery socket.
    pub async fn bind(config: &DiscoveryConfig) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.bind_port)).await?;
        if config.probe.is_some() {
            socket.set_broadcast(true)?;
        }
        tracing::debug!("discovery listening on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            probe: config.probe,
        })
    }

    /// Returns the bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Collects responding addresses until `timeout` elapses.
    ///
    /// Addresses are deduplicated and returned in the order first seen. No
    /// replies is not an error. The socket is closed on return.
    pub async fn collect(self, timeout: Duration) -> Result<Vec<IpAddr>> {
        if let Some(target) = self.probe {
            let frame = build_frame(CommandCode::Broadcast, &[])?;
            self.socket.send_to(&frame, target).await?;
            tracing::trace!("sent discovery probe to {}", target);
        }

        let deadline = Instant::now() + timeout;
        let mut found = Vec::new();
        let mut buf = [0u8; 512];
        let mut errors = 0;

        loop {
            let received =
                tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await;
            match received {
                Err(_) => break,
                Ok(Ok((n, from))) => {
                    errors = 0;
                    tracing::trace!("discovery reply from {}: {} bytes", from, n);
                    if !found.contains(&from.ip()) {
                        found.push(from.ip());
                    }
                }
                Ok(Err(e)) => {
                    errors += 1;
                    if !keep_listening(&e, errors) {
                        tracing::warn!("discovery stopped after receive error: {}", e);
                        break;
                    }
                    tracing::debug!("discovery receive error: {}", e);
                }
            }
        }

        tracing::info!("discovered {} gateway(s)", found.len());
        Ok(found)
    }
}

/// Only ICMP-driven errors are transient, and only up to [`MAX_RECEIVE_ERRORS`] in a row.
fn keep_listening(err: &io::Error, consecutive: u32) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
    ) && consecutive < MAX_RECEIVE_ERRORS
}

/// Listens on [`DISCOVERY_PORT`] for `timeout` and returns every responding address.
pub async fn discover(timeout: Duration) -> Result<Vec<IpAddr>> {
    Discovery::bind(&DiscoveryConfig::new())
        .await?
        .collect(timeout)
        .await
}
