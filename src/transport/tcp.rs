//! TCP transport implementation.
//!
//! Each command opens its own connection, writes one frame, waits for the
//! first buffer the gateway sends back and closes the socket again.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::protocol::{CommandCode, build_frame, validate_frame};
use crate::transport::Transport;

/// Default gateway command port.
pub const DEFAULT_PORT: u16 = 45000;

/// Receive buffer size; larger than any reply the gateway sends.
pub const READ_BUFFER_SIZE: usize = 2048;

/// Configuration for TCP transport.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Gateway host name or address.
    pub host: String,
    /// Gateway command port.
    pub port: u16,
    /// Upper bound on connect, write and read per command. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl TcpConfig {
    /// Creates a new TCP configuration with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the per-command timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// TCP transport for gateway communication.
///
/// Holds no socket between calls; concurrent commands each get their own
/// connection. Gateways generally serve one connection at a time, so callers
/// that need ordering must serialize their calls.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    /// Creates a new TCP transport with the given configuration.
    #[must_use]
    pub const fn new(config: TcpConfig) -> Self {
        Self { config }
    }

    /// Creates a new TCP transport for the given host with default settings.
    #[must_use]
    pub fn with_host(host: impl Into<String>) -> Self {
        Self::new(TcpConfig::new(host))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TcpConfig {
        &self.config
    }

    /// Connects, writes one frame and reads the first reply buffer.
    ///
    /// Returns `None` if the gateway closed the connection without sending anything.
    async fn exchange(&self, frame: &[u8]) -> Result<Option<Bytes>> {
        let mut stream = TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;
        tracing::trace!("sending frame: {} bytes", frame.len());
        stream.write_all(frame).await?;
        stream.flush().await?;

        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        let n = stream.read_buf(&mut buf).await?;
        // One reply per connection.
        drop(stream);

        if n == 0 {
            tracing::debug!("connection closed without data");
            return Ok(None);
        }
        tracing::trace!("received {} bytes", n);
        Ok(Some(buf.freeze()))
    }
}

impl Transport for TcpTransport {
    fn run_command(&self, command: CommandCode, payload: Bytes) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            tracing::debug!(
                "running {:?} against {}:{}",
                command,
                self.config.host,
                self.config.port
            );
            let frame = build_frame(command, &payload)?;

            let response = match self.config.timeout {
                Some(timeout) => tokio::time::timeout(timeout, self.exchange(&frame))
                    .await
                    .map_err(|_| Error::Timeout {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    })??,
                None => self.exchange(&frame).await?,
            };

            validate_frame(response.as_deref(), command)?;
            Ok(response.unwrap_or_default())
        })
    }
}
