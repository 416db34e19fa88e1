//! Transport layer for gateway communication.
//!
//! The gateway answers exactly one command per connection, so a transport
//! exposes a single request/response operation instead of a long-lived
//! session.

pub mod tcp;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::protocol::CommandCode;

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Sends `command` with `payload` and returns the validated response frame.
    ///
    /// An empty payload sends the bare command.
    fn run_command(&self, command: CommandCode, payload: Bytes) -> BoxFuture<'_, Result<Bytes>>;
}

pub use tcp::{TcpConfig, TcpTransport};
