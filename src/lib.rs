//! # ecowitt-gateway
//!
//! A Rust client library for Ecowitt/Fine Offset weather-station gateways
//! (WH2600, GW1000 and compatibles).
//!
//! This library speaks the gateway's binary command protocol over TCP and
//! finds gateways on the local network with UDP broadcast.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Checksum-validated framing with typed errors
//! - Sensor table decoding with status and type filters
//! - Live data with low-battery flags limited to paired sensors
//! - Pluggable payload decoding
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use ecowitt_gateway::{Gateway, SensorFilter, TcpConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ecowitt_gateway::Error> {
//!     // Find gateways on the local network
//!     let found = Gateway::discover(Duration::from_secs(2)).await?;
//!     println!("Found: {found:?}");
//!
//!     let gw = Gateway::with_tcp_config(
//!         TcpConfig::new("192.168.1.40").timeout(Duration::from_secs(5)),
//!     );
//!
//!     // List paired sensors
//!     let active = gw
//!         .get_sensors(Some(&SensorFilter::new().status("active")))
//!         .await?;
//!     for sensor in &active {
//!         println!("{} id={:?} signal={:?}", sensor.sensor_type, sensor.id(), sensor.signal());
//!     }
//!
//!     // Current readings
//!     let data = gw.get_live_data(true).await?;
//!     println!("Indoor: {:?}°C", data.number("intemp"));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Low-level protocol types (checksum, frames, commands, parsers)
//! - [`types`] - Data structures (sensor records, filters, live data)
//! - [`transport`] - Transport implementations (one TCP connection per command)
//! - [`discovery`] - UDP discovery of gateways
//! - [`registry`] - Sensor table fetching and caching
//! - [`decoder`] - Pluggable payload decoding
//! - [`client`] - High-level [`Gateway`] client

pub mod client;
pub mod decoder;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::Gateway;
pub use decoder::{PayloadDecoder, StandardDecoder};
pub use discovery::{Discovery, DiscoveryConfig, discover};
pub use error::{Error, FrameError, Result};
pub use protocol::CommandCode;
pub use registry::SensorRegistry;
pub use transport::{TcpConfig, TcpTransport, Transport};
pub use types::{
    CustomServerInfo, LiveDataSnapshot, LiveValue, Match, SensorFilter, SensorLink, SensorRecord,
    SensorStatus, UploadProtocol, UserPathInfo,
};
