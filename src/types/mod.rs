//! Data types for gateway entities.
//!
//! This module contains the structures returned by the client:
//! - Sensor table records and filters
//! - Live data snapshots
//! - Customized server settings

pub mod live;
pub mod sensor;

pub use live::{
    CustomServerInfo, LOW_BATTERY_KEY, LiveDataSnapshot, LiveValue, UploadProtocol, UserPathInfo,
};
pub use sensor::{Match, SENSOR_TYPES, SensorFilter, SensorLink, SensorRecord, SensorStatus};
