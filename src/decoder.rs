//! Payload decoding for readings and settings.
//!
//! Field layouts of the live data and settings replies vary between gateway
//! firmwares, so the client decodes them through [`PayloadDecoder`]. Every
//! method receives the whole validated response frame.

use crate::error::Result;
use crate::protocol::parser::{
    parse_custom_server_info, parse_firmware_version, parse_live_data, parse_user_path_info,
};
use crate::protocol::CommandCode;
use crate::types::{CustomServerInfo, LiveDataSnapshot, UserPathInfo};

/// Decodes command-specific response bodies.
pub trait PayloadDecoder: Send + Sync {
    /// Decodes a [`CommandCode::LiveData`] reply.
    fn decode_live_data(&self, response: &[u8]) -> Result<LiveDataSnapshot>;

    /// Decodes a [`CommandCode::ReadRainData`] reply.
    fn decode_rain_data(&self, response: &[u8]) -> Result<LiveDataSnapshot>;

    /// Decodes a [`CommandCode::ReadFirmware`] reply.
    fn decode_firmware_version(&self, response: &[u8]) -> Result<String>;

    /// Decodes a [`CommandCode::ReadCustomized`] reply.
    fn decode_custom_server_info(&self, response: &[u8]) -> Result<CustomServerInfo>;

    /// Decodes a [`CommandCode::ReadUserPath`] reply.
    fn decode_user_path_info(&self, response: &[u8]) -> Result<UserPathInfo>;
}

/// Decoder for the item layout used by WH2600/GW1000 firmware.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDecoder;

impl PayloadDecoder for StandardDecoder {
    fn decode_live_data(&self, response: &[u8]) -> Result<LiveDataSnapshot> {
        Ok(parse_live_data(response, CommandCode::LiveData))
    }

    fn decode_rain_data(&self, response: &[u8]) -> Result<LiveDataSnapshot> {
        Ok(parse_live_data(response, CommandCode::ReadRainData))
    }

    fn decode_firmware_version(&self, response: &[u8]) -> Result<String> {
        Ok(parse_firmware_version(response))
    }

    fn decode_custom_server_info(&self, response: &[u8]) -> Result<CustomServerInfo> {
        parse_custom_server_info(response)
    }

    fn decode_user_path_info(&self, response: &[u8]) -> Result<UserPathInfo> {
        parse_user_path_info(response)
    }
}
