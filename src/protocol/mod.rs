//! Protocol definitions for gateway communication.
//!
//! This module contains the low-level protocol types including:
//! - The additive checksum
//! - Frame building and validation
//! - Command codes
//! - Binary payload parsing

pub mod checksum;
pub mod command;
pub mod frame;
pub mod parser;

pub use checksum::checksum;
pub use command::CommandCode;
pub use frame::{
    MAX_PAYLOAD_SIZE, PREAMBLE, build as build_frame, payload, validate as validate_frame,
};
pub use parser::{
    parse_custom_server_info, parse_firmware_version, parse_items, parse_live_data,
    parse_sensor_table, parse_user_path_info,
};
