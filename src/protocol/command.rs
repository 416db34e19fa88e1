//! Command codes for the gateway protocol.
//!
//! Every request frame carries one of these codes and the gateway echoes it
//! back at offset 2 of its response. Only a handful are decoded by this
//! crate; the rest are listed so the command space is complete.

use crate::error::Error;

/// Command codes understood by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    // Provisioning
    /// Send router SSID and password to the wifi module.
    WriteSsid = 0x11,
    /// Look for devices on the local network.
    Broadcast = 0x12,

    // Upload targets
    /// Read Ecowitt.net settings.
    ReadEcowitt = 0x1E,
    /// Write Ecowitt.net settings.
    WriteEcowitt = 0x1F,
    /// Read Wunderground settings.
    ReadWunderground = 0x20,
    /// Write Wunderground settings.
    WriteWunderground = 0x21,
    /// Read Weather Observations Website settings.
    ReadWow = 0x22,
    /// Write Weather Observations Website settings.
    WriteWow = 0x23,
    /// Read Weathercloud settings.
    ReadWeathercloud = 0x24,
    /// Write Weathercloud settings.
    WriteWeathercloud = 0x25,

    /// Read the station MAC address.
    ReadStationMac = 0x26,
    /// Read current sensor readings.
    LiveData = 0x27,
    /// Read soil moisture calibration.
    GetSoilHumidity = 0x28,
    /// Write soil moisture calibration.
    SetSoilHumidity = 0x29,
    /// Read customized server settings.
    ReadCustomized = 0x2A,
    /// Write customized server settings.
    WriteCustomized = 0x2B,
    /// Read multi-channel sensor offsets.
    GetMultiChannelOffset = 0x2C,
    /// Write multi-channel sensor offsets.
    SetMultiChannelOffset = 0x2D,
    /// Read PM2.5 offset.
    GetPm25Offset = 0x2E,
    /// Write PM2.5 offset.
    SetPm25Offset = 0x2F,
    /// Read sensor setup (frequency, WH24/WH65 selection).
    ReadSensorSetup = 0x30,
    /// Write sensor setup.
    WriteSensorSetup = 0x31,

    // Rain and calibration
    /// Read rain counters.
    ReadRainData = 0x34,
    /// Write rain counters.
    WriteRainData = 0x35,
    /// Read rain gain.
    ReadGain = 0x36,
    /// Write rain gain.
    WriteGain = 0x37,
    /// Read multiple parameter offsets.
    ReadCalibration = 0x38,
    /// Write multiple parameter offsets.
    WriteCalibration = 0x39,

    // Sensor registry
    /// Read the paired sensor table.
    ReadSensorId = 0x3A,
    /// Write sensor IDs.
    WriteSensorId = 0x3B,
    /// Write sensor IDs (newer firmware).
    WriteSensorIdNew = 0x3C,

    // System
    /// Reboot the gateway.
    WriteReboot = 0x40,
    /// Reset to factory settings.
    WriteReset = 0x41,
    /// Start a firmware update.
    WriteUpdate = 0x43,

    /// Read firmware version string.
    ReadFirmware = 0x50,
    /// Read paths for the customized server.
    ReadUserPath = 0x51,
    /// Write paths for the customized server.
    WriteUserPath = 0x52,
}

impl CommandCode {
    /// Looks up a command by its wire byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x11 => Self::WriteSsid,
            0x12 => Self::Broadcast,
            0x1E => Self::ReadEcowitt,
            0x1F => Self::WriteEcowitt,
            0x20 => Self::ReadWunderground,
            0x21 => Self::WriteWunderground,
            0x22 => Self::ReadWow,
            0x23 => Self::WriteWow,
            0x24 => Self::ReadWeathercloud,
            0x25 => Self::WriteWeathercloud,
            0x26 => Self::ReadStationMac,
            0x27 => Self::LiveData,
            0x28 => Self::GetSoilHumidity,
            0x29 => Self::SetSoilHumidity,
            0x2A => Self::ReadCustomized,
            0x2B => Self::WriteCustomized,
            0x2C => Self::GetMultiChannelOffset,
            0x2D => Self::SetMultiChannelOffset,
            0x2E => Self::GetPm25Offset,
            0x2F => Self::SetPm25Offset,
            0x30 => Self::ReadSensorSetup,
            0x31 => Self::WriteSensorSetup,
            0x34 => Self::ReadRainData,
            0x35 => Self::WriteRainData,
            0x36 => Self::ReadGain,
            0x37 => Self::WriteGain,
            0x38 => Self::ReadCalibration,
            0x39 => Self::WriteCalibration,
            0x3A => Self::ReadSensorId,
            0x3B => Self::WriteSensorId,
            0x3C => Self::WriteSensorIdNew,
            0x40 => Self::WriteReboot,
            0x41 => Self::WriteReset,
            0x43 => Self::WriteUpdate,
            0x50 => Self::ReadFirmware,
            0x51 => Self::ReadUserPath,
            0x52 => Self::WriteUserPath,
            _ => return None,
        })
    }

    /// Returns true if the gateway answers this command with a two-byte size field.
    #[must_use]
    pub const fn has_wide_size(self) -> bool {
        matches!(self, Self::LiveData | Self::ReadRainData)
    }
}

impl From<CommandCode> for u8 {
    fn from(cmd: CommandCode) -> Self {
        cmd as Self
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte).ok_or(Error::UnknownCommand(byte))
    }
}
