//! Binary payload parsing for gateway responses.
//!
//! Every function here takes a complete response frame that has already
//! passed [`validate`](crate::protocol::frame::validate).

use std::collections::BTreeMap;

use bytes::Buf;

use crate::error::{Error, Result};
use crate::protocol::command::CommandCode;
use crate::protocol::frame::{PAYLOAD_OFFSET, WIDE_PAYLOAD_OFFSET, payload};
use crate::types::{
    CustomServerInfo, LOW_BATTERY_KEY, LiveDataSnapshot, LiveValue, SENSOR_TYPES, SensorRecord,
    UploadProtocol, UserPathInfo,
};

/// A sensor table reply must be longer than this.
pub const MIN_SENSOR_TABLE_SIZE: usize = 200;

/// Width of one sensor table record: type, ID (4), signal, battery.
pub const SENSOR_RECORD_SIZE: usize = 7;

/// Size of the low-battery item value.
pub const LOW_BATTERY_SIZE: usize = 16;

/// Parses the sensor table returned by [`CommandCode::ReadSensorId`].
///
/// Format:
/// ```text
/// [FF FF] [cmd:1] [size:1] ([type:1] [id:4BE] [signal:1] [battery:1])* [sum:1]
/// ```
///
/// Records are read while their offset is below the declared size.
pub fn parse_sensor_table(response: &[u8]) -> Result<Vec<SensorRecord>> {
    if response.len() <= MIN_SENSOR_TABLE_SIZE {
        return Err(Error::InvalidDataLength {
            len: response.len(),
        });
    }

    let declared = usize::from(response[3]);
    let body_end = response.len() - 1;
    let mut records = Vec::new();
    let mut offset = PAYLOAD_OFFSET;

    while offset < declared && offset + SENSOR_RECORD_SIZE <= body_end {
        let record = &response[offset..offset + SENSOR_RECORD_SIZE];
        let raw_id = [record[1], record[2], record[3], record[4]];

        let sensor_type = SENSOR_TYPES.get(usize::from(record[0])).map_or_else(
            || format!("Unknown Type ({})", hex::encode_upper(raw_id)),
            |name| (*name).to_owned(),
        );

        records.push(SensorRecord::new(sensor_type, raw_id, record[5], record[6]));
        offset += SENSOR_RECORD_SIZE;
    }

    tracing::trace!("parsed {} sensor records", records.len());
    Ok(records)
}

/// How a live data item's bytes turn into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    /// Signed, tenths of a unit.
    SignedTenths,
    /// Unsigned, tenths of a unit.
    Tenths,
    /// Unsigned, whole units.
    Whole,
    /// Consumed but not reported.
    Skip,
    /// The low-battery block.
    LowBattery,
}

/// Looks up the name, width and encoding of a live data item.
fn lookup_item(id: u8) -> Option<(String, usize, Reading)> {
    use Reading::{LowBattery, SignedTenths, Skip, Tenths, Whole};

    let fixed = |name: &str, size, reading| Some((name.to_owned(), size, reading));

    match id {
        0x01 => fixed("intemp", 2, SignedTenths),
        0x02 => fixed("outtemp", 2, SignedTenths),
        0x03 => fixed("dewpoint", 2, SignedTenths),
        0x04 => fixed("windchill", 2, SignedTenths),
        0x05 => fixed("heatindex", 2, SignedTenths),
        0x06 => fixed("inhumid", 1, Whole),
        0x07 => fixed("outhumid", 1, Whole),
        0x08 => fixed("absbarometer", 2, Tenths),
        0x09 => fixed("relbarometer", 2, Tenths),
        0x0A => fixed("winddir", 2, Whole),
        0x0B => fixed("windspeed", 2, Tenths),
        0x0C => fixed("gustspeed", 2, Tenths),
        0x0D => fixed("rainevent", 2, Tenths),
        0x0E => fixed("rainrate", 2, Tenths),
        0x0F => fixed("rainhour", 2, Tenths),
        0x10 => fixed("rainday", 2, Tenths),
        0x11 => fixed("rainweek", 2, Tenths),
        0x12 => fixed("rainmonth", 4, Tenths),
        0x13 => fixed("rainyear", 4, Tenths),
        0x14 => fixed("raintotals", 4, Tenths),
        0x15 => fixed("light", 4, Tenths),
        0x16 => fixed("uv", 2, Tenths),
        0x17 => fixed("uvi", 1, Whole),
        0x18 => fixed("time", 6, Skip),
        0x19 => fixed("daymaxwind", 2, Tenths),
        0x1A..=0x21 => Some((format!("temp{}", id - 0x19), 2, SignedTenths)),
        0x22..=0x29 => Some((format!("humidity{}", id - 0x21), 1, Whole)),
        0x2A => fixed("pm25_ch1", 2, Tenths),
        // Soil channels alternate temperature and moisture.
        0x2B..=0x4A => {
            let channel = (id - 0x2B) / 2 + 1;
            if (id - 0x2B) % 2 == 0 {
                Some((format!("soiltemp{channel}"), 2, SignedTenths))
            } else {
                Some((format!("soilmoisture{channel}"), 1, Whole))
            }
        }
        0x4C => fixed(LOW_BATTERY_KEY, LOW_BATTERY_SIZE, LowBattery),
        0x4D..=0x50 => Some((format!("pm25_24h_ch{}", id - 0x4C), 2, Tenths)),
        0x51..=0x53 => Some((format!("pm25_ch{}", id - 0x4F), 2, Tenths)),
        0x58..=0x5B => Some((format!("leak_ch{}", id - 0x57), 1, Whole)),
        0x60 => fixed("lightning_distance", 1, Whole),
        0x61 => fixed("lightning_time", 4, Whole),
        0x62 => fixed("lightning_count", 4, Whole),
        _ => None,
    }
}

/// Reads an unsigned big-endian integer of up to four bytes.
fn read_be(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

/// Decodes an item stream into a snapshot.
///
/// Format: `([id:1] [value:n])*`, where `n` is fixed per id. Decoding stops
/// at the first unknown id or truncated value, keeping what was read so far.
pub fn parse_items(mut data: &[u8]) -> LiveDataSnapshot {
    let mut snapshot = LiveDataSnapshot::new();

    while data.has_remaining() {
        let id = data.get_u8();
        let Some((name, size, reading)) = lookup_item(id) else {
            tracing::warn!(
                "unknown live data item 0x{id:02x}, {} bytes left undecoded",
                data.remaining()
            );
            break;
        };
        if data.remaining() < size {
            tracing::warn!(
                "live data item {name} truncated: need {size} bytes, got {}",
                data.remaining()
            );
            break;
        }

        let value = &data[..size];
        match reading {
            Reading::SignedTenths => {
                let raw = i16::from_be_bytes([value[0], value[1]]);
                snapshot.insert(name, f64::from(raw) / 10.0);
            }
            Reading::Tenths => snapshot.insert(name, f64::from(read_be(value)) / 10.0),
            Reading::Whole => snapshot.insert(name, f64::from(read_be(value))),
            Reading::LowBattery => snapshot.insert(name, parse_low_battery(value)),
            Reading::Skip => {}
        }
        data.advance(size);
    }

    snapshot
}

/// Builds a channel group from a bitmask, one flag per channel.
fn bit_channels(mask: u16, count: u8) -> LiveValue {
    (0..count)
        .map(|bit| {
            (
                format!("ch{}", bit + 1),
                LiveValue::Number(f64::from((mask >> bit) & 1)),
            )
        })
        .collect::<BTreeMap<_, _>>()
        .into()
}

/// Builds a four-channel group from two bytes of 4-bit levels.
fn nibble_channels(bytes: [u8; 2]) -> LiveValue {
    let levels = [bytes[0] & 0x0F, bytes[0] >> 4, bytes[1] & 0x0F, bytes[1] >> 4];
    levels
        .iter()
        .enumerate()
        .map(|(i, &level)| (format!("ch{}", i + 1), LiveValue::Number(f64::from(level))))
        .collect::<BTreeMap<_, _>>()
        .into()
}

/// Decodes the 16-byte low-battery block.
///
/// Layout:
/// ```text
/// [0] bit4 wh40, bit5 wh26, bit6 wh25, bit7 wh65
/// [1] wh31 ch1-8 bits      [2..4] wh51 ch1-16 bits (LE)
/// [4] wh57 level           [5] wh68 volts/0.02   [6] wh80 volts/0.02
/// [8..10] wh41 ch1-4 nibbles                     [10..12] wh55 ch1-4 nibbles
/// ```
fn parse_low_battery(block: &[u8]) -> BTreeMap<String, LiveValue> {
    let flag = |bit: u8| LiveValue::Number(f64::from((block[0] >> bit) & 1));

    let mut low = BTreeMap::new();
    low.insert("wh40".to_owned(), flag(4));
    low.insert("wh26".to_owned(), flag(5));
    low.insert("wh25".to_owned(), flag(6));
    low.insert("wh65".to_owned(), flag(7));
    low.insert("wh31".to_owned(), bit_channels(u16::from(block[1]), 8));
    low.insert(
        "wh51".to_owned(),
        bit_channels(u16::from_le_bytes([block[2], block[3]]), 16),
    );
    low.insert("wh57".to_owned(), LiveValue::Number(f64::from(block[4])));
    low.insert(
        "wh68".to_owned(),
        LiveValue::Number(f64::from(block[5]) * 0.02),
    );
    low.insert(
        "wh80".to_owned(),
        LiveValue::Number(f64::from(block[6]) * 0.02),
    );
    low.insert("wh41".to_owned(), nibble_channels([block[8], block[9]]));
    low.insert("wh55".to_owned(), nibble_channels([block[10], block[11]]));
    low
}

/// Parses a [`CommandCode::LiveData`] or [`CommandCode::ReadRainData`] reply.
#[must_use]
pub fn parse_live_data(response: &[u8], command: CommandCode) -> LiveDataSnapshot {
    parse_items(payload(response, command))
}

/// Parses the firmware version reply.
///
/// Format: `[FF FF] [cmd:1] [size:1] [len:1] [ascii...] [sum:1]`
#[must_use]
pub fn parse_firmware_version(response: &[u8]) -> String {
    let end = response.len().saturating_sub(1);
    let text = response.get(WIDE_PAYLOAD_OFFSET..end).unwrap_or_default();
    String::from_utf8_lossy(text).into_owned()
}

/// Reads a length-prefixed string.
fn take_string(buf: &mut &[u8], field: &str) -> Result<String> {
    if !buf.has_remaining() {
        return Err(Error::decode(format!("{field}: missing length")));
    }
    let len = usize::from(buf.get_u8());
    if buf.remaining() < len {
        return Err(Error::decode(format!(
            "{field}: need {len} bytes, got {}",
            buf.remaining()
        )));
    }
    let value = String::from_utf8_lossy(&buf[..len]).into_owned();
    buf.advance(len);
    Ok(value)
}

/// Parses the customized server reply.
///
/// Format:
/// ```text
/// [id_len:1] [id] [key_len:1] [key] [server_len:1] [server]
/// [port:2BE] [interval:2BE] [protocol:1] [enabled:1]
/// ```
pub fn parse_custom_server_info(response: &[u8]) -> Result<CustomServerInfo> {
    let mut buf = payload(response, CommandCode::ReadCustomized);

    let id = take_string(&mut buf, "id")?;
    let password = take_string(&mut buf, "password")?;
    let server = take_string(&mut buf, "server")?;

    if buf.remaining() < 6 {
        return Err(Error::decode(format!(
            "customized server settings too short: {} trailing bytes",
            buf.remaining()
        )));
    }
    let port = buf.get_u16();
    let interval = buf.get_u16();
    let protocol = UploadProtocol::from_byte(buf.get_u8());
    let enabled = buf.get_u8() != 0;

    Ok(CustomServerInfo {
        id,
        password,
        server,
        port,
        interval,
        protocol,
        enabled,
        paths: None,
    })
}

/// Parses the customized server path reply.
///
/// Format: `[ecowitt_len:1] [ecowitt_path] [wu_len:1] [wu_path]`
pub fn parse_user_path_info(response: &[u8]) -> Result<UserPathInfo> {
    let mut buf = payload(response, CommandCode::ReadUserPath);
    Ok(UserPathInfo {
        ecowitt_path: take_string(&mut buf, "ecowitt path")?,
        wunderground_path: take_string(&mut buf, "wunderground path")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::checksum::checksum;
    use crate::protocol::frame::build;
    use crate::types::SensorStatus;

    /// Builds a full 31-slot sensor table reply from `(type, id, signal, battery)` slots.
    pub(crate) fn sensor_table(slots: &[(u8, [u8; 4], u8, u8)]) -> Vec<u8> {
        let mut body = Vec::new();
        for type_id in 0..31u8 {
            let (t, id, signal, battery) = slots
                .iter()
                .copied()
                .find(|s| s.0 == type_id)
                .unwrap_or((type_id, [0xFF, 0xFF, 0xFF, 0xFE], 0, 0));
            body.push(t);
            body.extend_from_slice(&id);
            body.push(signal);
            body.push(battery);
        }
        build(CommandCode::ReadSensorId, &body).unwrap().to_vec()
    }

    /// Builds a wide-size frame around an item stream.
    pub(crate) fn wide_frame(command: CommandCode, items: &[u8]) -> Vec<u8> {
        let size = u16::try_from(items.len() + 4).unwrap();
        let mut frame = vec![0xFF, 0xFF, u8::from(command)];
        frame.extend_from_slice(&size.to_be_bytes());
        frame.extend_from_slice(items);
        let sum = checksum(&frame[2..]);
        frame.push(sum);
        frame
    }

    #[test]
    fn test_sensor_table_too_short() {
        let frame = build(CommandCode::ReadSensorId, &[0u8; 196]).unwrap();
        assert_eq!(frame.len(), 201);
        assert!(parse_sensor_table(&frame).is_ok());

        let frame = build(CommandCode::ReadSensorId, &[0u8; 195]).unwrap();
        assert!(matches!(
            parse_sensor_table(&frame),
            Err(Error::InvalidDataLength { len: 200 })
        ));
    }

    #[test]
    fn test_sensor_table_full() {
        let frame = sensor_table(&[
            (0, [0x00, 0x00, 0x04, 0xA1], 4, 0),
            (26, [0x00, 0x0C, 0x1F, 0x3E], 3, 5),
            (6, [0xFF, 0xFF, 0xFF, 0xFF], 0, 0),
        ]);
        let sensors = parse_sensor_table(&frame).unwrap();
        assert_eq!(sensors.len(), 31);

        assert_eq!(sensors[0].sensor_type, "WH65");
        assert_eq!(sensors[0].status, SensorStatus::Active);
        assert_eq!(sensors[0].id(), Some("4A1"));
        assert_eq!(sensors[0].signal(), Some(4));

        assert_eq!(sensors[26].sensor_type, "WH57");
        assert_eq!(sensors[26].id(), Some("C1F3E"));
        assert_eq!(sensors[26].battery(), Some(5));

        assert_eq!(sensors[6].status, SensorStatus::Registering);
        assert_eq!(sensors[1].status, SensorStatus::Disabled);
        assert_eq!(sensors[1].link, None);
    }

    #[test]
    fn test_sensor_table_unknown_type() {
        let mut body = Vec::new();
        for _ in 0..31 {
            body.extend_from_slice(&[31, 0x00, 0x00, 0x00, 0x2A, 4, 1]);
        }
        let frame = build(CommandCode::ReadSensorId, &body).unwrap();
        let sensors = parse_sensor_table(&frame).unwrap();
        assert_eq!(sensors[0].sensor_type, "Unknown Type (0000002A)");
        assert_eq!(sensors[0].id(), Some("2A"));
    }

    #[test]
    fn test_sensor_table_respects_declared_size() {
        let mut frame = sensor_table(&[]);
        // Declare room for two records only and re-sum.
        frame[3] = 4 + 2 * 7;
        let last = frame.len() - 1;
        frame[last] = checksum(&frame[2..last]);
        assert_eq!(parse_sensor_table(&frame).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_items_scalars() {
        let items = [
            0x01, 0x00, 0xD7, // intemp 21.5
            0x02, 0xFF, 0xEC, // outtemp -2.0
            0x06, 0x2D, // inhumid 45
            0x08, 0x27, 0x94, // absbarometer 1013.2
            0x12, 0x00, 0x00, 0x01, 0x2C, // rainmonth 30.0
            0x18, 1, 2, 3, 4, 5, 6, // time, skipped
            0x1B, 0x00, 0x64, // temp2 10.0
            0x2C, 0x37, // soilmoisture1 55
        ];
        let snapshot = parse_items(&items);

        assert_eq!(snapshot.number("intemp"), Some(21.5));
        assert_eq!(snapshot.number("outtemp"), Some(-2.0));
        assert_eq!(snapshot.number("inhumid"), Some(45.0));
        assert_eq!(snapshot.number("absbarometer"), Some(1013.2));
        assert_eq!(snapshot.number("rainmonth"), Some(30.0));
        assert_eq!(snapshot.number("temp2"), Some(10.0));
        assert_eq!(snapshot.number("soilmoisture1"), Some(55.0));
        assert!(snapshot.get("time").is_none());
    }

    #[test]
    fn test_parse_items_stops_at_unknown() {
        let items = [0x06, 0x2D, 0xEE, 0x01, 0x07, 0x50];
        let snapshot = parse_items(&items);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.number("inhumid"), Some(45.0));
    }

    #[test]
    fn test_parse_items_stops_at_truncated() {
        let items = [0x06, 0x2D, 0x12, 0x00, 0x01];
        let snapshot = parse_items(&items);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("rainmonth").is_none());
    }

    #[test]
    fn test_parse_low_battery_block() {
        let mut items = vec![0x4C];
        items.extend_from_slice(&[
            0b1000_0000, // wh65 low
            0b0000_0010, // wh31 ch2 low
            0x01,
            0x00, // wh51 ch1 low
            4,    // wh57 level
            65,   // wh68 1.3V
            0,
            0,
            0x21, // wh41 ch1=1 ch2=2
            0x00,
            0x00,
            0x50, // wh55 ch4=5
            0,
            0,
            0,
            0,
        ]);
        let snapshot = parse_items(&items);
        let low = snapshot.low_battery().unwrap();

        assert_eq!(low["wh65"], LiveValue::Number(1.0));
        assert_eq!(low["wh40"], LiveValue::Number(0.0));
        assert_eq!(low["wh57"], LiveValue::Number(4.0));
        let wh31 = low["wh31"].as_group().unwrap();
        assert_eq!(wh31.len(), 8);
        assert_eq!(wh31["ch2"], LiveValue::Number(1.0));
        assert_eq!(wh31["ch1"], LiveValue::Number(0.0));
        assert_eq!(low["wh51"].as_group().unwrap().len(), 16);
        let wh41 = low["wh41"].as_group().unwrap();
        assert_eq!(wh41["ch1"], LiveValue::Number(1.0));
        assert_eq!(wh41["ch2"], LiveValue::Number(2.0));
        assert_eq!(low["wh55"].as_group().unwrap()["ch4"], LiveValue::Number(5.0));
        assert!((low["wh68"].as_number().unwrap() - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_parse_live_data_frame() {
        let frame = wide_frame(CommandCode::LiveData, &[0x07, 0x50, 0x0A, 0x00, 0xB4]);
        let snapshot = parse_live_data(&frame, CommandCode::LiveData);
        assert_eq!(snapshot.number("outhumid"), Some(80.0));
        assert_eq!(snapshot.number("winddir"), Some(180.0));
    }

    #[test]
    fn test_parse_firmware_version() {
        let frame = build(CommandCode::ReadFirmware, b"\x0dGW1000_V1.6.8").unwrap();
        assert_eq!(parse_firmware_version(&frame), "GW1000_V1.6.8");
        assert_eq!(parse_firmware_version(&[0xFF, 0xFF, 0x50]), "");
    }

    #[test]
    fn test_parse_custom_server_info() {
        let mut body = vec![3];
        body.extend_from_slice(b"abc");
        body.push(0);
        body.push(11);
        body.extend_from_slice(b"192.168.1.5");
        body.extend_from_slice(&8080u16.to_be_bytes());
        body.extend_from_slice(&60u16.to_be_bytes());
        body.extend_from_slice(&[1, 1]);
        let frame = build(CommandCode::ReadCustomized, &body).unwrap();

        let info = parse_custom_server_info(&frame).unwrap();
        assert_eq!(info.id, "abc");
        assert_eq!(info.password, "");
        assert_eq!(info.server, "192.168.1.5");
        assert_eq!(info.port, 8080);
        assert_eq!(info.interval, 60);
        assert_eq!(info.protocol, UploadProtocol::Wunderground);
        assert!(info.enabled);
        assert_eq!(info.paths, None);
    }

    #[test]
    fn test_parse_custom_server_info_truncated() {
        let frame = build(CommandCode::ReadCustomized, &[5, b'a', b'b']).unwrap();
        assert!(matches!(
            parse_custom_server_info(&frame),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_parse_user_path_info() {
        let mut body = vec![13];
        body.extend_from_slice(b"/data/report/");
        body.push(19);
        body.extend_from_slice(b"/weatherstation/upd");
        let frame = build(CommandCode::ReadUserPath, &body).unwrap();

        let paths = parse_user_path_info(&frame).unwrap();
        assert_eq!(paths.ecowitt_path, "/data/report/");
        assert_eq!(paths.wunderground_path, "/weatherstation/upd");
    }
}
