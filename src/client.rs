//! Main [`Gateway`] client implementation.
//!
//! This module provides the high-level [`Gateway`] client that combines
//! transport, the sensor registry and payload decoding into a unified
//! interface.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::decoder::{PayloadDecoder, StandardDecoder};
use crate::discovery;
use crate::error::Result;
use crate::protocol::CommandCode;
use crate::registry::SensorRegistry;
use crate::transport::{TcpConfig, TcpTransport, Transport};
use crate::types::{CustomServerInfo, LiveDataSnapshot, SensorFilter, SensorRecord};

/// Client for communicating with a weather-station gateway.
pub struct Gateway<T> {
    transport: Arc<T>,
    registry: SensorRegistry<T>,
    decoder: Box<dyn PayloadDecoder>,
}

impl Gateway<TcpTransport> {
    /// Creates a new client for a gateway on the default port.
    ///
    /// # Arguments
    ///
    /// * `host` - Gateway host name or address (e.g., "192.168.1.40")
    #[must_use]
    pub fn tcp(host: impl Into<String>) -> Self {
        Self::with_tcp_config(TcpConfig::new(host))
    }

    /// Creates a new client with custom TCP configuration.
    #[must_use]
    pub fn with_tcp_config(config: TcpConfig) -> Self {
        Self::new(TcpTransport::new(config))
    }

    /// Listens for discovery replies for `timeout` and returns the responding addresses.
    pub async fn discover(timeout: Duration) -> Result<Vec<IpAddr>> {
        discovery::discover(timeout).await
    }
}

impl<T: Transport> Gateway<T> {
    /// Creates a new client with the given transport and the standard decoder.
    #[must_use]
    pub fn new(transport: T) -> Self {
        let transport = Arc::new(transport);
        Self {
            registry: SensorRegistry::new(Arc::clone(&transport)),
            transport,
            decoder: Box::new(StandardDecoder),
        }
    }

    /// Replaces the payload decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: impl PayloadDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Returns the sensor registry.
    #[must_use]
    pub const fn registry(&self) -> &SensorRegistry<T> {
        &self.registry
    }

    /// Runs a raw command and returns the validated response frame.
    pub async fn run_command(&self, command: CommandCode, payload: Bytes) -> Result<Bytes> {
        self.transport.run_command(command, payload).await
    }

    // ==================== Sensor Methods ====================

    /// Reads the sensor table, optionally filtered.
    ///
    /// An unfiltered read refreshes the cached table used by [`get_live_data`](Self::get_live_data).
    pub async fn get_sensors(&self, filter: Option<&SensorFilter>) -> Result<Vec<SensorRecord>> {
        self.registry.get_sensors(filter).await
    }

    /// Returns the cached sensor table, if any.
    pub async fn cached_sensors(&self) -> Option<Arc<[SensorRecord]>> {
        self.registry.cached().await
    }

    /// Drops the cached sensor table.
    pub async fn clear_sensor_cache(&self) {
        self.registry.clear_cache().await;
    }

    // ==================== Readings ====================

    /// Gets current readings.
    ///
    /// With `filter_active_sensors`, low-battery flags for sensors that are
    /// not active in the sensor table are removed. If the table cannot be
    /// read the readings are returned unfiltered.
    pub async fn get_live_data(&self, filter_active_sensors: bool) -> Result<LiveDataSnapshot> {
        let response = self
            .run_command(CommandCode::LiveData, Bytes::new())
            .await?;
        let snapshot = self.decoder.decode_live_data(&response)?;
        tracing::debug!("live data: {} fields", snapshot.len());

        if !filter_active_sensors {
            return Ok(snapshot);
        }

        match self.registry.sensors().await {
            Ok(sensors) => Ok(snapshot.retain_active_sensors(&sensors)),
            Err(e) => {
                tracing::warn!("sensor table unavailable, returning unfiltered live data: {}", e);
                Ok(snapshot)
            }
        }
    }

    /// Gets rain counters.
    pub async fn get_rain_data(&self) -> Result<LiveDataSnapshot> {
        let response = self
            .run_command(CommandCode::ReadRainData, Bytes::new())
            .await?;
        self.decoder.decode_rain_data(&response)
    }

    // ==================== Settings ====================

    /// Gets the firmware version string.
    pub async fn get_firmware_version(&self) -> Result<String> {
        let response = self
            .run_command(CommandCode::ReadFirmware, Bytes::new())
            .await?;
        self.decoder.decode_firmware_version(&response)
    }

    /// Gets the customized server settings, including its request paths.
    ///
    /// Issues two commands, one after the other.
    pub async fn get_custom_server_info(&self) -> Result<CustomServerInfo> {
        let response = self
            .run_command(CommandCode::ReadCustomized, Bytes::new())
            .await?;
        let mut info = self.decoder.decode_custom_server_info(&response)?;

        let response = self
            .run_command(CommandCode::ReadUserPath, Bytes::new())
            .await?;
        info.paths = Some(self.decoder.decode_user_path_info(&response)?);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::{Error, FrameError};
    use crate::protocol::build_frame;
    use crate::protocol::parser::tests::{sensor_table, wide_frame};
    use crate::transport::mock::MockTransport;
    use crate::types::{LOW_BATTERY_KEY, LiveValue, UserPathInfo};

    /// Live data with a WH57 level, a WH65 flag and WH31 channel flags.
    fn live_frame() -> Vec<u8> {
        let mut items = vec![0x01, 0x00, 0xD7, 0x4C];
        items.extend_from_slice(&[0b1000_0000, 0b0000_0011, 0, 0, 2]);
        items.extend_from_slice(&[0u8; 11]);
        wide_frame(CommandCode::LiveData, &items)
    }

    fn table_with_wh57() -> Vec<u8> {
        sensor_table(&[
            (0, [0x00, 0x00, 0x00, 0xC8], 4, 0),
            (6, [0x00, 0x00, 0x00, 0x2F], 4, 0),
            (26, [0x00, 0x00, 0xA0, 0x01], 3, 5),
        ])
    }

    fn gateway(transport: MockTransport) -> Gateway<MockTransport> {
        Gateway::new(transport)
    }

    #[tokio::test]
    async fn test_live_data_unfiltered() {
        let gw = gateway(MockTransport::new().reply(CommandCode::LiveData, live_frame()));
        let data = gw.get_live_data(false).await.unwrap();

        assert_eq!(data.number("intemp"), Some(21.5));
        assert_eq!(data.low_battery().unwrap().len(), 11);
        assert_eq!(gw.transport.calls(), [CommandCode::LiveData]);
    }

    #[tokio::test]
    async fn test_live_data_filtered_keeps_active_sensors() {
        let gw = gateway(
            MockTransport::new()
                .reply(CommandCode::LiveData, live_frame())
                .reply(CommandCode::ReadSensorId, table_with_wh57()),
        );
        let data = gw.get_live_data(true).await.unwrap();
        let low = data.low_battery().unwrap();

        let mut keys: Vec<_> = low.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["wh31", "wh57", "wh65"]);
        assert_eq!(low["wh57"], LiveValue::Number(2.0));

        let wh31 = low["wh31"].as_group().unwrap();
        assert_eq!(wh31.keys().collect::<Vec<_>>(), ["ch1"]);
        assert_eq!(data.number("intemp"), Some(21.5));
    }

    #[tokio::test]
    async fn test_live_data_drops_wh57_without_active_sensor() {
        let gw = gateway(
            MockTransport::new()
                .reply(CommandCode::LiveData, live_frame())
                .reply(
                    CommandCode::ReadSensorId,
                    sensor_table(&[(0, [0x00, 0x00, 0x00, 0xC8], 4, 0)]),
                ),
        );
        let data = gw.get_live_data(true).await.unwrap();
        let low = data.low_battery().unwrap();
        assert!(!low.contains_key("wh57"));
        assert!(!low.contains_key("wh31"));
        assert!(low.contains_key("wh65"));
    }

    #[tokio::test]
    async fn test_live_data_reuses_cached_sensors() {
        let gw = gateway(
            MockTransport::new()
                .reply(CommandCode::LiveData, live_frame())
                .reply(CommandCode::ReadSensorId, table_with_wh57()),
        );
        gw.get_sensors(None).await.unwrap();
        gw.get_live_data(true).await.unwrap();
        gw.get_live_data(true).await.unwrap();

        assert_eq!(gw.transport.count(CommandCode::ReadSensorId), 1);
        assert_eq!(gw.transport.count(CommandCode::LiveData), 2);
    }

    #[tokio::test]
    async fn test_live_data_falls_back_when_registry_fails() {
        let gw = gateway(
            MockTransport::new()
                .reply(CommandCode::LiveData, live_frame())
                .reply(
                    CommandCode::ReadSensorId,
                    build_frame(CommandCode::ReadSensorId, &[0u8; 10]).unwrap().to_vec(),
                ),
        );
        let data = gw.get_live_data(true).await.unwrap();
        assert_eq!(data.low_battery().unwrap().len(), 11);
        assert!(gw.cached_sensors().await.is_none());
    }

    #[tokio::test]
    async fn test_live_data_error_propagates() {
        let gw = gateway(MockTransport::new());
        assert!(matches!(
            gw.get_live_data(true).await,
            Err(Error::Frame(FrameError::NoResponse))
        ));
        assert_eq!(gw.transport.calls(), [CommandCode::LiveData]);
    }

    #[tokio::test]
    async fn test_rain_data() {
        let frame = wide_frame(
            CommandCode::ReadRainData,
            &[0x0E, 0x00, 0x0C, 0x10, 0x00, 0x7B],
        );
        let gw = gateway(MockTransport::new().reply(CommandCode::ReadRainData, frame));
        let rain = gw.get_rain_data().await.unwrap();
        assert_eq!(rain.number("rainrate"), Some(1.2));
        assert_eq!(rain.number("rainday"), Some(12.3));
    }

    #[tokio::test]
    async fn test_firmware_version() {
        let frame = build_frame(CommandCode::ReadFirmware, b"\x0dGW1000_V1.7.0").unwrap().to_vec();
        let gw = gateway(MockTransport::new().reply(CommandCode::ReadFirmware, frame));
        assert_eq!(gw.get_firmware_version().await.unwrap(), "GW1000_V1.7.0");
    }

    #[tokio::test]
    async fn test_custom_server_info_merges_paths() {
        let server = build_frame(
            CommandCode::ReadCustomized,
            &[2, b'i', b'd', 1, b'k', 1, b'h', 0x00, 0x50, 0x00, 0x3C, 0, 1],
        )
        .unwrap()
        .to_vec();
        let paths = build_frame(CommandCode::ReadUserPath, &[2, b'/', b'e', 2, b'/', b'w'])
            .unwrap()
            .to_vec();
        let gw = gateway(
            MockTransport::new()
                .reply(CommandCode::ReadCustomized, server)
                .reply(CommandCode::ReadUserPath, paths),
        );

        let info = gw.get_custom_server_info().await.unwrap();
        assert_eq!(info.id, "id");
        assert_eq!(info.port, 80);
        assert_eq!(info.interval, 60);
        assert!(info.enabled);
        assert_eq!(
            info.paths,
            Some(UserPathInfo {
                ecowitt_path: "/e".into(),
                wunderground_path: "/w".into(),
            })
        );
        assert_eq!(
            gw.transport.calls(),
            [CommandCode::ReadCustomized, CommandCode::ReadUserPath]
        );
    }

    struct FixedDecoder;

    impl PayloadDecoder for FixedDecoder {
        fn decode_live_data(&self, _response: &[u8]) -> Result<LiveDataSnapshot> {
            let mut low = BTreeMap::new();
            low.insert("wh57".to_owned(), LiveValue::Number(1.0));
            let mut snapshot = LiveDataSnapshot::new();
            snapshot.insert(LOW_BATTERY_KEY, low);
            snapshot.insert("model", "custom".to_owned());
            Ok(snapshot)
        }

        fn decode_rain_data(&self, _response: &[u8]) -> Result<LiveDataSnapshot> {
            Ok(LiveDataSnapshot::new())
        }

        fn decode_firmware_version(&self, _response: &[u8]) -> Result<String> {
            Err(Error::Decode {
                message: "unsupported".into(),
            })
        }

        fn decode_custom_server_info(&self, _response: &[u8]) -> Result<CustomServerInfo> {
            Ok(CustomServerInfo::default())
        }

        fn decode_user_path_info(&self, _response: &[u8]) -> Result<UserPathInfo> {
            Ok(UserPathInfo::default())
        }
    }

    #[tokio::test]
    async fn test_custom_decoder() {
        let gw = gateway(
            MockTransport::new()
                .reply(CommandCode::LiveData, live_frame())
                .reply(CommandCode::ReadSensorId, table_with_wh57())
                .reply(
                    CommandCode::ReadFirmware,
                    build_frame(CommandCode::ReadFirmware, &[]).unwrap().to_vec(),
                ),
        )
        .with_decoder(FixedDecoder);

        let data = gw.get_live_data(true).await.unwrap();
        assert_eq!(data.get("model").and_then(LiveValue::as_text), Some("custom"));
        assert!(data.low_battery().unwrap().contains_key("wh57"));
        assert!(matches!(
            gw.get_firmware_version().await,
            Err(Error::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_tcp_run_command_rejects_oversize_payload() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let gw = Gateway::with_tcp_config(TcpConfig::new("127.0.0.1").port(port));

        let result = gw
            .run_command(CommandCode::WriteCustomized, Bytes::from(vec![0u8; 300]))
            .await;
        assert!(matches!(
            result,
            Err(Error::Frame(FrameError::TooLarge { size: 300, max: 252 }))
        ));
        drop(listener);
    }
}
