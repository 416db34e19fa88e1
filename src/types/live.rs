//! Live data snapshot types.
//!
//! Readings are kept as an ordered map of field name to [`LiveValue`]. The
//! only field this crate interprets is [`LOW_BATTERY_KEY`], whose entries are
//! either whole-sensor flags (`wh57`) or per-channel groups (`wh31.ch1`).

use std::collections::BTreeMap;

use crate::types::sensor::SensorRecord;

/// Field holding low-battery flags.
pub const LOW_BATTERY_KEY: &str = "lowbatt";

/// A decoded reading.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveValue {
    /// Numeric reading, already scaled to its unit.
    Number(f64),
    /// Text reading.
    Text(String),
    /// Nested readings, e.g. per-channel battery levels.
    Group(BTreeMap<String, LiveValue>),
}

impl LiveValue {
    /// Returns the number, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested map, if this is a group.
    #[must_use]
    pub const fn as_group(&self) -> Option<&BTreeMap<String, LiveValue>> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Short type name, as used in summaries.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Group(_) => "group",
        }
    }
}

impl From<f64> for LiveValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for LiveValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<BTreeMap<String, LiveValue>> for LiveValue {
    fn from(g: BTreeMap<String, LiveValue>) -> Self {
        Self::Group(g)
    }
}

/// Current readings reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveDataSnapshot {
    fields: BTreeMap<String, LiveValue>,
}

impl LiveDataSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<LiveValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Gets a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LiveValue> {
        self.fields.get(key)
    }

    /// Gets a numeric field.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(LiveValue::as_number)
    }

    /// Returns the low-battery section, if the gateway reported one.
    #[must_use]
    pub fn low_battery(&self) -> Option<&BTreeMap<String, LiveValue>> {
        self.get(LOW_BATTERY_KEY).and_then(LiveValue::as_group)
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LiveValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if nothing was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merges another snapshot into this one; `other` wins on key clashes.
    pub fn extend(&mut self, other: Self) {
        self.fields.extend(other.fields);
    }

    /// Returns a copy whose low-battery section only mentions active sensors.
    ///
    /// A scalar entry `wh57` survives if an active `WH57` record exists. A
    /// group entry `wh31` keeps channel `ch2` only if an active `WH31_CH2`
    /// record exists, and is dropped once no channel remains. Other fields
    /// are copied untouched.
    #[must_use]
    pub fn retain_active_sensors(&self, sensors: &[SensorRecord]) -> Self {
        let Some(low_battery) = self.low_battery() else {
            return self.clone();
        };

        let is_active = |sensor_type: &str| {
            sensors
                .iter()
                .any(|s| s.is_active() && s.sensor_type.eq_ignore_ascii_case(sensor_type))
        };

        let mut kept = BTreeMap::new();
        for (key, value) in low_battery {
            match value {
                LiveValue::Group(channels) => {
                    let channels: BTreeMap<_, _> = channels
                        .iter()
                        .filter(|(channel, _)| is_active(format!("{key}_{channel}").as_str()))
                        .map(|(channel, v)| (channel.clone(), v.clone()))
                        .collect();
                    if !channels.is_empty() {
                        kept.insert(key.clone(), LiveValue::Group(channels));
                    }
                }
                flag => {
                    if is_active(key.as_str()) {
                        kept.insert(key.clone(), flag.clone());
                    }
                }
            }
        }

        let mut filtered = self.clone();
        filtered.insert(LOW_BATTERY_KEY, kept);
        filtered
    }
}

impl FromIterator<(String, LiveValue)> for LiveDataSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, LiveValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Settings for the customized upload server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomServerInfo {
    /// Station ID sent to the server.
    pub id: String,
    /// Station key sent to the server.
    pub password: String,
    /// Server host name or address.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Upload interval in seconds.
    pub interval: u16,
    /// Upload protocol.
    pub protocol: UploadProtocol,
    /// Whether uploads are switched on.
    pub enabled: bool,
    /// Request paths, merged in from a separate command.
    pub paths: Option<UserPathInfo>,
}

/// Protocol used for customized uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadProtocol {
    /// Ecowitt form POST.
    #[default]
    Ecowitt,
    /// Wunderground-style GET.
    Wunderground,
}

impl UploadProtocol {
    /// Parses the protocol byte. Anything non-zero means Wunderground.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            Self::Ecowitt
        } else {
            Self::Wunderground
        }
    }
}

/// Request paths for the customized upload server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPathInfo {
    /// Path used with the Ecowitt protocol.
    pub ecowitt_path: String,
    /// Path used with the Wunderground protocol.
    pub wunderground_path: String,
}
