//! Sensor registry types.

use std::fmt;

/// Sensor type names, indexed by the type byte of a sensor table record.
pub const SENSOR_TYPES: [&str; 31] = [
    "WH65", "WH68", "WH80", "WH40", "WH25", "WH26", "WH31_CH1", "WH31_CH2", "WH31_CH3",
    "WH31_CH4", "WH31_CH5", "WH31_CH6", "WH31_CH7", "WH31_CH8", "WH51_CH1", "WH51_CH2",
    "WH51_CH3", "WH51_CH4", "WH51_CH5", "WH51_CH6", "WH51_CH7", "WH51_CH8", "WH41_CH1",
    "WH41_CH2", "WH41_CH3", "WH41_CH4", "WH57", "WH55_CH1", "WH55_CH2", "WH55_CH3", "WH55_CH4",
];

/// Raw ID of a slot the user has switched off.
pub const DISABLED_ID: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFE];

/// Raw ID of a slot still searching for its sensor.
pub const REGISTERING_ID: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Lifecycle state of a sensor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorStatus {
    /// Slot disabled.
    Disabled,
    /// Gateway is still listening for the sensor.
    Registering,
    /// Sensor paired and reporting.
    Active,
}

impl SensorStatus {
    /// Derives the status from the four raw ID bytes.
    #[must_use]
    pub fn from_id(id: [u8; 4]) -> Self {
        match id {
            DISABLED_ID => Self::Disabled,
            REGISTERING_ID => Self::Registering,
            _ => Self::Active,
        }
    }

    /// Lowercase name used for filtering and display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Registering => "registering",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Health readings reported for an active sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorLink {
    /// Sensor ID as uppercase hex without leading zeros.
    pub id: String,
    /// Signal quality (0-4).
    pub signal: u8,
    /// Raw battery byte; meaning depends on the sensor type.
    pub battery: u8,
}

/// One slot of the gateway's sensor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRecord {
    /// Type name, or `Unknown Type (<id>)` for type bytes outside [`SENSOR_TYPES`].
    pub sensor_type: String,
    /// Slot status.
    pub status: SensorStatus,
    /// Present if and only if `status` is [`SensorStatus::Active`].
    pub link: Option<SensorLink>,
}

impl SensorRecord {
    /// Builds a record, attaching the link only for active slots.
    #[must_use]
    pub fn new(sensor_type: String, raw_id: [u8; 4], signal: u8, battery: u8) -> Self {
        let status = SensorStatus::from_id(raw_id);
        let link = (status == SensorStatus::Active).then(|| SensorLink {
            id: format!("{:X}", u32::from_be_bytes(raw_id)),
            signal,
            battery,
        });
        Self {
            sensor_type,
            status,
            link,
        }
    }

    /// Returns true if the slot is paired and reporting.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SensorStatus::Active
    }

    /// Sensor ID, if active.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.link.as_ref().map(|l| l.id.as_str())
    }

    /// Signal quality, if active.
    #[must_use]
    pub fn signal(&self) -> Option<u8> {
        self.link.as_ref().map(|l| l.signal)
    }

    /// Battery byte, if active.
    #[must_use]
    pub fn battery(&self) -> Option<u8> {
        self.link.as_ref().map(|l| l.battery)
    }
}

/// How a single field of a [`SensorFilter`] matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Match {
    /// Everything passes.
    #[default]
    Any,
    /// Value contains this text, ignoring ASCII case.
    Contains(String),
    /// Value equals one of these, ignoring ASCII case.
    OneOf(Vec<String>),
}

impl Match {
    /// Tests a value against this matcher.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Contains(needle) => value
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
            Self::OneOf(options) => options.iter().any(|o| o.eq_ignore_ascii_case(value)),
        }
    }
}

impl From<&str> for Match {
    fn from(needle: &str) -> Self {
        Self::Contains(needle.to_owned())
    }
}

impl From<String> for Match {
    fn from(needle: String) -> Self {
        Self::Contains(needle)
    }
}

impl<S: Into<String>> From<Vec<S>> for Match {
    fn from(options: Vec<S>) -> Self {
        Self::OneOf(options.into_iter().map(Into::into).collect())
    }
}

/// Filter for sensor table queries.
///
/// # Example
///
/// ```
/// use ecowitt_gateway::types::SensorFilter;
///
/// let filter = SensorFilter::new().status("active").sensor_type(vec!["WH31_CH1", "WH57"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorFilter {
    /// Matcher applied to the status name.
    pub status: Match,
    /// Matcher applied to the sensor type name.
    pub sensor_type: Match,
}

impl SensorFilter {
    /// Creates a filter that passes every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status matcher.
    #[must_use]
    pub fn status(mut self, status: impl Into<Match>) -> Self {
        self.status = status.into();
        self
    }

    /// Sets the sensor type matcher.
    #[must_use]
    pub fn sensor_type(mut self, sensor_type: impl Into<Match>) -> Self {
        self.sensor_type = sensor_type.into();
        self
    }

    /// Tests a record against both matchers.
    #[must_use]
    pub fn matches(&self, record: &SensorRecord) -> bool {
        self.status.matches(record.status.as_str()) && self.sensor_type.matches(&record.sensor_type)
    }
}
