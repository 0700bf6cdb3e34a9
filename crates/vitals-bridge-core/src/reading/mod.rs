//! Sensor Readings
//!
//! Decodes the comma-separated records sent by the wearable's
//! microcontroller into typed readings.
//!
//! Record layout (one per line, no quoting or escaping):
//!
//! ```text
//! temperature,heartRate,spo2,ecgStatus,steps,bpSystolic,bpDiastolic
//! 36.6,72,98,Normal,1500,120,80
//! ```

mod error;
mod parser;

use serde::{Deserialize, Serialize, Serializer};

pub use error::ParseError;
pub use parser::{LineParser, NumericPolicy, MAX_RECORD_LEN};

/// Number of comma-separated fields in a record
pub const FIELD_COUNT: usize = 7;

/// Field names in record order, as they appear in the JSON payload
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "temperature",
    "heartRate",
    "spo2",
    "ecgStatus",
    "steps",
    "bpSystolic",
    "bpDiastolic",
];

/// One decoded sensor snapshot
///
/// Values are taken as sent; no range checks are applied (an `spo2` of 140
/// is passed through unchanged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Body temperature in degrees Celsius (one decimal place)
    #[serde(serialize_with = "serialize_one_decimal")]
    pub temperature: f64,

    /// Heart rate in beats per minute
    pub heart_rate: i32,

    /// Blood oxygen saturation percentage
    pub spo2: i32,

    /// ECG classification token (e.g. "Normal", "Irregular")
    pub ecg_status: String,

    /// Cumulative step count
    pub steps: i32,

    /// Systolic blood pressure in mmHg
    pub bp_systolic: i32,

    /// Diastolic blood pressure in mmHg
    pub bp_diastolic: i32,
}

impl SensorReading {
    /// Parse a record with the default (coercing) numeric policy
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        LineParser::default().parse(line)
    }

    /// Render the JSON payload sent to the collector
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Round to a single fractional digit, matching the firmware's `String(t, 1)`
pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn serialize_one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_one_decimal(*value))
}
