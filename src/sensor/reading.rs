use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::sensor::finite_number;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row of `data_sensor`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Reading {
    pub id: u64,

    pub suhu: f64,

    pub humidity: f64,

    pub lux: f64,

    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
}

/// A reading that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub suhu: f64,

    pub humidity: f64,

    pub lux: f64,

    pub timestamp: NaiveDateTime,
}

/// The three measured values, all finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorValues {
    pub suhu: f64,
    pub humidity: f64,
    pub lux: f64,
}

impl SensorValues {
    /// Coerces the raw JSON fields, returning `None` unless all three are finite numbers.
    pub fn from_fields(
        suhu: Option<&Value>,
        humidity: Option<&Value>,
        lux: Option<&Value>,
    ) -> Option<Self> {
        Some(Self {
            suhu: finite_number(suhu)?,
            humidity: finite_number(humidity)?,
            lux: finite_number(lux)?,
        })
    }

    pub fn at(self, timestamp: NaiveDateTime) -> NewReading {
        NewReading {
            suhu: self.suhu,
            humidity: self.humidity,
            lux: self.lux,
            timestamp,
        }
    }
}

pub(crate) fn serialize_timestamp<S: Serializer>(
    timestamp: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_timestamp_without_fraction_or_offset() {
        let reading = Reading {
            id: 7,
            suhu: 22.5,
            humidity: 60.0,
            lux: 300.0,
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(8, 5, 1)
                .unwrap(),
        };

        assert_eq!(
            serde_json::to_value(&reading).unwrap(),
            json!({
                "id": 7,
                "suhu": 22.5,
                "humidity": 60.0,
                "lux": 300.0,
                "timestamp": "2024-03-09 08:05:01",
            })
        );
    }

    #[test]
    fn rejects_values_unless_all_three_are_finite() {
        let ok = json!({"suhu": "22.5", "humidity": 60, "lux": 300});
        assert_eq!(
            SensorValues::from_fields(ok.get("suhu"), ok.get("humidity"), ok.get("lux")),
            Some(SensorValues {
                suhu: 22.5,
                humidity: 60.0,
                lux: 300.0
            })
        );

        let bad = json!({"suhu": "bad", "humidity": 60, "lux": 300});
        assert_eq!(
            SensorValues::from_fields(bad.get("suhu"), bad.get("humidity"), bad.get("lux")),
            None
        );

        let missing = json!({"suhu": 1, "humidity": 2});
        assert_eq!(
            SensorValues::from_fields(
                missing.get("suhu"),
                missing.get("humidity"),
                missing.get("lux")
            ),
            None
        );
    }
}
