use chrono::NaiveDateTime;
use serde::Serialize;

use crate::sensor::{Reading, month_year, reading::serialize_timestamp};

/// Temperature aggregates over the whole table; all `None` when it is empty.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TemperatureStats {
    pub max: Option<f64>,

    pub min: Option<f64>,

    /// Rounded to two decimals.
    pub average: Option<f64>,
}

/// A row holding both the table-wide maximum temperature and the table-wide
/// maximum humidity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakReading {
    #[serde(rename = "idx")]
    pub id: u64,

    #[serde(rename = "suhun")]
    pub suhu: f64,

    #[serde(rename = "humid")]
    pub humidity: f64,

    #[serde(rename = "kecerahan")]
    pub lux: f64,

    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
}

impl From<Reading> for PeakReading {
    fn from(r: Reading) -> Self {
        Self {
            id: r.id,
            suhu: r.suhu,
            humidity: r.humidity,
            lux: r.lux,
            timestamp: r.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthYear {
    pub month_year: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub suhumax: Option<f64>,

    pub suhmin: Option<f64>,

    pub suhurata: Option<f64>,

    pub nilai_suhu_max_humid_max: Vec<PeakReading>,

    pub month_year_max: Vec<MonthYear>,
}

impl Summary {
    pub fn new(stats: TemperatureStats, peaks: Vec<Reading>) -> Self {
        let month_year_max = peaks
            .iter()
            .map(|r| MonthYear {
                month_year: month_year(&r.timestamp),
            })
            .collect();

        Self {
            suhumax: stats.max,
            suhmin: stats.min,
            suhurata: stats.average,
            nilai_suhu_max_humid_max: peaks.into_iter().map(PeakReading::from).collect(),
            month_year_max,
        }
    }

    /// Computes the summary in memory.
    ///
    /// The peak filter compares each row against two independently computed
    /// maxima, so it is empty when no single row holds both.
    pub fn from_readings(readings: &[Reading]) -> Self {
        let max_suhu = max_of(readings.iter().map(|r| r.suhu));
        let max_humidity = max_of(readings.iter().map(|r| r.humidity));

        let stats = TemperatureStats {
            max: max_suhu,
            min: readings.iter().map(|r| r.suhu).reduce(f64::min),
            average: (!readings.is_empty()).then(|| {
                round_to_hundredths(
                    readings.iter().map(|r| r.suhu).sum::<f64>() / readings.len() as f64,
                )
            }),
        };

        let peaks = match (max_suhu, max_humidity) {
            (Some(max_suhu), Some(max_humidity)) => readings
                .iter()
                .filter(|r| r.suhu == max_suhu && r.humidity == max_humidity)
                .cloned()
                .collect(),
            _ => Vec::new(),
        };

        Self::new(stats, peaks)
    }
}

fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.reduce(f64::max)
}

pub fn round_to_hundredths(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
