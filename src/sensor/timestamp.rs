use anyhow::{Context as _, Result, anyhow, bail};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde_json::Value;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Current wall-clock time in `timezone`, truncated to whole seconds.
pub fn now_in(timezone: Tz) -> NaiveDateTime {
    to_local_seconds(Utc::now(), timezone)
}

pub fn truncate_to_seconds(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp.with_nanosecond(0).unwrap_or(timestamp)
}

/// Parses a client-supplied timestamp.
///
/// Falsy values (`null`, `""`, `0`, `false`) mean no timestamp was given.
/// Numbers are milliseconds since the Unix epoch. Strings with an offset are
/// converted into `timezone`; naive strings are taken to already be in it.
pub fn parse_timestamp(value: &Value, timezone: Tz) -> Result<Option<NaiveDateTime>> {
    match value {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::Number(n) => {
            let millis = n
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| anyhow!("timestamp is not a finite number: {n}"))?;
            if millis == 0.0 {
                return Ok(None);
            }

            let utc = DateTime::from_timestamp_millis(millis.trunc() as i64)
                .ok_or_else(|| anyhow!("timestamp out of range: {n}"))?;
            Ok(Some(to_local_seconds(utc, timezone)))
        }
        Value::String(s) => parse_timestamp_str(s.trim(), timezone)
            .with_context(|| format!("failed to parse timestamp: {s}"))
            .map(Some),
        other => bail!("unsupported timestamp value: {other}"),
    }
}

fn parse_timestamp_str(s: &str, timezone: Tz) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(to_local_seconds(dt, timezone));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(truncate_to_seconds(naive));
        }
    }

    let date =
        NaiveDate::parse_from_str(s, "%Y-%m-%d").context("unrecognized date-time format")?;

    Ok(date.and_time(NaiveTime::MIN))
}

fn to_local_seconds<T: chrono::TimeZone>(dt: DateTime<T>, timezone: Tz) -> NaiveDateTime {
    truncate_to_seconds(dt.with_timezone(&timezone).naive_local())
}

/// `<month>-<year>` without zero padding, e.g. `3-2024`.
pub fn month_year(timestamp: &NaiveDateTime) -> String {
    format!("{}-{}", timestamp.month(), timestamp.year())
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use serde_json::json;

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn falsy_values_mean_absent() {
        for v in [json!(null), json!(""), json!(0), json!(false)] {
            assert_eq!(parse_timestamp(&v, Tz::UTC).unwrap(), None, "{v}");
        }
    }

    #[test]
    fn converts_offset_timestamps_into_timezone() {
        let v = json!("2024-03-09T23:30:15.987Z");
        assert_eq!(
            parse_timestamp(&v, Tz::UTC).unwrap(),
            Some(at(2024, 3, 9, 23, 30, 15))
        );
        assert_eq!(
            parse_timestamp(&v, Tz::Asia__Jakarta).unwrap(),
            Some(at(2024, 3, 10, 6, 30, 15))
        );
    }

    #[test]
    fn keeps_naive_timestamps_as_given() {
        assert_eq!(
            parse_timestamp(&json!("2024-03-09 08:05:01.5"), Tz::Asia__Jakarta).unwrap(),
            Some(at(2024, 3, 9, 8, 5, 1))
        );
        assert_eq!(
            parse_timestamp(&json!("2024-03-09T08:05"), Tz::UTC).unwrap(),
            Some(at(2024, 3, 9, 8, 5, 0))
        );
        assert_eq!(
            parse_timestamp(&json!("2024-03-09"), Tz::UTC).unwrap(),
            Some(at(2024, 3, 9, 0, 0, 0))
        );
    }

    #[test]
    fn numbers_are_epoch_milliseconds() {
        assert_eq!(
            parse_timestamp(&json!(1_710_000_000_123i64), Tz::UTC).unwrap(),
            Some(at(2024, 3, 9, 16, 0, 0))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp(&json!("yesterday"), Tz::UTC).is_err());
        assert!(parse_timestamp(&json!("2024-13-01"), Tz::UTC).is_err());
        assert!(parse_timestamp(&json!([2024]), Tz::UTC).is_err());
        assert!(parse_timestamp(&json!(true), Tz::UTC).is_err());
    }

    #[test]
    fn now_has_no_fraction() {
        let now = now_in(Tz::UTC);
        assert_eq!(now.nanosecond(), 0);
        assert!(Utc::now().naive_utc() - now < TimeDelta::seconds(5));
    }

    #[test]
    fn formats_month_year_without_padding() {
        assert_eq!(month_year(&at(2024, 3, 1, 0, 0, 0)), "3-2024");
        assert_eq!(month_year(&at(2023, 12, 31, 23, 59, 59)), "12-2023");
    }
}
