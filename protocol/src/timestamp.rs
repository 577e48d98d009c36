//! Backend timestamps.
//!
//! The backend stores UTC but frequently serializes naive datetimes (no `Z`,
//! no offset). Those are read as UTC rather than local time. Numeric values
//! are Unix seconds.

use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a backend timestamp string, assuming UTC when it carries no offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(raw, format)
            .ok()
            .map(|naive| naive.and_utc())
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Seconds(f64),
}

pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<RawTimestamp>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let parsed = match raw {
        RawTimestamp::Text(text) => parse_timestamp(&text),
        RawTimestamp::Seconds(seconds) => {
            let millis = (seconds * 1000.0).round() as i64;
            DateTime::from_timestamp_millis(millis)
        }
    };

    match parsed {
        Some(value) => Ok(Some(value)),
        None => Err(serde::de::Error::custom("unrecognized timestamp")),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_option(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("timestamp must not be null"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn naive_timestamps_are_utc() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 17, 8, 30, 0).single();
        assert_eq!(parse_timestamp("2023-05-17T08:30:00"), expected);
        assert_eq!(parse_timestamp("2023-05-17 08:30:00.000"), expected);
    }

    #[test]
    fn offsets_are_respected() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 17, 0, 30, 0).single();
        assert_eq!(parse_timestamp("2023-05-17T08:30:00+08:00"), expected);
        assert_eq!(parse_timestamp("2023-05-17T00:30:00Z"), expected);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
