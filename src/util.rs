//! Shared utility functions for the handover crate.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as an ISO-8601 string with millisecond precision
/// (`2025-03-06T14:02:11.512Z`), the format record timestamps are stored in.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for `Option<NaiveDate>` stored as `YYYY-MM-DD` strings.
/// Empty or unparseable strings read back as `None`; `None` writes `""`.
pub mod lenient_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(super::parse_date))
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` stored as ISO strings. Accepts
/// a bare `YYYY-MM-DD` as midnight UTC.
pub mod lenient_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(t) => s.serialize_str(&super::iso(*t)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(super::parse_timestamp))
    }
}

/// Parse `YYYY-MM-DD`, or the date part of an ISO timestamp.
pub fn parse_date(raw: &str) -> Option<chrono::NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    parse_date(raw)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Dated {
        #[serde(default, with = "lenient_date")]
        due: Option<NaiveDate>,
        #[serde(default, with = "lenient_timestamp")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_now_iso_shape() {
        let now = now_iso();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2025-03-06T14:02:11.512Z".len());
    }

    #[test]
    fn test_lenient_date_accepts_blank_and_null() {
        let blank: Dated = serde_json::from_value(json!({"due": "", "at": null})).unwrap();
        assert!(blank.due.is_none());
        assert!(blank.at.is_none());
        let missing: Dated = serde_json::from_value(json!({})).unwrap();
        assert!(missing.due.is_none());
    }

    #[test]
    fn test_lenient_date_round_trip() {
        let d: Dated = serde_json::from_value(json!({
            "due": "2025-04-01",
            "at": "2025-04-01T08:30:00.000Z"
        }))
        .unwrap();
        assert_eq!(d.due, NaiveDate::from_ymd_opt(2025, 4, 1));
        let back = serde_json::to_value(&d).unwrap();
        assert_eq!(back["due"], "2025-04-01");
        assert_eq!(back["at"], "2025-04-01T08:30:00.000Z");
    }

    #[test]
    fn test_parse_timestamp_accepts_plain_date() {
        let ts = parse_timestamp("2025-06-30").unwrap();
        assert_eq!(iso(ts), "2025-06-30T00:00:00.000Z");
        assert!(parse_timestamp("soon").is_none());
    }

    #[test]
    fn test_parse_date_from_timestamp() {
        assert_eq!(
            parse_date("2025-06-30T12:00:00.000Z"),
            NaiveDate::from_ymd_opt(2025, 6, 30)
        );
    }
}
