//! Custom wire encodings shared by the typed bridge.
//!
//! The wire representation is dynamically typed JSON, so a few field classes
//! need explicit codecs to keep exact fidelity in both directions:
//!
//! - 64-bit integers travel as decimal strings (JSON numbers lose precision
//!   past 2^53); decoding rejects non-numeric strings
//! - byte blobs travel as standard base64
//! - calendar dates tolerate partial precision (year, year-month, or full
//!   date) but always require at least a year
//!
//! Because the typed bridge round-trips through `serde_json::Value`, these
//! codecs are exercised identically for network traffic and for the
//! converter-facing untyped form.

use base64::Engine as _;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// `Option<i64>` carried as a decimal string.
pub mod i64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        let raw = Option::<StringOrNumber>::deserialize(deserializer)?;
        raw.map(|r| r.into_i64().map_err(de::Error::custom)).transpose()
    }
}

/// `Vec<i64>` carried as a sequence of decimal strings.
pub mod i64_string_seq {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Vec<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(value.iter().map(|v| v.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
        let raw = Vec::<StringOrNumber>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|r| r.into_i64().map_err(de::Error::custom))
            .collect()
    }
}

/// Accepts either a decimal string or a bare JSON integer; rejects anything
/// non-numeric with a message carrying the raw value.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Num(i64),
    Str(String),
}

impl StringOrNumber {
    fn into_i64(self) -> Result<i64, String> {
        match self {
            StringOrNumber::Num(n) => Ok(n),
            StringOrNumber::Str(s) => s
                .parse::<i64>()
                .map_err(|_| format!("expected decimal integer string, got {s:?}")),
        }
    }
}

/// `Option<Vec<u8>>` carried as standard base64.
pub mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| {
            base64::engine::general_purpose::STANDARD
                .decode(&s)
                .map_err(|e| de::Error::custom(format!("invalid base64 {s:?}: {e}")))
        })
        .transpose()
    }
}

/// `Vec<Vec<u8>>` carried as a sequence of standard base64 strings.
pub mod base64_bytes_seq {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Vec<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            value
                .iter()
                .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|s| {
                base64::engine::general_purpose::STANDARD
                    .decode(&s)
                    .map_err(|e| de::Error::custom(format!("invalid base64 {s:?}: {e}")))
            })
            .collect()
    }
}

/// Calendar date with partial precision: year-only and year-month values are
/// valid; a date without a year is not. Month and day are zero when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl PartialDate {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }
}

impl std::fmt::Display for PartialDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.day != 0 {
            write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
        } else if self.month != 0 {
            write!(f, "{:04}-{:02}", self.year, self.month)
        } else {
            write!(f, "{:04}", self.year)
        }
    }
}

impl Serialize for PartialDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PartialDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Responses carry a structured {year, month, day} object; our own
        // serialized form is the partial ISO string. Accept both.
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::Object(map) => {
                let field = |name: &str| -> Result<Option<u16>, D::Error> {
                    match map.get(name) {
                        None | Some(serde_json::Value::Null) => Ok(None),
                        Some(v) => v
                            .as_u64()
                            .and_then(|n| u16::try_from(n).ok())
                            .map(Some)
                            .ok_or_else(|| {
                                de::Error::custom(format!("invalid date field {name:?}: {v}"))
                            }),
                    }
                };
                let year = field("year")?.ok_or_else(|| {
                    de::Error::custom("date is missing required field \"year\"")
                })?;
                let month = field("month")?.unwrap_or(0) as u8;
                let day = field("day")?.unwrap_or(0) as u8;
                Ok(PartialDate { year, month, day })
            }
            serde_json::Value::String(s) => {
                let mut parts = s.splitn(3, '-');
                let year = parts
                    .next()
                    .and_then(|p| p.parse::<u16>().ok())
                    .ok_or_else(|| de::Error::custom(format!("invalid date string {s:?}")))?;
                let month = parts.next().map(|p| p.parse::<u8>()).transpose().map_err(
                    |_| de::Error::custom(format!("invalid month in date string {s:?}")),
                )?;
                let day = parts.next().map(|p| p.parse::<u8>()).transpose().map_err(
                    |_| de::Error::custom(format!("invalid day in date string {s:?}")),
                )?;
                Ok(PartialDate {
                    year,
                    month: month.unwrap_or(0),
                    day: day.unwrap_or(0),
                })
            }
            other => Err(de::Error::custom(format!(
                "expected a date object or string, got: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize, Default)]
    struct IntHolder {
        #[serde(with = "i64_string", default, skip_serializing_if = "Option::is_none")]
        n: Option<i64>,
    }

    #[test]
    fn i64_round_trips_as_string() {
        let v = serde_json::to_value(IntHolder { n: Some(10) }).unwrap();
        assert_eq!(v, json!({"n": "10"}));
        let back: IntHolder = serde_json::from_value(v).unwrap();
        assert_eq!(back.n, Some(10));
    }

    #[test]
    fn i64_rejects_non_numeric_string() {
        let err = serde_json::from_value::<IntHolder>(json!({"n": "abc"})).unwrap_err();
        assert!(err.to_string().contains("abc"), "error should carry raw value: {err}");
    }

    #[test]
    fn i64_absent_stays_absent() {
        let v = serde_json::to_value(IntHolder { n: None }).unwrap();
        assert_eq!(v, json!({}));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct BytesHolder {
        #[serde(with = "base64_bytes_seq", default, skip_serializing_if = "Vec::is_empty")]
        tokens: Vec<Vec<u8>>,
    }

    #[test]
    fn bytes_round_trip_through_base64() {
        let holder = BytesHolder {
            tokens: vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
        };
        let v = serde_json::to_value(&holder).unwrap();
        assert_eq!(v, json!({"tokens": ["YQ==", "Yg==", "Yw=="]}));
        assert_eq!(serde_json::from_value::<BytesHolder>(v).unwrap(), holder);
    }

    #[test]
    fn partial_date_precision_levels() {
        assert_eq!(PartialDate::new(2023, 10, 26).to_string(), "2023-10-26");
        assert_eq!(PartialDate::new(2023, 10, 0).to_string(), "2023-10");
        assert_eq!(PartialDate::new(2023, 0, 0).to_string(), "2023");
    }

    #[test]
    fn partial_date_decodes_from_object() {
        let d: PartialDate =
            serde_json::from_value(json!({"year": 2023, "month": 10, "day": 26})).unwrap();
        assert_eq!(d, PartialDate::new(2023, 10, 26));
        let d: PartialDate = serde_json::from_value(json!({"year": 2023})).unwrap();
        assert_eq!(d, PartialDate::new(2023, 0, 0));
    }

    #[test]
    fn partial_date_requires_year() {
        let err =
            serde_json::from_value::<PartialDate>(json!({"month": 10, "day": 26})).unwrap_err();
        assert!(err.to_string().contains("year"), "got: {err}");
    }

    #[test]
    fn partial_date_decodes_its_own_string_form() {
        for d in [
            PartialDate::new(2023, 10, 26),
            PartialDate::new(2023, 10, 0),
            PartialDate::new(2023, 0, 0),
        ] {
            let v = serde_json::to_value(d).unwrap();
            assert_eq!(serde_json::from_value::<PartialDate>(v).unwrap(), d);
        }
    }
}
