use crate::error::{BatsdError, Result};
use crate::timeutils::{now_utc, utc_from_timestamp};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::error::ComponentRange;
use time::{Duration, OffsetDateTime};

/// One `(timestamp, value)` pair as returned by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: i64,
    #[serde(deserialize_with = "de_value")]
    pub value: f64,
}

impl Sample {
    pub fn datetime(&self) -> std::result::Result<OffsetDateTime, ComponentRange> {
        utc_from_timestamp(self.timestamp)
    }
}

impl From<Sample> for (i64, f64) {
    fn from(s: Sample) -> Self {
        (s.timestamp, s.value)
    }
}

/// Query bounds in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn between(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn ending_now(duration: Duration) -> Self {
        let until = now_utc();
        let since = until.checked_sub(duration).unwrap_or(until);
        Self {
            start: since.unix_timestamp(),
            end: until.unix_timestamp(),
        }
    }
}

/// Decoded reply to a `values` command, before the series is picked out.
#[derive(Debug, Clone)]
pub struct Values {
    pub interval: u64,
    entries: Map<String, Value>,
}

impl Values {
    pub(crate) fn from_json(reply: Value, key: &str) -> Result<Self> {
        let mut entries = match reply {
            Value::Object(map) => map,
            other => {
                return Err(BatsdError::Protocol(format!(
                    "expected a JSON object for values, got {other}"
                )))
            }
        };
        let interval = entries
            .remove("interval")
            .ok_or_else(|| BatsdError::ServerKeyMissing {
                key: "interval".into(),
            })?;
        let interval = decode_interval(interval)?;
        if !entries.contains_key(key) {
            return Err(BatsdError::ServerKeyMissing { key: key.into() });
        }
        Ok(Self { interval, entries })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes and decodes the series stored under `key`, keeping server order.
    pub fn take_series(&mut self, key: &str) -> Result<Vec<Sample>> {
        let raw = self
            .entries
            .remove(key)
            .ok_or_else(|| BatsdError::ServerKeyMissing { key: key.into() })?;
        serde_json::from_value(raw.clone()).map_err(|source| BatsdError::Decode {
            body: raw.to_string(),
            source,
        })
    }
}

fn decode_interval(raw: Value) -> Result<u64> {
    #[derive(Deserialize)]
    struct Interval(#[serde(deserialize_with = "de_interval")] u64);

    serde_json::from_value::<Interval>(raw.clone())
        .map(|i| i.0)
        .map_err(|source| BatsdError::Decode {
            body: raw.to_string(),
            source,
        })
}

// The daemon writes numbers either bare or quoted depending on where the
// series was read from (memory vs. disk).
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Numeric {
    fn as_i64<E: de::Error>(&self) -> std::result::Result<i64, E> {
        match self {
            Numeric::Int(i) => Ok(*i),
            Numeric::Float(f) => Ok(*f as i64),
            Numeric::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                    .map_err(|_| E::custom(format!("not an integer: {s:?}")))
            }
        }
    }

    fn as_f64<E: de::Error>(&self) -> std::result::Result<f64, E> {
        match self {
            Numeric::Int(i) => Ok(*i as f64),
            Numeric::Float(f) => Ok(*f),
            Numeric::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("not a number: {s:?}"))),
        }
    }
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    Numeric::deserialize(d)?.as_i64()
}

fn de_value<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Numeric::deserialize(d)?.as_f64()
}

fn de_interval<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    let i = Numeric::deserialize(d)?.as_i64::<D::Error>()?;
    u64::try_from(i).map_err(|_| de::Error::custom(format!("negative interval: {i}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn samples_accept_numbers_and_strings() {
        let raw = json!([
            {"timestamp": 100, "value": 3},
            {"timestamp": "110", "value": "5.5"},
            {"timestamp": 120.0, "value": 0.25},
        ]);
        let samples: Vec<Sample> = serde_json::from_value(raw).unwrap();
        assert_eq!(
            samples,
            vec![
                Sample { timestamp: 100, value: 3.0 },
                Sample { timestamp: 110, value: 5.5 },
                Sample { timestamp: 120, value: 0.25 },
            ]
        );
    }

    #[test]
    fn garbage_value_is_rejected() {
        let raw = json!([{"timestamp": 100, "value": "n/a"}]);
        assert!(serde_json::from_value::<Vec<Sample>>(raw).is_err());
    }

    #[test]
    fn values_require_interval_and_key() {
        let err = Values::from_json(json!({"counters:x": []}), "counters:x").unwrap_err();
        assert!(matches!(err, BatsdError::ServerKeyMissing { ref key } if key == "interval"));

        let err = Values::from_json(json!({"interval": 10}), "counters:x").unwrap_err();
        assert!(matches!(err, BatsdError::ServerKeyMissing { ref key } if key == "counters:x"));

        let mut values =
            Values::from_json(json!({"interval": "10", "counters:x": []}), "counters:x").unwrap();
        assert_eq!(values.interval, 10);
        assert!(values.take_series("counters:x").unwrap().is_empty());
        assert!(!values.contains("counters:x"));
    }

    #[test]
    fn non_object_reply_is_a_protocol_error() {
        let err = Values::from_json(json!([1, 2]), "counters:x").unwrap_err();
        assert!(matches!(err, BatsdError::Protocol(_)));
    }
}
