use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace a key lives in on the daemon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Counter,
    Gauge,
    Timer,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Counter, Kind::Gauge, Kind::Timer];

    pub fn prefix(self) -> &'static str {
        match self {
            Kind::Counter => "counters:",
            Kind::Gauge => "gauges:",
            Kind::Timer => "timers:",
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Kind::Counter => "Counter",
            Kind::Gauge => "Gauge",
            Kind::Timer => "Timer",
        }
    }

    /// Splits `counters:foo.bar` into `(Counter, "foo.bar")`.
    pub fn split_key(key: &str) -> Option<(Kind, &str)> {
        Kind::ALL
            .into_iter()
            .find_map(|kind| key.strip_prefix(kind.prefix()).map(|rest| (kind, rest)))
    }
}

impl FromStr for Kind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "counter" | "counters" => Ok(Kind::Counter),
            "gauge" | "gauges" => Ok(Kind::Gauge),
            "timer" | "timers" => Ok(Kind::Timer),
            _ => anyhow::bail!("unknown data type: {s}"),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Statistic selected from a timer's per-interval summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Measure {
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "upper_90")]
    Upper90,
    #[serde(rename = "stddev")]
    Stddev,
}

impl Measure {
    pub fn as_str(self) -> &'static str {
        match self {
            Measure::Mean => "mean",
            Measure::Min => "min",
            Measure::Max => "max",
            Measure::Count => "count",
            Measure::Upper90 => "upper_90",
            Measure::Stddev => "stddev",
        }
    }
}

impl FromStr for Measure {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Measure::Mean),
            "min" => Ok(Measure::Min),
            "max" => Ok(Measure::Max),
            "count" => Ok(Measure::Count),
            "upper_90" | "upper90" => Ok(Measure::Upper90),
            "stddev" | "std" => Ok(Measure::Stddev),
            _ => anyhow::bail!("unknown measure: {s}"),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds `<prefix><name>[.<subname>][:<measure>]`.
pub fn keyname(kind: Kind, name: &str, subname: Option<&str>, measure: Option<Measure>) -> String {
    let mut key = String::with_capacity(kind.prefix().len() + name.len() + 16);
    key.push_str(kind.prefix());
    key.push_str(name);
    if let Some(sub) = subname {
        key.push('.');
        key.push_str(sub);
    }
    if let Some(measure) = measure {
        key.push(':');
        key.push_str(measure.as_str());
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyname_variants() {
        assert_eq!(keyname(Kind::Counter, "hits", None, None), "counters:hits");
        assert_eq!(
            keyname(Kind::Gauge, "load", Some("web1"), None),
            "gauges:load.web1"
        );
        assert_eq!(
            keyname(Kind::Timer, "api", Some("latency"), Some(Measure::Max)),
            "timers:api.latency:max"
        );
        assert_eq!(
            keyname(Kind::Timer, "api", None, Some(Measure::Upper90)),
            "timers:api:upper_90"
        );
    }

    #[test]
    fn split_key_strips_prefix() {
        assert_eq!(
            Kind::split_key("counters:Test.counter"),
            Some((Kind::Counter, "Test.counter"))
        );
        assert_eq!(
            Kind::split_key("timers:req:mean"),
            Some((Kind::Timer, "req:mean"))
        );
        assert_eq!(Kind::split_key("sets:x"), None);
    }

    #[test]
    fn measure_parsing_accepts_wire_names() {
        for m in [
            Measure::Mean,
            Measure::Min,
            Measure::Max,
            Measure::Count,
            Measure::Upper90,
            Measure::Stddev,
        ] {
            assert_eq!(m.as_str().parse::<Measure>().unwrap(), m);
        }
        assert!("median".parse::<Measure>().is_err());
    }

    #[test]
    fn kind_parsing_accepts_plurals() {
        assert_eq!("timers".parse::<Kind>().unwrap(), Kind::Timer);
        assert_eq!("Gauge".parse::<Kind>().unwrap(), Kind::Gauge);
        assert!("set".parse::<Kind>().is_err());
    }
}
