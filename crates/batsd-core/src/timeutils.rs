use anyhow::{Context, Result};
use std::time::Duration as StdDuration;
use time::error::ComponentRange;
use time::{Duration, OffsetDateTime};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Fails for timestamps outside the range `time` can represent.
pub fn utc_from_timestamp(ts: i64) -> std::result::Result<OffsetDateTime, ComponentRange> {
    OffsetDateTime::from_unix_timestamp(ts)
}

/// Parses a lookback window such as `15m` or `1d`.
pub fn parse_range(input: &str) -> Result<Duration> {
    let window = humantime::parse_duration(input)
        .with_context(|| format!("invalid duration {input:?}"))?;
    duration_from_std(window)
}

pub fn duration_from_std(window: StdDuration) -> Result<Duration> {
    Duration::try_from(window).with_context(|| format!("duration {window:?} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_outside_time_range_are_errors() {
        assert_eq!(utc_from_timestamp(0).unwrap(), OffsetDateTime::UNIX_EPOCH);
        assert!(utc_from_timestamp(i64::MAX).is_err());
    }

    #[test]
    fn parse_range_rejects_garbage() {
        assert_eq!(parse_range("90s").unwrap().whole_seconds(), 90);
        assert!(parse_range("soon").is_err());
    }
}
