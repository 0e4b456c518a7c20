//! Time source for timestamps written to storage and the remote record

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Source of "now"
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant, for deterministic output
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix
#[must_use]
pub fn iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `ts` truncated to the millisecond precision [`iso8601`] keeps
#[must_use]
pub fn to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Parse an RFC 3339 / ISO-8601 timestamp into UTC
///
/// # Errors
/// Returns the chrono parse error for malformed input
pub fn parse_iso8601(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn iso8601_matches_js_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(iso8601(ts), "2024-03-05T07:08:09.000Z");
    }

    #[test]
    fn to_millis_matches_rendered_time() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let truncated = to_millis(ts);
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(parse_iso8601(&iso8601(ts)).unwrap(), truncated);
    }

    #[test]
    fn iso8601_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(parse_iso8601(&iso8601(ts)).unwrap(), ts);
    }

    #[test]
    fn fixed_clock_is_fixed() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock(ts);
        assert_eq!(clock.now(), clock.now());
    }
}
