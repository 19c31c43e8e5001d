//! Candle intervals, bucket truncation, and lifecycle status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Aggregation interval for a candle collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleInterval {
    /// One-minute buckets.
    Minute,
    /// One-hour buckets.
    Hour,
    /// One-day (UTC midnight) buckets.
    Day,
}

impl CandleInterval {
    /// All intervals, in ascending duration order.
    pub const ALL: [Self; 3] = [Self::Minute, Self::Hour, Self::Day];

    /// Bucket length in seconds.
    #[must_use]
    pub const fn duration_secs(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    /// Truncates a UTC epoch timestamp down to the start of its bucket.
    #[must_use]
    pub const fn bucket_start(self, timestamp: i64) -> i64 {
        let duration = self.duration_secs();
        timestamp.div_euclid(duration) * duration
    }

    /// Persistence table holding this interval's candles.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Minute => "candles_minute",
            Self::Hour => "candles_hour",
            Self::Day => "candles_day",
        }
    }

    /// Wire/name form (`"minute"`, `"hour"`, `"day"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandleInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            other => Err(format!("unknown interval '{other}'")),
        }
    }
}

/// Lifecycle state of a candle row. Only `current` rows are mutable;
/// the transition to `finalized` happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleStatus {
    /// Still accepting folds from incoming swaps.
    Current,
    /// Promoted at a period boundary; immutable thereafter.
    Finalized,
}

impl CandleStatus {
    /// Wire/storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for CandleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    // 2021-01-01T12:34:56Z
    const TS: i64 = 1_609_504_496;

    #[test]
    fn minute_bucket_zeroes_seconds() {
        // 2021-01-01T12:34:00Z
        assert_eq!(CandleInterval::Minute.bucket_start(TS), 1_609_504_440);
    }

    #[test]
    fn hour_bucket_zeroes_minutes() {
        // 2021-01-01T12:00:00Z
        assert_eq!(CandleInterval::Hour.bucket_start(TS), 1_609_502_400);
    }

    #[test]
    fn day_bucket_zeroes_to_midnight() {
        // 2021-01-01T00:00:00Z
        assert_eq!(CandleInterval::Day.bucket_start(TS), 1_609_459_200);
    }

    #[test]
    fn bucket_start_is_idempotent() {
        for interval in CandleInterval::ALL {
            let bucket = interval.bucket_start(TS);
            assert_eq!(interval.bucket_start(bucket), bucket);
        }
    }

    #[test]
    fn interval_round_trips_through_str() {
        for interval in CandleInterval::ALL {
            let parsed = CandleInterval::from_str(interval.as_str());
            assert_eq!(parsed, Ok(interval));
        }
        assert!(CandleInterval::from_str("week").is_err());
    }

    #[test]
    fn status_storage_form() {
        assert_eq!(CandleStatus::Current.as_str(), "current");
        assert_eq!(CandleStatus::Finalized.as_str(), "finalized");
    }
}
