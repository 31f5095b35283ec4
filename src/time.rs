//! Conversions between system time and the two fixed-point epoch
//! representations of the protocol: 32-bit seconds and 64-bit microseconds
//! since 00:00:00 UTC, 1 January 2004, counted in TAI (leap-second
//! adjusted).

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Duration, IValue, Time32, Time64, ValidityPeriod};

/// Unix seconds at 00:00:00 UTC, 1 January 2004
const EPOCH_2004_UNIX: u64 = 1_072_915_200;

/// Unix instants at which a positive leap second took effect after the
/// 2004 epoch (2006-01-01, 2009-01-01, 2012-07-01, 2015-07-01, 2017-01-01).
/// No further leap second has been scheduled as of publication.
const LEAP_SECONDS_AFTER_2004: [u64; 5] = [
    1_136_073_600,
    1_230_768_000,
    1_341_100_800,
    1_435_708_800,
    1_483_228_800,
];

/// Length of the `i`-period used to bucket rotating credentials and
/// linkage-value revocation: one week.
pub const I_PERIOD_SECONDS: u32 = 604_800;

fn leap_seconds_at(unix_secs: u64) -> u64 {
    LEAP_SECONDS_AFTER_2004
        .iter()
        .filter(|&&leap| unix_secs >= leap)
        .count() as u64
}

/// Converts Unix seconds to protocol seconds.
///
/// Instants before the 2004 epoch saturate to zero.
#[must_use]
pub fn time32_from_unix(unix_secs: u64) -> Time32 {
    let elapsed = unix_secs.saturating_sub(EPOCH_2004_UNIX) + leap_seconds_at(unix_secs);
    elapsed.min(u64::from(u32::MAX)) as Time32
}

/// Converts Unix microseconds to protocol microseconds.
#[must_use]
pub fn time64_from_unix_micros(unix_micros: u64) -> Time64 {
    let unix_secs = unix_micros / 1_000_000;
    unix_micros.saturating_sub(EPOCH_2004_UNIX * 1_000_000)
        + leap_seconds_at(unix_secs) * 1_000_000
}

/// Converts protocol seconds back to Unix seconds.
///
/// The inverse is computed against the same leap-second table; instants
/// that fall on an inserted leap second map to the following Unix second.
#[must_use]
pub fn unix_from_time32(t: Time32) -> u64 {
    let mut unix = EPOCH_2004_UNIX + u64::from(t);
    // each leap second that has passed shifts the mapping back by one
    for _ in 0..LEAP_SECONDS_AFTER_2004.len() {
        let correction = leap_seconds_at(unix);
        let candidate = EPOCH_2004_UNIX + u64::from(t) - correction;
        if candidate == unix {
            break;
        }
        unix = candidate;
    }
    unix
}

/// The current time in protocol seconds.
#[must_use]
pub fn now_time32() -> Time32 {
    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    time32_from_unix(unix.as_secs())
}

/// The current time in protocol microseconds.
#[must_use]
pub fn now_time64() -> Time64 {
    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    time64_from_unix_micros(unix.as_micros() as u64)
}

/// Widens protocol seconds to protocol microseconds.
#[must_use]
pub fn time32_to_micros(t: Time32) -> Time64 {
    u64::from(t) * 1_000_000
}

/// The `i`-period containing the given instant.
#[must_use]
pub fn i_period_of(t: Time32) -> IValue {
    (t / I_PERIOD_SECONDS) as IValue
}

/// The `i`-period containing the given microsecond instant.
#[must_use]
pub fn i_period_of_micros(t: Time64) -> IValue {
    i_period_of((t / 1_000_000).min(u64::from(u32::MAX)) as Time32)
}

impl Duration {
    /// the duration in microseconds
    #[must_use]
    pub fn as_micros(&self) -> u64 {
        match *self {
            Duration::Microseconds(n) => u64::from(n),
            Duration::Milliseconds(n) => u64::from(n) * 1_000,
            Duration::Seconds(n) => u64::from(n) * 1_000_000,
            Duration::Minutes(n) => u64::from(n) * 60 * 1_000_000,
            Duration::Hours(n) => u64::from(n) * 3_600 * 1_000_000,
            Duration::SixtyHours(n) => u64::from(n) * 216_000 * 1_000_000,
            // a year of validity is counted as 365.25 days to cover leap days
            Duration::Years(n) => u64::from(n) * 31_557_600 * 1_000_000,
        }
    }
}

impl ValidityPeriod {
    /// start of the validity interval in protocol microseconds
    #[must_use]
    pub fn start_micros(&self) -> Time64 {
        time32_to_micros(self.start)
    }

    /// exclusive end of the validity interval in protocol microseconds
    #[must_use]
    pub fn end_micros(&self) -> Time64 {
        self.start_micros().saturating_add(self.duration.as_micros())
    }

    /// whether `at` lies within `[start, end)`
    #[must_use]
    pub fn contains(&self, at: Time64) -> bool {
        self.start_micros() <= at && at < self.end_micros()
    }

    /// whether `inner` is a subset of this period.
    ///
    /// A certificate whose validity interval is not a subset of its
    /// issuer's must be refused.
    #[must_use]
    pub fn encloses(&self, inner: &ValidityPeriod) -> bool {
        self.start_micros() <= inner.start_micros() && inner.end_micros() <= self.end_micros()
    }
}
