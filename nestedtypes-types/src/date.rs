//! UTC instants with an explicit invalid state.
//!
//! A `Date` attribute must always hold a date, even after garbage was
//! assigned to it. Invalid input therefore produces the invalid-date marker
//! (`Date::invalid()`) instead of an error, mirroring a browser `Date`
//! whose time value is `NaN`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Largest absolute time value a browser date accepts (±100,000,000 days).
const MAX_MILLIS: f64 = 8.64e15;

/// Local-time layouts accepted in addition to RFC 3339. All are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A millisecond-precision UTC instant, or the invalid-date marker.
#[derive(Debug, Clone, Copy)]
pub struct Date(Option<DateTime<Utc>>);

impl Date {
    /// The current instant, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_millis(Utc::now().timestamp_millis() as f64)
    }

    /// The invalid-date marker.
    #[must_use]
    pub const fn invalid() -> Self {
        Self(None)
    }

    /// Wraps an existing chrono instant.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis() as f64)
    }

    /// Builds a date from epoch milliseconds. Fractions are truncated;
    /// `NaN` and out-of-range values give the invalid marker.
    #[must_use]
    pub fn from_millis(millis: f64) -> Self {
        if !millis.is_finite() || millis.abs() > MAX_MILLIS {
            return Self::invalid();
        }
        Self(DateTime::from_timestamp_millis(millis.trunc() as i64))
    }

    /// Lenient parse: RFC 3339 / ISO 8601 with or without offset, with `T`
    /// or a space between date and time, or a bare `YYYY-MM-DD`.
    /// Input without an offset is read as UTC.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let t = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
            return Self::from_datetime(dt.with_timezone(&Utc));
        }

        let naive = t.strip_suffix('Z').unwrap_or(t);
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
                return Self::from_datetime(dt.and_utc());
            }
        }

        if let Ok(dt) = DateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S%.f%:z") {
            return Self::from_datetime(dt.with_timezone(&Utc));
        }

        match NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
            Ok(day) => day
                .and_hms_opt(0, 0, 0)
                .map_or_else(Self::invalid, |dt| Self::from_datetime(dt.and_utc())),
            Err(_) => Self::invalid(),
        }
    }

    /// Returns true unless this is the invalid marker.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// Epoch milliseconds, or `NaN` for the invalid marker.
    #[must_use]
    pub fn timestamp_millis(&self) -> f64 {
        self.0.map_or(f64::NAN, |dt| dt.timestamp_millis() as f64)
    }

    /// ISO 8601 form with milliseconds and a `Z` suffix
    /// (`2012-12-12T10:00:00.000Z`). `None` for the invalid marker.
    #[must_use]
    pub fn to_iso_string(&self) -> Option<String> {
        self.0
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::now()
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.0, other.0) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (None, None) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_iso_string() {
            Some(iso) => f.write_str(&iso),
            None => f.write_str("Invalid Date"),
        }
    }
}

impl FromStr for Date {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = Self::parse(s);
        if date.is_valid() {
            Ok(date)
        } else {
            Err(crate::Error::InvalidDate(s.to_string()))
        }
    }
}

impl From<DateTime<Utc>> for Date {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_iso_string() {
            Some(iso) => serializer.serialize_str(&iso),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DateVisitor;

        impl<'de> Visitor<'de> for DateVisitor {
            type Value = Date;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an ISO 8601 string, epoch milliseconds, or null")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Date, E> {
                Ok(Date::parse(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Date, E> {
                Ok(Date::from_millis(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Date, E> {
                Ok(Date::from_millis(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Date, E> {
                Ok(Date::from_millis(v))
            }

            fn visit_none<E: de::Error>(self) -> Result<Date, E> {
                Ok(Date::invalid())
            }

            fn visit_unit<E: de::Error>(self) -> Result<Date, E> {
                Ok(Date::invalid())
            }
        }

        deserializer.deserialize_any(DateVisitor)
    }
}
