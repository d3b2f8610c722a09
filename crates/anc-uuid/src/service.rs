//! Internal implementation of the identifier and timestamp services.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::fmt;
use uuid::Uuid;

/// Canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is guaranteed to be canonical, so it can be used to
/// derive a sharded storage path without further checks.
///
/// # Construction
/// - [`ShardableUuid::new`] generates a new identifier (for new reports).
/// - [`ShardableUuid::parse`] validates an externally supplied identifier.
///
/// # Errors
/// [`ShardableUuid::parse`] returns [`UuidError::InvalidInput`] if the input is not already
/// canonical. Hyphenated or uppercase forms are rejected rather than normalised.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShardableUuid(Uuid);

impl Default for ShardableUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardableUuid {
    /// Generates a new random (v4) UUID in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a UUID string that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if Self::is_canonical(input) {
            return Uuid::parse_str(input)
                .map(Self)
                .map_err(|e| UuidError::InvalidInput(e.to_string()));
        }
        Err(UuidError::InvalidInput(format!(
            "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
            input
        )))
    }

    /// Returns true if `input` is in canonical UUID form.
    ///
    /// This is a purely syntactic check: exactly 32 bytes, only `0-9` and `a-f`.
    fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>/` where `s1`/`s2` are the first two pairs of hex
    /// characters of this UUID.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for ShardableUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ShardableUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ShardableUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ShardableUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Hands out strictly increasing UTC timestamps.
///
/// If the wall clock has not advanced past the previously issued timestamp (same millisecond,
/// or the clock stepped backwards), the next timestamp is the previous one plus 1 ms. This keeps
/// newest-first ordering of records total even when several are created back to back.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next timestamp, strictly greater than any previously issued or observed one.
    pub fn next(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = truncate_to_millis(Utc::now());

        let timestamp = match *last {
            Some(prev) if now <= prev => prev + Duration::milliseconds(1),
            _ => now,
        };

        *last = Some(timestamp);
        timestamp
    }

    /// Records a timestamp issued elsewhere (for example, read back from storage) so that later
    /// calls to [`MonotonicClock::next`] never go behind it.
    pub fn observe(&self, timestamp: DateTime<Utc>) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.map_or(true, |prev| timestamp > prev) {
            *last = Some(timestamp);
        }
    }
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}
