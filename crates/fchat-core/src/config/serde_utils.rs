//! Duration fields as plain integers
//!
//! `#[serde(with = "...")]` adapters so config files say `request_timeout = 30`
//! instead of serde's `{ secs, nanos }` table. Timeouts are whole seconds;
//! reconnect delays need sub-second precision and use milliseconds.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

fn write_units<S: Serializer>(units: u128, serializer: S) -> Result<S::Ok, S::Error> {
    // TOML integers are i64; saturate rather than fail on absurd values
    serializer.serialize_u64(u64::try_from(units).unwrap_or(i64::MAX as u64))
}

fn read_units<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    u64::deserialize(deserializer)
}

/// Whole seconds, e.g. `connect_timeout = 10`
pub mod duration_secs {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        write_units(u128::from(duration.as_secs()), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        read_units(deserializer).map(Duration::from_secs)
    }
}

/// Milliseconds, e.g. `initial = 1000`
pub mod duration_millis {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        write_units(duration.as_millis(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        read_units(deserializer).map(Duration::from_millis)
    }
}
