//! Shared serialization/deserialization utilities for configuration

/// Duration stored as seconds
///
/// Whole durations are written as an integer (`shutdown_timeout = 5`);
/// fractional ones as a float (`shutdown_timeout = 0.25`). Both forms are
/// accepted on input.
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Whole(u64),
        Fractional(f64),
    }

    /// Serialize a Duration as seconds
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    /// Deserialize a Duration from integer or fractional seconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Seconds::deserialize(deserializer)? {
            Seconds::Whole(secs) => Ok(Duration::from_secs(secs)),
            Seconds::Fractional(secs) if secs.is_finite() && secs >= 0.0 => {
                Ok(Duration::from_secs_f64(secs))
            }
            Seconds::Fractional(secs) => Err(serde::de::Error::custom(format!(
                "invalid duration: {} seconds",
                secs
            ))),
        }
    }
}
