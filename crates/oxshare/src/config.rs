//! Configuration for the share manager.

use std::time::Duration;

use oxshare_core::PolicyLimits;
use serde::{Deserialize, Serialize};

/// Configuration for the [`ShareManager`](crate::ShareManager).
///
/// Durations are written as whole seconds in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Longest expiry a creator may request.
    #[serde(with = "duration_secs")]
    pub max_expiry: Duration,
    /// Expiry applied when the creator does not ask for one.
    #[serde(with = "duration_secs")]
    pub default_expiry: Duration,
    /// Largest accepted file, in plaintext bytes.
    pub max_file_size: u64,
    /// How many characters of the exported key are stored as a hint.
    pub key_hint_len: usize,
    /// How many times a contended view update is retried.
    pub update_retries: u32,
    /// How many times a blob delete is attempted before it is logged as an orphan.
    pub blob_delete_attempts: u32,
    /// Origin that links are composed under.
    pub origin: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        let limits = PolicyLimits::default();
        Self {
            max_expiry: limits.max_expiry,
            default_expiry: limits.default_expiry,
            max_file_size: limits.max_file_size,
            key_hint_len: 8,
            update_retries: 8,
            blob_delete_attempts: 3,
            origin: "http://localhost".to_string(),
        }
    }
}

impl ShareConfig {
    /// Load from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The limits policy validation runs against.
    pub fn limits(&self) -> PolicyLimits {
        PolicyLimits {
            max_expiry: self.max_expiry,
            default_expiry: self.default_expiry,
            max_file_size: self.max_file_size,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
