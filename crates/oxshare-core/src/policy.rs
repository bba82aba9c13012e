//! Creation-time policy: what the creator asks for and what it resolves to.
//!
//! Validation runs before any key is generated or any byte is encrypted, so a
//! rejected request costs nothing and leaves nothing behind.

use std::fmt;
use std::time::Duration;

use crate::error::PolicyError;
use crate::gate::{self, PasswordDigest};

/// The secret a creator hands in.
#[derive(Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    File { name: String, data: Vec<u8> },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }

    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Payload::File {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Plaintext bytes to seal.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::File { data, .. } => data,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => write!(f, "Text({} bytes)", text.len()),
            Payload::File { name, data } => f
                .debug_struct("File")
                .field("name", name)
                .field("size", &data.len())
                .finish(),
        }
    }
}

/// Access policy requested at creation.
///
/// `max_views` and `burn_after_read` are independent; whichever limit is
/// hit first destroys the share.
#[derive(Clone, Default)]
pub struct SharePolicy {
    /// `None` means the configured default expiry.
    pub expires_in: Option<Duration>,
    pub max_views: Option<u32>,
    pub burn_after_read: bool,
    /// An empty password is treated as no password.
    pub password: Option<String>,
}

impl SharePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self
    }

    pub fn max_views(mut self, views: u32) -> Self {
        self.max_views = Some(views);
        self
    }

    pub fn burn_after_read(mut self) -> Self {
        self.burn_after_read = true;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Check the policy against `limits` and turn it into stored fields.
    pub fn resolve(&self, now: i64, limits: &PolicyLimits) -> Result<ResolvedPolicy, PolicyError> {
        let ttl = match self.expires_in {
            Some(ttl) if ttl.is_zero() => return Err(PolicyError::ExpiryNotPositive),
            Some(ttl) if ttl > limits.max_expiry => {
                return Err(PolicyError::ExpiryTooLong {
                    requested_secs: ttl.as_secs(),
                    max_secs: limits.max_expiry.as_secs(),
                })
            }
            Some(ttl) => ttl,
            None => limits.default_expiry,
        };

        if self.max_views == Some(0) {
            return Err(PolicyError::ZeroMaxViews);
        }

        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let password_digest = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(gate::challenge);

        Ok(ResolvedPolicy {
            expires_at: now.saturating_add(ttl_ms),
            max_views: self.max_views,
            burn_after_read: self.burn_after_read,
            password_digest,
        })
    }
}

impl fmt::Debug for SharePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharePolicy")
            .field("expires_in", &self.expires_in)
            .field("max_views", &self.max_views)
            .field("burn_after_read", &self.burn_after_read)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Ceilings and defaults applied to every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyLimits {
    pub max_expiry: Duration,
    pub default_expiry: Duration,
    pub max_file_size: u64,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            max_expiry: Duration::from_secs(60 * 60),
            default_expiry: Duration::from_secs(365 * 24 * 60 * 60),
            max_file_size: 50 * 1024 * 1024,
        }
    }
}

/// A policy after validation, ready to be written into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub expires_at: i64,
    pub max_views: Option<u32>,
    pub burn_after_read: bool,
    pub password_digest: Option<PasswordDigest>,
}

/// Reject payloads that would produce a useless or oversized share.
pub fn validate_payload(payload: &Payload, limits: &PolicyLimits) -> Result<(), PolicyError> {
    match payload {
        Payload::Text(text) if text.trim().is_empty() => Err(PolicyError::EmptyPayload),
        Payload::Text(_) => Ok(()),
        Payload::File { data, .. } if data.is_empty() => Err(PolicyError::EmptyPayload),
        Payload::File { data, .. } => {
            let size = data.len() as u64;
            if size > limits.max_file_size {
                Err(PolicyError::FileTooLarge {
                    size,
                    max: limits.max_file_size,
                })
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_default_expiry_applies() {
        let limits = PolicyLimits::default();
        let resolved = SharePolicy::new().resolve(NOW, &limits).unwrap();
        assert_eq!(resolved.expires_at, NOW + 365 * 24 * 60 * 60 * 1000);
        assert_eq!(resolved.max_views, None);
        assert!(resolved.password_digest.is_none());
    }

    #[test]
    fn test_requested_expiry() {
        let resolved = SharePolicy::new()
            .expires_in(Duration::from_secs(600))
            .resolve(NOW, &PolicyLimits::default())
            .unwrap();
        assert_eq!(resolved.expires_at, NOW + 600_000);
    }

    #[test]
    fn test_expiry_ceiling_is_inclusive() {
        let limits = PolicyLimits::default();
        assert!(SharePolicy::new()
            .expires_in(Duration::from_secs(3600))
            .resolve(NOW, &limits)
            .is_ok());

        let err = SharePolicy::new()
            .expires_in(Duration::from_secs(3601))
            .resolve(NOW, &limits)
            .unwrap_err();
        assert_eq!(
            err,
            PolicyError::ExpiryTooLong {
                requested_secs: 3601,
                max_secs: 3600
            }
        );
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let err = SharePolicy::new()
            .expires_in(Duration::ZERO)
            .resolve(NOW, &PolicyLimits::default())
            .unwrap_err();
        assert_eq!(err, PolicyError::ExpiryNotPositive);
    }

    #[test]
    fn test_zero_max_views_rejected() {
        let err = SharePolicy::new()
            .max_views(0)
            .resolve(NOW, &PolicyLimits::default())
            .unwrap_err();
        assert_eq!(err, PolicyError::ZeroMaxViews);
    }

    #[test]
    fn test_empty_password_means_none() {
        let limits = PolicyLimits::default();
        let none = SharePolicy::new().password("").resolve(NOW, &limits).unwrap();
        assert!(none.password_digest.is_none());

        let some = SharePolicy::new().password("p@ss").resolve(NOW, &limits).unwrap();
        assert!(gate::verify("p@ss", &some.password_digest.unwrap()));
    }

    #[test]
    fn test_validate_payload() {
        let limits = PolicyLimits {
            max_file_size: 10,
            ..PolicyLimits::default()
        };

        assert!(validate_payload(&Payload::text("hello"), &limits).is_ok());
        assert_eq!(
            validate_payload(&Payload::text("  \n\t"), &limits),
            Err(PolicyError::EmptyPayload)
        );
        assert_eq!(
            validate_payload(&Payload::file("a.bin", vec![]), &limits),
            Err(PolicyError::EmptyPayload)
        );
        assert!(validate_payload(&Payload::file("a.bin", vec![0; 10]), &limits).is_ok());
        assert_eq!(
            validate_payload(&Payload::file("a.bin", vec![0; 11]), &limits),
            Err(PolicyError::FileTooLarge { size: 11, max: 10 })
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let policy = SharePolicy::new().password("hunter2");
        assert!(!format!("{:?}", policy).contains("hunter2"));

        let payload = Payload::text("top secret");
        assert!(!format!("{:?}", payload).contains("top secret"));
    }
}
