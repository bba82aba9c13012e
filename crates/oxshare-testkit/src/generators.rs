//! Proptest generators for property-based testing.

use std::time::Duration;

use proptest::prelude::*;

use oxshare::{Payload, SharePolicy};

/// Non-blank printable text.
pub fn text_payload() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][ -~]{0,255}".prop_map(String::from)
}

/// Arbitrary file contents, at least one byte.
pub fn file_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1))
}

/// A file name without path separators.
pub fn file_name() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,16}\\.[a-z]{1,4}".prop_map(String::from)
}

/// Either kind of payload.
pub fn payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        text_payload().prop_map(Payload::Text),
        (file_name(), file_bytes(4096)).prop_map(|(name, data)| Payload::file(name, data)),
    ]
}

/// Parameters for a policy the default limits accept.
#[derive(Debug, Clone)]
pub struct PolicyParams {
    pub expires_secs: Option<u64>,
    pub max_views: Option<u32>,
    pub burn_after_read: bool,
    pub password: Option<String>,
}

impl PolicyParams {
    pub fn to_policy(&self) -> SharePolicy {
        SharePolicy {
            expires_in: self.expires_secs.map(Duration::from_secs),
            max_views: self.max_views,
            burn_after_read: self.burn_after_read,
            password: self.password.clone(),
        }
    }
}

impl Arbitrary for PolicyParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::option::of(1u64..=3600),
            prop::option::of(1u32..=10),
            any::<bool>(),
            prop::option::of("[ -~]{1,24}"),
        )
            .prop_map(|(expires_secs, max_views, burn_after_read, password)| PolicyParams {
                expires_secs,
                max_views,
                burn_after_read,
                password,
            })
            .boxed()
    }
}

/// A policy the default limits accept.
pub fn policy() -> impl Strategy<Value = SharePolicy> {
    any::<PolicyParams>().prop_map(|p| p.to_policy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxshare::core::{validate_payload, PolicyLimits};

    proptest! {
        #[test]
        fn generated_payloads_are_valid(payload in payload()) {
            prop_assert!(validate_payload(&payload, &PolicyLimits::default()).is_ok());
        }

        #[test]
        fn generated_policies_resolve(params: PolicyParams) {
            let resolved = params.to_policy().resolve(0, &PolicyLimits::default());
            prop_assert!(resolved.is_ok());
        }
    }
}
