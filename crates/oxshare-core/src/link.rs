//! Share links: `{origin}/#/{id}/{key}`.
//!
//! The key sits in the URL fragment, which browsers do not send to the
//! server. The id is the only part the server ever needs.

use std::fmt;
use url::Url;

use crate::error::LinkError;
use crate::key::KeyString;
use crate::types::ShareId;

/// The `{id, key}` pair carried by a link.
#[derive(Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub id: ShareId,
    pub key: KeyString,
}

impl ShareLink {
    pub fn new(id: ShareId, key: KeyString) -> Self {
        Self { id, key }
    }

    /// Render the full link under `origin`.
    ///
    /// `origin` must be an absolute URL with no query or fragment. A trailing
    /// slash is dropped.
    pub fn compose(&self, origin: &str) -> Result<String, LinkError> {
        let parsed = Url::parse(origin).map_err(|e| LinkError::InvalidUrl(e.to_string()))?;
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(LinkError::InvalidOrigin(origin.to_string()));
        }

        let base = origin.trim_end_matches('/');
        Ok(format!("{}/#/{}/{}", base, self.id, self.key.as_str()))
    }

    /// Parse a full link.
    pub fn parse(link: &str) -> Result<Self, LinkError> {
        let url = Url::parse(link).map_err(|e| LinkError::InvalidUrl(e.to_string()))?;
        match url.fragment() {
            Some(fragment) if !fragment.is_empty() => Self::from_fragment(fragment),
            _ => Err(LinkError::MissingFragment),
        }
    }

    /// Parse just the fragment, `/{id}/{key}`.
    pub fn from_fragment(fragment: &str) -> Result<Self, LinkError> {
        let malformed = || LinkError::MalformedFragment(fragment.to_string());

        let rest = fragment.strip_prefix('/').ok_or_else(malformed)?;
        let mut parts = rest.split('/');
        let (id, key) = match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(key), None) if !id.is_empty() && !key.is_empty() => (id, key),
            _ => return Err(malformed()),
        };

        let id = ShareId::parse(id).map_err(|_| LinkError::InvalidId(id.to_string()))?;
        Ok(Self {
            id,
            key: KeyString::new(key),
        })
    }
}

impl fmt::Debug for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareLink")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::RawKey;

    #[test]
    fn test_compose_parse_roundtrip() {
        let link = ShareLink::new(ShareId::generate(), RawKey::generate().export());
        let url = link.compose("https://share.example.com").unwrap();

        assert!(url.starts_with("https://share.example.com/#/"));
        assert_eq!(ShareLink::parse(&url).unwrap(), link);
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let link = ShareLink::new(ShareId::generate(), KeyString::new("k"));
        assert_eq!(
            link.compose("https://a.example/").unwrap(),
            link.compose("https://a.example").unwrap()
        );
    }

    #[test]
    fn test_origin_with_path() {
        let link = ShareLink::new(ShareId::generate(), KeyString::new("k"));
        let url = link.compose("https://a.example/share/").unwrap();
        assert_eq!(url, format!("https://a.example/share/#/{}/k", link.id));
        assert_eq!(ShareLink::parse(&url).unwrap(), link);
    }

    #[test]
    fn test_compose_rejects_bad_origin() {
        let link = ShareLink::new(ShareId::generate(), KeyString::new("k"));
        assert!(matches!(
            link.compose("not a url"),
            Err(LinkError::InvalidUrl(_))
        ));
        assert!(matches!(
            link.compose("https://a.example/?x=1"),
            Err(LinkError::InvalidOrigin(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_fragment() {
        assert_eq!(
            ShareLink::parse("https://a.example/"),
            Err(LinkError::MissingFragment)
        );
        assert_eq!(
            ShareLink::parse("https://a.example/#"),
            Err(LinkError::MissingFragment)
        );
    }

    #[test]
    fn test_parse_rejects_malformed_fragment() {
        let id = ShareId::generate();
        for fragment in [
            format!("{}/key", id),
            format!("/{}", id),
            format!("/{}/", id),
            format!("/{}/key/extra", id),
            "//key".to_string(),
        ] {
            assert!(
                matches!(
                    ShareLink::from_fragment(&fragment),
                    Err(LinkError::MalformedFragment(_))
                ),
                "accepted {:?}",
                fragment
            );
        }
    }

    #[test]
    fn test_parse_rejects_bad_id() {
        assert_eq!(
            ShareLink::from_fragment("/nope/key"),
            Err(LinkError::InvalidId("nope".into()))
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = RawKey::generate().export();
        let link = ShareLink::new(ShareId::generate(), key.clone());
        assert!(!format!("{:?}", link).contains(key.as_str()));
    }
}
