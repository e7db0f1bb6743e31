//! Ontology type URLs.
//!
//! Every ontology type is published under a *base URL* (ending in `/`) and
//! versioned with an integer. The pair is written as a *versioned URL*:
//! `{base}v/{version}`.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SubgraphError;

const MAX_URL_LENGTH: usize = 2048;

/// Unversioned identifier shared by every version of an ontology type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, SubgraphError> {
        let url = url.into();
        validate_base_url(&url)?;
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_base_url(url: &str) -> Result<(), SubgraphError> {
    let invalid = |reason: &str| SubgraphError::InvalidBaseUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if url.len() > MAX_URL_LENGTH {
        return Err(invalid("URL is too long"));
    }
    if !url.ends_with('/') {
        return Err(invalid("URL must end with a trailing slash"));
    }
    let parsed = ::url::Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base"));
    }
    Ok(())
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BaseUrl {
    type Err = SubgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::new(String::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}

/// A base URL pinned to one version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionedUrl {
    pub base_url: BaseUrl,
    pub version: u32,
}

impl VersionedUrl {
    pub fn new(base_url: BaseUrl, version: u32) -> Self {
        Self { base_url, version }
    }
}

impl fmt::Display for VersionedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v/{}", self.base_url, self.version)
    }
}

impl FromStr for VersionedUrl {
    type Err = SubgraphError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| SubgraphError::InvalidVersionedUrl {
            url: url.to_string(),
            reason,
        };

        let (base, version) = url
            .rsplit_once("v/")
            .ok_or_else(|| invalid("missing `v/{version}` suffix".to_string()))?;
        if version.is_empty() {
            return Err(invalid("missing version".to_string()));
        }
        let version = version
            .parse::<u32>()
            .map_err(|e| invalid(format!("invalid version `{version}`: {e}")))?;
        let base_url = BaseUrl::new(base).map_err(|e| invalid(e.to_string()))?;

        Ok(Self { base_url, version })
    }
}

impl Serialize for VersionedUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionedUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}
