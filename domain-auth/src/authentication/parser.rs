//! `tag=value; tag=value` record grammar shared by DMARC (RFC 7489) and
//! DKIM key records (RFC 6376)

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;
use tracing::debug;

/// Parse failure for a TXT record body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },
}

/// Version tag a caller expects at the head of the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionTag {
    pub tag: &'static str,
    pub value: &'static str,
    /// Must be present and lead the record. When false the tag may appear
    /// anywhere or not at all, but a present one must match.
    pub required: bool,
}

impl VersionTag {
    pub const DMARC: VersionTag = VersionTag {
        tag: "v",
        value: "DMARC1",
        required: true,
    };

    pub const DKIM: VersionTag = VersionTag {
        tag: "v",
        value: "DKIM1",
        required: false,
    };

    /// `v=DMARC1` style prefix used in messages
    pub fn prefix(&self) -> String {
        format!("{}={}", self.tag, self.value)
    }
}

/// Ordered tag/value pairs.
///
/// Tag names are stored lowercase. A repeated tag keeps the position of its
/// first occurrence and the value of its last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList {
    pairs: Vec<(String, String)>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        let tag = tag.to_ascii_lowercase();
        self.pairs
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// First tag in record order
    pub fn first(&self) -> Option<(&str, &str)> {
        self.pairs
            .first()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn insert(&mut self, tag: String, value: String) {
        match self.pairs.iter_mut().find(|(name, _)| *name == tag) {
            Some(existing) => existing.1 = value,
            None => self.pairs.push((tag, value)),
        }
    }
}

impl Serialize for TagList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (tag, value) in &self.pairs {
            map.serialize_entry(tag, value)?;
        }
        map.end()
    }
}

/// Split one segment on its first `=`; `None` unless the tag name is a
/// non-empty run of `[A-Za-z0-9_]`
fn split_tag(segment: &str) -> Option<(&str, &str)> {
    let (name, value) = segment.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name, value.trim()))
}

/// First `tag=value` pair of a record, tag lowercased.
///
/// Cheap pre-filter for picking out records of one kind among unrelated TXT
/// data at the same name; does not validate the rest of the record.
pub fn leading_tag(raw: &str) -> Option<(String, String)> {
    raw.split(';')
        .find_map(|segment| split_tag(segment.trim()))
        .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
}

/// Parse a record body into tags without any version check.
///
/// Segments are split on `;` and each one on its first `=`. Segments that
/// are not `tag=value` pairs are skipped; the record is malformed only when
/// none is left.
pub fn parse_tags(raw: &str) -> Result<TagList, ParseError> {
    let mut tags = TagList::new();

    for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        match split_tag(segment) {
            Some((name, value)) => tags.insert(name.to_ascii_lowercase(), value.to_string()),
            None => debug!("Skipping segment '{}'", segment),
        }
    }

    if tags.is_empty() {
        return Err(ParseError::Malformed("no tag=value pairs found".to_string()));
    }

    Ok(tags)
}

/// Parse a record and check its version tag.
///
/// A required version tag must be the first tag of the record; an optional
/// one may sit anywhere or be absent. Values compare case-sensitively,
/// matching how receivers treat `v=DMARC1`.
pub fn parse_record(raw: &str, version: &VersionTag) -> Result<TagList, ParseError> {
    let tags = parse_tags(raw)?;

    let mismatch = |tag: &str, value: &str| ParseError::VersionMismatch {
        expected: version.prefix(),
        found: format!("{}={}", tag, value),
    };

    if version.required {
        let (first_tag, first_value) = match tags.first() {
            Some(first) => first,
            None => return Err(ParseError::Malformed("no tag=value pairs found".to_string())),
        };
        if first_tag != version.tag || first_value != version.value {
            return Err(mismatch(first_tag, first_value));
        }
    } else if let Some(value) = tags.get(version.tag) {
        if value != version.value {
            return Err(mismatch(version.tag, value));
        }
    }

    Ok(tags)
}
