//! DogStatsD tags
//!
//! A [`Tag`] renders as `key:value`. A [`TagSet`] keeps insertion order so the
//! emitted tag list is stable across sends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Empty tag set, used wherever no extra tags are wanted
pub const NO_TAGS: TagSet = TagSet { tags: Vec::new() };

/// A single `key:value` tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

/// Ordered list of tags attached to a metric or event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag, builder style
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Tag::new(key, value));
        self
    }

    pub fn push(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Wire form expected by the transport: one `key:value` string per tag
    pub fn format(&self) -> Vec<String> {
        self.tags.iter().map(Tag::to_string).collect()
    }
}

impl From<Vec<Tag>> for TagSet {
    fn from(tags: Vec<Tag>) -> Self {
        Self { tags }
    }
}

impl<K, V> FromIterator<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(|(k, v)| Tag::new(k, v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_tag() {
        let tag = Tag::new("host-id", "27");
        assert_eq!(tag.key(), "host-id");
        assert_eq!(tag.value(), "27");
    }

    #[test]
    fn test_format_tag() {
        assert_eq!(Tag::new("host-id", "27").to_string(), "host-id:27");
    }

    #[test]
    fn test_format_multiple_tags() {
        let tags = TagSet::new()
            .with("host-id", "27")
            .with("bucket-name", "s3://yo/2017-10-10-07-45")
            .with("collection", "yo");

        assert_eq!(
            tags.format(),
            vec![
                "host-id:27".to_string(),
                "bucket-name:s3://yo/2017-10-10-07-45".to_string(),
                "collection:yo".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_tags_formats_empty() {
        assert!(NO_TAGS.is_empty());
        assert!(NO_TAGS.format().is_empty());
    }

    #[test]
    fn test_collect_from_pairs() {
        let tags: TagSet = vec![("env", "prod"), ("region", "eu")].into_iter().collect();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.format(), vec!["env:prod", "region:eu"]);
    }

    #[test]
    fn test_serde_is_a_plain_list() {
        let tags = TagSet::new().with("env", "prod");
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, r#"[{"key":"env","value":"prod"}]"#);

        let back: TagSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tags);
    }

    /// Property: format keeps one entry per tag, in insertion order
    #[test]
    fn prop_format_preserves_order() {
        proptest!(|(pairs in proptest::collection::vec(("[a-z]{1,8}", "[a-z0-9]{1,8}"), 0..16))| {
            let tags: TagSet = pairs.iter().cloned().collect();
            let formatted = tags.format();

            prop_assert_eq!(formatted.len(), pairs.len());
            for ((k, v), s) in pairs.iter().zip(formatted.iter()) {
                prop_assert_eq!(s, &format!("{}:{}", k, v));
            }
        });
    }
}
