//! RFC 6901 JSON pointers.
//!
//! Patches address values by pointer strings (`""` is the root,
//! `/a/b` is key `b` inside key `a`). Lens evaluation mostly inspects and
//! rewrites the first segment or two, so [`JsonPointer`] keeps its unescaped
//! segments inline in a `SmallVec`.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;

/// A parsed JSON pointer. Serializes as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPointer {
    segments: SmallVec<[String; 4]>,
}

impl JsonPointer {
    /// The root pointer `""`.
    pub fn root() -> Self {
        JsonPointer::default()
    }

    /// Parses a pointer string, unescaping `~1` and `~0`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(CoreError::InvalidPointer {
                pointer: s.to_string(),
            });
        };
        let mut segments = SmallVec::new();
        for raw in rest.split('/') {
            segments.push(unescape(raw).ok_or_else(|| CoreError::InvalidPointer {
                pointer: s.to_string(),
            })?);
        }
        Ok(JsonPointer { segments })
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JsonPointer {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The pointer without its first segment (`/a/b/c` -> `/b/c`).
    pub fn tail(&self) -> JsonPointer {
        JsonPointer {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    /// Returns a new pointer with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> JsonPointer {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        JsonPointer { segments }
    }

    /// Returns `prefix` followed by this pointer's segments.
    pub fn prefixed<S: Into<String>>(&self, prefix: impl IntoIterator<Item = S>) -> JsonPointer {
        let mut segments: SmallVec<[String; 4]> = prefix.into_iter().map(Into::into).collect();
        segments.extend(self.segments.iter().cloned());
        JsonPointer { segments }
    }

    /// Replaces the first segment. No-op on the root pointer.
    pub fn with_first(&self, segment: &str) -> JsonPointer {
        let mut out = self.clone();
        if let Some(first) = out.segments.first_mut() {
            *first = segment.to_string();
        }
        out
    }

    /// Splits into parent pointer and last segment; `None` for the root.
    pub fn split_last(&self) -> Option<(JsonPointer, &str)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            JsonPointer {
                segments: parent.iter().cloned().collect(),
            },
            last.as_str(),
        ))
    }
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl TryFrom<String> for JsonPointer {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        JsonPointer::parse(&s)
    }
}

impl From<JsonPointer> for String {
    fn from(p: JsonPointer) -> String {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_parses_from_empty_string() {
        let p = JsonPointer::parse("").unwrap();
        assert!(p.is_root());
        assert_eq!(p.to_string(), "");
    }

    #[test]
    fn escapes_are_decoded_and_reencoded() {
        let p = JsonPointer::parse("/a~1b/c~0d").unwrap();
        assert_eq!(p.segments(), &["a/b".to_string(), "c~d".to_string()]);
        assert_eq!(p.to_string(), "/a~1b/c~0d");
    }

    #[test]
    fn rejects_missing_leading_slash_and_bad_escape() {
        assert!(JsonPointer::parse("a/b").is_err());
        assert!(JsonPointer::parse("/a~2").is_err());
    }

    #[test]
    fn tail_prefix_and_first_rewrite() {
        let p = JsonPointer::parse("/tags/0/name").unwrap();
        assert_eq!(p.first(), Some("tags"));
        assert_eq!(p.tail().to_string(), "/0/name");
        assert_eq!(p.tail().prefixed(["labels"]).to_string(), "/labels/0/name");
        assert_eq!(p.with_first("labels").to_string(), "/labels/0/name");
    }

    #[test]
    fn split_last_of_root_is_none() {
        assert!(JsonPointer::root().split_last().is_none());
        let p = JsonPointer::parse("/a/b").unwrap();
        let (parent, last) = p.split_last().unwrap();
        assert_eq!(parent.to_string(), "/a");
        assert_eq!(last, "b");
    }

    #[test]
    fn empty_segment_is_distinct_from_root() {
        let p = JsonPointer::parse("/").unwrap();
        assert_eq!(p.segments(), &[String::new()]);
        assert!(!p.is_root());
    }
}
