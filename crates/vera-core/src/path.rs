//! # Field Paths
//!
//! A [`FieldPath`] is a dotted field reference (`tool.version`,
//! `controls.hitl.review_stages[0].role`) parsed once into a segment
//! sequence. Condition clauses, the field semantics registry, the
//! canonicalizer, and the effective-policy computer all address data through
//! this one type, so no consumer re-parses strings during recursion.
//!
//! ## Index stripping
//!
//! Array indices are part of a path (they matter for lookups into concrete
//! documents) but never part of a registry key: [`FieldPath::registry_key`]
//! drops them, so every element of an array resolves to the array's own
//! directive, and nested object fields inside array elements resolve to
//! `array.field`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array position.
    Index(usize),
}

/// A parsed, immutable field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path.
    ///
    /// Accepts `a.b.c`, `a.b[2].c`, and bare numeric segments (`a.2.c`),
    /// which are read as indices.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFieldPath`] for empty input, empty
    /// segments, or malformed index brackets.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFieldPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.trim().is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if name.is_empty() && rest.is_empty() {
                return Err(invalid("empty segment"));
            }
            if !name.is_empty() {
                if name.contains(']') {
                    return Err(invalid("unbalanced ']'"));
                }
                match name.parse::<usize>() {
                    Ok(i) => segments.push(PathSegment::Index(i)),
                    Err(_) => segments.push(PathSegment::Key(name.to_string())),
                }
            }
            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| invalid("unbalanced '['"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("index must be a non-negative integer"))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected characters after index"));
                }
            }
        }
        Ok(Self { segments })
    }

    /// Build a path from key segments only.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: keys
                .into_iter()
                .map(|k| PathSegment::Key(k.into()))
                .collect(),
        }
    }

    /// True if `key` survives a round trip through [`Display`] and
    /// [`FieldPath::parse`] as a single key segment.
    ///
    /// Rejects empty keys, keys containing `.`, `[` or `]`, and keys that
    /// parse as an array index.
    ///
    /// [`Display`]: std::fmt::Display
    pub fn is_plain_key(key: &str) -> bool {
        !key.is_empty()
            && !key.contains(['.', '[', ']'])
            && key.parse::<usize>().is_err()
    }

    /// Return a new path with an object key appended.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.into()));
        Self { segments }
    }

    /// Return a new path with an array index appended.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// The parsed segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// True for the document root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first key segment, if the path starts with one.
    pub fn top_level_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// Key segments with every array index removed.
    pub fn registry_key(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Key(k) => Some(k.clone()),
                PathSegment::Index(_) => None,
            })
            .collect()
    }

    /// True if `self` equals `prefix` or lies underneath it.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Resolve the path inside a JSON document.
    ///
    /// Returns `None` when any step is missing or the types do not line up
    /// (a key against an array, an index against an object). `null` is a
    /// present value here; callers that treat `null` as absent must check.
    pub fn lookup<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut current = doc;
        for segment in &self.segments {
            current = match (segment, current) {
                (PathSegment::Key(k), Value::Object(map)) => map.get(k)?,
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at this path, creating intermediate objects.
    ///
    /// Index segments are not created; a path containing an index that does
    /// not already exist is left untouched and `false` is returned.
    pub fn insert(&self, doc: &mut Value, value: Value) -> bool {
        if self.segments.is_empty() {
            *doc = value;
            return true;
        }
        let mut current = doc;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Key(k) => {
                    if !current.is_object() {
                        *current = Value::Object(serde_json::Map::new());
                    }
                    match current {
                        Value::Object(map) => map.entry(k.clone()).or_insert(Value::Null),
                        _ => return false,
                    }
                }
                PathSegment::Index(i) => match current {
                    Value::Array(items) if *i < items.len() => &mut items[*i],
                    _ => return false,
                },
            };
        }
        *current = value;
        true
    }
}

impl TryFrom<String> for FieldPath {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::str::FromStr for FieldPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> String {
        path.to_string()
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(k) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
            first = false;
        }
        Ok(())
    }
}
