//! Field paths into a document payload
//!
//! A [`FieldPath`] names a value inside a document, e.g. `address.city` or
//! `tags[0]`. Paths are written the way the caller spells the fields; the
//! on-disk names come from applying a [`FieldNaming`](crate::FieldNaming)
//! rule to every key segment.
//!
//! Key segments are restricted to ASCII letters, digits, `_` and `-`. The
//! restriction is what allows a path to be rendered directly into SQL text.

use crate::error::Error;
use crate::limits::{LimitError, MAX_PATH_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error from parsing a path string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Path is empty
    #[error("field path is empty")]
    Empty,
    /// Empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid array index
    #[error("invalid array index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// Too many segments
    #[error(transparent)]
    TooLong(#[from] LimitError),
}

impl From<PathParseError> for Error {
    fn from(e: PathParseError) -> Self {
        match e {
            PathParseError::TooLong(limit) => Error::Limit(limit),
            other => Error::InvalidArgument(other.to_string()),
        }
    }
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object member access
    Key(String),
    /// Array element access
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Non-empty path into a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a path, e.g. `address.city` or `items[2].name`
    pub fn parse(s: &str) -> Result<Self, PathParseError> {
        s.parse()
    }

    /// Build a path from pre-validated key segments
    ///
    /// # Errors
    ///
    /// Fails if there are no keys or a key contains characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn from_keys<I, S>(keys: I) -> Result<Self, PathParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments = Vec::new();
        for (pos, key) in keys.into_iter().enumerate() {
            let key = key.into();
            if key.is_empty() {
                return Err(PathParseError::EmptyKey(pos));
            }
            if let Some(c) = key.chars().find(|c| !is_key_char(*c)) {
                return Err(PathParseError::UnexpectedChar(c, pos));
            }
            segments.push(PathSegment::Key(key));
        }
        Self::from_segments(segments)
    }

    fn from_segments(segments: Vec<PathSegment>) -> Result<Self, PathParseError> {
        if segments.is_empty() {
            return Err(PathParseError::Empty);
        }
        if segments.len() > MAX_PATH_LENGTH {
            return Err(LimitError::PathTooLong {
                length: segments.len(),
                max: MAX_PATH_LENGTH,
            }
            .into());
        }
        Ok(FieldPath { segments })
    }

    /// Path segments in order
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First index segment, if any
    pub fn first_index(&self) -> Option<usize> {
        self.segments.iter().find_map(|s| match s {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Key(_) => None,
        })
    }

    /// Key segments, or `None` if the path contains an index
    pub fn keys(&self) -> Option<Vec<&str>> {
        self.segments
            .iter()
            .map(|s| match s {
                PathSegment::Key(k) => Some(k.as_str()),
                PathSegment::Index(_) => None,
            })
            .collect()
    }

    /// Extend with another key segment
    pub fn child(&self, key: &str) -> Result<Self, PathParseError> {
        let mut next = self.clone();
        let tail = FieldPath::from_keys([key])?;
        next.segments.extend(tail.segments);
        Self::from_segments(next.segments)
    }

    /// Dotted string form
    pub fn to_path_string(&self) -> String {
        let mut result = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(k) => {
                    if i > 0 {
                        result.push('.');
                    }
                    result.push_str(k);
                }
                PathSegment::Index(idx) => {
                    result.push_str(&format!("[{}]", idx));
                }
            }
        }
        result
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    /// Supported syntax:
    /// - `foo` - object key
    /// - `foo.bar` - nested keys
    /// - `foo[0]` - key then index
    /// - `foo[0].bar` - mixed
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut segments = Vec::new();
        let chars: Vec<char> = s.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] == '.' {
                if segments.is_empty() {
                    return Err(PathParseError::EmptyKey(i));
                }
                i += 1;
                if i >= chars.len() || !is_key_char(chars[i]) {
                    return Err(PathParseError::EmptyKey(i));
                }
            }

            if chars[i] == '[' {
                let start = i;
                i += 1;
                let idx_start = i;

                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }

                if i >= chars.len() {
                    return Err(PathParseError::UnclosedBracket(start));
                }

                let idx_str: String = chars[idx_start..i].iter().collect();
                let idx = idx_str
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidIndex(idx_start, idx_str))?;

                segments.push(PathSegment::Index(idx));
                i += 1;
            } else if is_key_char(chars[i]) {
                if i > 0 && chars[i - 1] == ']' {
                    return Err(PathParseError::UnexpectedChar(chars[i], i));
                }
                let key_start = i;
                while i < chars.len() && is_key_char(chars[i]) {
                    i += 1;
                }
                let key: String = chars[key_start..i].iter().collect();
                segments.push(PathSegment::Key(key));
            } else {
                return Err(PathParseError::UnexpectedChar(chars[i], i));
            }
        }

        Self::from_segments(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path_string())
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}
