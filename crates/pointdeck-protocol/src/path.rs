//! Tree paths: validated locations in the shared state tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Characters that may not appear inside a path segment.
///
/// The store addresses nodes by `/`-joined keys, so `/` is structural;
/// the remaining characters are reserved for future query syntax and
/// rejected outright rather than escaped.
const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

/// A validated path into the state tree, e.g. `rooms/a1b2c3d4/participants`.
///
/// A `StorePath` is a non-empty sequence of non-empty segments. Validation
/// happens once, at construction — everything downstream (the store, the
/// wire protocol) can treat the segments as opaque keys.
///
/// Serialized as a plain string on the wire; deserialization re-validates,
/// so a malformed path from a remote peer is rejected at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath {
    raw: String,
}

impl StorePath {
    /// Parses and validates a `/`-joined path.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidPath`] when the path is empty, has
    /// an empty segment (leading, trailing, or doubled `/`), or a segment
    /// contains a forbidden or control character.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        if raw.is_empty() {
            return Err(ProtocolError::InvalidPath("empty path".into()));
        }
        for segment in raw.split('/') {
            validate_segment(segment)?;
        }
        Ok(Self { raw: raw.to_string() })
    }

    /// Returns the path extended by one child segment.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidPath`] when the segment is empty or
    /// contains `/` or a forbidden character.
    pub fn child(&self, segment: &str) -> Result<Self, ProtocolError> {
        validate_segment(segment)?;
        Ok(Self {
            raw: format!("{}/{segment}", self.raw),
        })
    }

    /// The segments of this path, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('/')
    }

    /// The final segment (the node's own key).
    pub fn key(&self) -> &str {
        // A StorePath always has at least one segment.
        self.raw.rsplit('/').next().unwrap_or(&self.raw)
    }

    /// Segment-wise prefix test: `true` when `self` names `other` or one
    /// of its ancestors. `rooms/a` is a prefix of `rooms/a/presence`, but
    /// not of `rooms/ab`.
    pub fn is_prefix_of(&self, other: &StorePath) -> bool {
        let mut mine = self.segments();
        let mut theirs = other.segments();
        loop {
            match (mine.next(), theirs.next()) {
                (None, _) => return true,
                (Some(_), None) => return false,
                (Some(a), Some(b)) if a == b => continue,
                _ => return false,
            }
        }
    }

    /// `true` when a write at `written` is visible from a subscription at
    /// `self`: either path names an ancestor of the other (or they are
    /// equal).
    pub fn overlaps(&self, written: &StorePath) -> bool {
        self.is_prefix_of(written) || written.is_prefix_of(self)
    }

    /// The raw `/`-joined form.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn validate_segment(segment: &str) -> Result<(), ProtocolError> {
    if segment.is_empty() {
        return Err(ProtocolError::InvalidPath("empty segment".into()));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| *c == '/' || c.is_control() || FORBIDDEN.contains(c))
    {
        return Err(ProtocolError::InvalidPath(format!(
            "segment {segment:?} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for StorePath {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<StorePath> for String {
    fn from(path: StorePath) -> Self {
        path.raw
    }
}
