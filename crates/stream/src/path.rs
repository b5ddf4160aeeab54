use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A path as it appears in the send stream: an arbitrary byte string
/// relative to the subvolume root. Filesystems permit non-UTF-8 names,
/// so conversion to `String` is lossy and happens only at the output
/// boundary. Ordering is plain byte-wise comparison.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamPath(Box<[u8]>);

impl StreamPath {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Does this path live under `dir` (strictly below, not equal)?
    pub fn is_under(&self, dir: &StreamPath) -> bool {
        self.0.len() > dir.0.len() + 1
            && self.0.starts_with(&dir.0)
            && self.0[dir.0.len()] == b'/'
    }

    /// Replace the leading `from` component(s) with `to`. Caller must
    /// have checked `is_under(from)`.
    pub fn rebase(&self, from: &StreamPath, to: &StreamPath) -> StreamPath {
        let mut out = Vec::with_capacity(to.0.len() + (self.0.len() - from.0.len()));
        out.extend_from_slice(&to.0);
        out.extend_from_slice(&self.0[from.0.len()..]);
        StreamPath::new(out)
    }

    pub fn to_lossy_string(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Display for StreamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&String::from_utf8_lossy(&self.0), f)
    }
}

impl fmt::Debug for StreamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for StreamPath {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().into())
    }
}

impl From<&[u8]> for StreamPath {
    fn from(b: &[u8]) -> Self {
        Self(b.into())
    }
}

impl From<Vec<u8>> for StreamPath {
    fn from(b: Vec<u8>) -> Self {
        Self(b.into())
    }
}

impl Borrow<[u8]> for StreamPath {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for StreamPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

impl<'de> Deserialize<'de> for StreamPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(StreamPath::new(s.into_bytes()))
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
