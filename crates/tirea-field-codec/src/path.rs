//! Access paths addressing a single field inside a data tree.
//!
//! An access path is what the reactive layer hands over when one field
//! changes. The codec relocates it into the compact shape so a partial
//! update can be written without transforming the whole document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single segment of an [`AccessPath`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Object key: a schema field name or a dictionary key.
    Key(String),
    /// Position inside an array.
    Index(usize),
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Create an index segment.
    #[inline]
    pub fn index(i: usize) -> Self {
        Seg::Index(i)
    }

}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, ".{}", k),
            Seg::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// Ordered sequence of segments identifying one field in a tree.
///
/// # Examples
///
/// ```
/// use tirea_field_codec::{path, AccessPath};
///
/// let p = AccessPath::root().key("address").key("street");
/// assert_eq!(p, path!("address", "street"));
/// assert_eq!(p.to_string(), "$.address.street");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccessPath(Vec<Seg>);

impl AccessPath {
    /// Create an empty path addressing the tree root.
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Append a key segment (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Copy of the first `len` segments.
    pub fn prefix(&self, len: usize) -> AccessPath {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.0 {
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromIterator<Seg> for AccessPath {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        AccessPath(iter.into_iter().collect())
    }
}

impl IntoIterator for AccessPath {
    type Item = Seg;
    type IntoIter = std::vec::IntoIter<Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AccessPath {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for AccessPath {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct an [`AccessPath`] from a sequence of segments.
///
/// String literals become key segments, integers become index segments.
///
/// ```
/// use tirea_field_codec::{path, Seg};
///
/// let p = path!("items", 2, "name");
/// assert_eq!(p[1], Seg::Index(2));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::AccessPath::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::AccessPath::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = AccessPath::root().key("users").index(0).key("name");
        assert_eq!(format!("{}", path), "$.users[0].name");
        assert_eq!(AccessPath::root().to_string(), "$");
    }

    #[test]
    fn test_path_macro_mixes_keys_and_indices() {
        let p = path!("users", 0, "name");
        assert_eq!(p.len(), 3);
        assert_eq!(p[0], Seg::Key("users".into()));
        assert_eq!(p[1], Seg::Index(0));
        assert_eq!(p[2], Seg::Key("name".into()));
    }

    #[test]
    fn test_prefix_clamps_to_length() {
        let p = path!("a", "b", "c");
        assert_eq!(p.prefix(2), path!("a", "b"));
        assert_eq!(p.prefix(10), p);
    }

    #[test]
    fn test_path_serde() {
        let path = path!("users", 0, "name");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"["users",0,"name"]"#);
        let parsed: AccessPath = serde_json::from_str(&json).unwrap();
        assert_eq!(path, parsed);
    }
}
