//! Data trees transformed by the codec.
//!
//! A [`Tree`] is a JSON document that can additionally carry the delete
//! marker, the sentinel recording that a field was explicitly removed.
//! Objects keep insertion order so transformed output follows the order in
//! which input keys were processed.

use crate::{AccessPath, CodecError, Seg};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// Ordered object node of a [`Tree`].
pub type Object = IndexMap<String, Tree>;

/// The delete marker.
pub const DELETE: Tree = Tree::Delete;

/// Arbitrary nested value handled by the codec.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Tree {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Tree>),
    Object(Object),
    /// Field was explicitly removed. Passed through every transform verbatim.
    Delete,
}

impl Tree {
    #[inline]
    pub fn is_delete(&self) -> bool {
        matches!(self, Tree::Delete)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Null)
    }

    #[inline]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Tree::Object(o) => Some(o),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key of an object node.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Tree> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Follow `path` from this node.
    pub fn get_path(&self, path: &AccessPath) -> Option<&Tree> {
        path.iter().try_fold(self, |node, seg| match (seg, node) {
            (Seg::Key(k), Tree::Object(o)) => o.get(k),
            (Seg::Index(i), Tree::Array(a)) => a.get(*i),
            _ => None,
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Bool(_) => "boolean",
            Tree::Number(_) => "number",
            Tree::String(_) => "string",
            Tree::Array(_) => "array",
            Tree::Object(_) => "object",
            Tree::Delete => "delete",
        }
    }
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(b),
            Value::Number(n) => Tree::Number(n),
            Value::String(s) => Tree::String(s),
            Value::Array(a) => Tree::Array(a.into_iter().map(Tree::from).collect()),
            Value::Object(o) => Tree::Object(o.into_iter().map(|(k, v)| (k, Tree::from(v))).collect()),
        }
    }
}

impl From<&Value> for Tree {
    fn from(value: &Value) -> Self {
        Tree::from(value.clone())
    }
}

impl From<Object> for Tree {
    fn from(o: Object) -> Self {
        Tree::Object(o)
    }
}

impl TryFrom<Tree> for Value {
    type Error = CodecError;

    /// Fails if the tree contains a delete marker anywhere.
    fn try_from(tree: Tree) -> Result<Self, Self::Error> {
        into_value(tree).map_err(|mut rev| {
            rev.reverse();
            CodecError::delete_marker(rev.into_iter().collect())
        })
    }
}

// Error path is collected leaf-first while unwinding.
fn into_value(tree: Tree) -> Result<Value, Vec<Seg>> {
    Ok(match tree {
        Tree::Null => Value::Null,
        Tree::Bool(b) => Value::Bool(b),
        Tree::Number(n) => Value::Number(n),
        Tree::String(s) => Value::String(s),
        Tree::Array(a) => Value::Array(
            a.into_iter()
                .enumerate()
                .map(|(i, t)| {
                    into_value(t).map_err(|mut rev| {
                        rev.push(Seg::Index(i));
                        rev
                    })
                })
                .collect::<Result<_, _>>()?,
        ),
        Tree::Object(o) => Value::Object(
            o.into_iter()
                .map(|(k, t)| match into_value(t) {
                    Ok(v) => Ok((k, v)),
                    Err(mut rev) => {
                        rev.push(Seg::Key(k));
                        Err(rev)
                    }
                })
                .collect::<Result<_, _>>()?,
        ),
        Tree::Delete => return Err(Vec::new()),
    })
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tree::Null => serializer.serialize_unit(),
            Tree::Bool(b) => serializer.serialize_bool(*b),
            Tree::Number(n) => n.serialize(serializer),
            Tree::String(s) => serializer.serialize_str(s),
            Tree::Array(a) => a.serialize(serializer),
            Tree::Object(o) => o.serialize(serializer),
            Tree::Delete => Err(serde::ser::Error::custom(
                "delete marker cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Tree::from)
    }
}

/// Build a [`Tree`] using `serde_json::json!` syntax.
///
/// ```
/// use tirea_field_codec::{tree, Tree};
///
/// let t = tree!({"name": "Alice", "tags": ["a", "b"]});
/// assert_eq!(t.get("name").and_then(Tree::as_str), Some("Alice"));
/// ```
#[macro_export]
macro_rules! tree {
    ($($json:tt)+) => {
        $crate::Tree::from($crate::__private::serde_json::json!($($json)+))
    };
}
