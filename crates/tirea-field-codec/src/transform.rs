//! Tree transformation.
//!
//! Walks a data tree and a field map in lock-step, renaming keys and
//! descending into nested rules. The algorithm is direction-agnostic: pass
//! a forward map to encode and its inverse to decode.

use crate::config::DEFAULT_TIMESTAMP_KEY;
use crate::tree::Object;
use crate::{
    AccessPath, CodecConfig, Diagnostic, DiagnosticSink, FieldMap, FieldRule, MapKind,
    NestedRules, NoopSink, Seg, Tree,
};

/// Transform `data` with `map`, discarding diagnostics.
///
/// # Examples
///
/// ```
/// use tirea_field_codec::{transform_object, tree, FieldMap};
/// use serde_json::json;
///
/// let map = FieldMap::from_json(&json!({
///     "name": "n",
///     "address": "a",
///     "address_obj": {"street": "s", "city": "c"}
/// }))
/// .unwrap();
///
/// let out = transform_object(
///     &tree!({"name": "Alice", "address": {"street": "Main", "city": "NYC"}}),
///     &map,
/// );
/// assert_eq!(out, tree!({"n": "Alice", "a": {"s": "Main", "c": "NYC"}}));
/// ```
pub fn transform_object(data: &Tree, map: &FieldMap) -> Tree {
    Transformer::default().transform(data, map)
}

/// Applies field maps to trees and paths.
///
/// Holds the diagnostic sink and the unmapped key that is dropped silently.
/// Cheap to construct per call.
#[derive(Clone, Copy)]
pub struct Transformer<'a> {
    sink: &'a dyn DiagnosticSink,
    timestamp_key: Option<&'a str>,
}

impl Default for Transformer<'static> {
    fn default() -> Self {
        Self {
            sink: &NoopSink,
            timestamp_key: Some(DEFAULT_TIMESTAMP_KEY),
        }
    }
}

impl<'a> Transformer<'a> {
    pub fn new(config: &'a CodecConfig, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            sink,
            timestamp_key: config.timestamp_key.as_deref(),
        }
    }

    /// Transform `data` with `map`.
    ///
    /// Anything that is not an object, the delete marker included, is
    /// returned unchanged.
    pub fn transform(&self, data: &Tree, map: &FieldMap) -> Tree {
        self.transform_at(data, map, &Frame::Root)
    }

    fn transform_at(&self, data: &Tree, map: &FieldMap, at: &Frame<'_>) -> Tree {
        let input = match data {
            Tree::Object(o) => o,
            other => return other.clone(),
        };

        let mut out = Object::with_capacity(input.len());
        match map.kind() {
            MapKind::Dictionary(inner) => {
                for (key, value) in input {
                    out.insert(key.clone(), self.transform_at(value, inner, &at.key(key)));
                }
            }
            MapKind::Fields(rules) => {
                for (key, value) in input {
                    // A renamed field already claimed this key.
                    if out.contains_key(key) {
                        continue;
                    }
                    match rules.get(key) {
                        None => {
                            if self.timestamp_key == Some(key.as_str()) {
                                continue;
                            }
                            self.sink.report(&Diagnostic::SchemaDrift {
                                path: at.to_path(),
                                key: key.clone(),
                            });
                            out.insert(key.clone(), value.clone());
                        }
                        Some(FieldRule::Drop) => {}
                        Some(FieldRule::Rename(target)) => {
                            out.insert(target.clone(), value.clone());
                        }
                        Some(FieldRule::RenameWithNested(target, nested)) => {
                            if let Some(v) = self.rewrite_nested(key, value, nested, &at.key(key)) {
                                out.insert(target.clone(), v);
                            }
                        }
                    }
                }
            }
        }
        Tree::Object(out)
    }

    /// Apply the first nested rule matching the value's shape.
    ///
    /// `None` means the field disappears: its value table has no entry.
    fn rewrite_nested(
        &self,
        key: &str,
        value: &Tree,
        nested: &NestedRules,
        at: &Frame<'_>,
    ) -> Option<Tree> {
        if matches!(value, Tree::Null | Tree::Delete) {
            return Some(value.clone());
        }
        // Tables are indexed by the field's key, not by the value.
        if let Some(table) = &nested.values {
            return table.get(key).map(Tree::from);
        }
        Some(match (value, nested) {
            (Tree::Array(items), NestedRules { array: Some(m), .. }) => Tree::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.transform_at(item, m, &at.index(i)))
                    .collect(),
            ),
            (Tree::Object(_), NestedRules { object: Some(m), .. }) => {
                self.transform_at(value, m, at)
            }
            (Tree::Object(entries), NestedRules { dictionary: Some(m), .. }) => Tree::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.transform_at(v, m, &at.key(k))))
                    .collect(),
            ),
            _ => value.clone(),
        })
    }
}

impl std::fmt::Debug for Transformer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("timestamp_key", &self.timestamp_key)
            .finish_non_exhaustive()
    }
}

/// Location of the node being transformed, materialised only when a
/// diagnostic needs it.
enum Frame<'p> {
    Root,
    Key(&'p Frame<'p>, &'p str),
    Index(&'p Frame<'p>, usize),
}

impl<'p> Frame<'p> {
    fn key(&'p self, key: &'p str) -> Frame<'p> {
        Frame::Key(self, key)
    }

    fn index(&'p self, index: usize) -> Frame<'p> {
        Frame::Index(self, index)
    }

    fn to_path(&self) -> AccessPath {
        let mut segs = Vec::new();
        let mut frame = self;
        loop {
            match frame {
                Frame::Root => break,
                Frame::Key(parent, key) => {
                    segs.push(Seg::key(*key));
                    frame = *parent;
                }
                Frame::Index(parent, index) => {
                    segs.push(Seg::Index(*index));
                    frame = *parent;
                }
            }
        }
        segs.into_iter().rev().collect()
    }
}
