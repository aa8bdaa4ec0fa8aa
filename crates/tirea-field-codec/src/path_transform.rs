//! Relocating access paths through a field map.
//!
//! Rather than re-deriving renames from the map, a skeleton tree with a
//! single branch along the path is built, run through the regular tree
//! transformer, and read back. Paths therefore resolve through nested,
//! array and dictionary rules exactly like full documents do.

use crate::tree::Object;
use crate::{AccessPath, CodecError, CodecResult, FieldMap, Seg, Transformer, Tree};

/// A field value together with its location, after transformation.
#[derive(Clone, Debug, PartialEq)]
pub struct PathValue {
    pub path: AccessPath,
    pub value: Tree,
}

/// Relocate `path` through `map`, discarding diagnostics.
///
/// ```
/// use tirea_field_codec::{path, transform_path, FieldMap};
/// use serde_json::json;
///
/// let map = FieldMap::from_json(&json!({
///     "name": "n",
///     "address": "a",
///     "address_obj": {"street": "s", "city": "c"}
/// }))
/// .unwrap();
///
/// assert_eq!(transform_path(&path!("address", "street"), &map).unwrap(), path!("a", "s"));
/// ```
pub fn transform_path(path: &AccessPath, map: &FieldMap) -> CodecResult<AccessPath> {
    Transformer::default().transform_path(path, map)
}

/// Transform a single field `value` living at `path`, returning both its
/// relocated path and transformed value.
pub fn transform_with_path(
    value: &Tree,
    path: &AccessPath,
    map: &FieldMap,
) -> CodecResult<PathValue> {
    Transformer::default().transform_with_path(value, path, map)
}

impl Transformer<'_> {
    /// Relocate `path` through `map`.
    ///
    /// The result has the same length as `path`. Index segments are kept.
    pub fn transform_path(&self, path: &AccessPath, map: &FieldMap) -> CodecResult<AccessPath> {
        // A null leaf only observes renames; value rules never fire on null.
        self.transform_with_path(&Tree::Null, path, map)
            .map(|found| found.path)
    }

    /// Transform `value` as if it were stored at `path` in a full tree.
    pub fn transform_with_path(
        &self,
        value: &Tree,
        path: &AccessPath,
        map: &FieldMap,
    ) -> CodecResult<PathValue> {
        let transformed = self.transform(&skeleton(path, value.clone()), map);
        follow_branch(transformed, path)
    }
}

/// Tree with exactly one branch following `path`, `leaf` at its end.
/// Index segments become one-element arrays; the position is taken from
/// `path` again when the branch is followed.
fn skeleton(path: &AccessPath, leaf: Tree) -> Tree {
    path.iter().rev().fold(leaf, |child, seg| match seg {
        Seg::Key(k) => {
            let mut obj = Object::with_capacity(1);
            obj.insert(k.clone(), child);
            Tree::Object(obj)
        }
        Seg::Index(_) => Tree::Array(vec![child]),
    })
}

fn follow_branch(tree: Tree, path: &AccessPath) -> CodecResult<PathValue> {
    let mut out = AccessPath::with_capacity(path.len());
    let mut node = tree;

    for (depth, seg) in path.iter().enumerate() {
        let missing = || CodecError::path_not_transformable(path.clone(), depth);
        node = match (seg, node) {
            (Seg::Key(_), Tree::Object(obj)) if obj.len() == 1 => {
                let (key, child) = obj.into_iter().next().ok_or_else(missing)?;
                out.push(Seg::Key(key));
                child
            }
            (Seg::Index(i), Tree::Array(items)) if items.len() == 1 => {
                let child = items.into_iter().next().ok_or_else(missing)?;
                out.push(Seg::Index(*i));
                child
            }
            _ => return Err(missing()),
        };
    }

    Ok(PathValue { path: out, value: node })
}
