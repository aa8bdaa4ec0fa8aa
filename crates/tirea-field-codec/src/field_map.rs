//! Field maps: schema-level descriptions of how keys are renamed.
//!
//! A [`FieldMap`] maps verbose field names to compact ones. Each entry is a
//! [`FieldRule`]; a renamed field may also carry [`NestedRules`] describing
//! how its value is rewritten depending on its shape. A map may instead be
//! a dictionary map, whose keys are data rather than schema.
//!
//! Maps are usually authored as JSON in the suffix notation used by the
//! persistence configuration:
//!
//! ```text
//! {
//!   "name": "n",
//!   "address": "a",
//!   "address_obj": { "street": "s", "city": "c" },
//!   "tags_arr": { "label": "l" },
//!   "scores_dict": { "value": "v" },
//!   "status_val": { "status": "archived" },
//!   "legacy": null
//! }
//! ```
//!
//! A suffixed key is a nested rule only when its value is an object;
//! `"min_val": "mv"` is a plain rename of the `min_val` field. The
//! suffixes are interpreted once, in [`FieldMap::from_json`]; everything
//! downstream works on the typed rules.

use crate::error::value_type_name;
use crate::{path, AccessPath, CodecError, CodecResult, Diagnostic};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Reserved key of a dictionary map in the authoring notation.
pub const DICT_KEY: &str = "_dict";

const SUFFIX_OBJ: &str = "_obj";
const SUFFIX_ARR: &str = "_arr";
const SUFFIX_DICT: &str = "_dict";
const SUFFIX_VAL: &str = "_val";

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`FieldMap`], assigned at construction.
///
/// Clones share the identity of their source; they describe the same
/// schema and therefore the same inverse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapId(u64);

impl MapId {
    fn next() -> Self {
        MapId(NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

/// One nested rule, as written under a suffixed key.
#[derive(Clone, Debug, PartialEq)]
pub enum NestedKind {
    /// `_obj`: an object value is transformed with the inner map.
    Object(Arc<FieldMap>),
    /// `_arr`: every element of an array value is transformed with the
    /// inner map.
    Array(Arc<FieldMap>),
    /// `_dict`: an object value with dynamic keys; each value is
    /// transformed with the inner map and keys are kept.
    Dictionary(Arc<FieldMap>),
    /// `_val`: the value is replaced by the table entry stored under the
    /// field's original key.
    ValueTable(Map<String, Value>),
}

/// Nested rules attached to one renamed field.
///
/// A field may carry several of them. They are consulted in this order and
/// the first one that applies wins:
///
/// 1. `values`, for any non-null value
/// 2. `array`, if the value is an array
/// 3. `object`, if the value is an object
/// 4. `dictionary`, if the value is an object
///
/// A value no rule applies to is kept as is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NestedRules {
    pub values: Option<Map<String, Value>>,
    pub array: Option<Arc<FieldMap>>,
    pub object: Option<Arc<FieldMap>>,
    pub dictionary: Option<Arc<FieldMap>>,
}

impl NestedRules {
    /// Add `kind`, replacing an earlier rule of the same kind.
    pub fn insert(&mut self, kind: NestedKind) {
        match kind {
            NestedKind::Object(m) => self.object = Some(m),
            NestedKind::Array(m) => self.array = Some(m),
            NestedKind::Dictionary(m) => self.dictionary = Some(m),
            NestedKind::ValueTable(t) => self.values = Some(t),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_none()
            && self.array.is_none()
            && self.object.is_none()
            && self.dictionary.is_none()
    }

    /// Inner maps in dispatch order.
    pub fn maps(&self) -> impl Iterator<Item = &Arc<FieldMap>> {
        [&self.array, &self.object, &self.dictionary]
            .into_iter()
            .flatten()
    }
}

impl From<NestedKind> for NestedRules {
    fn from(kind: NestedKind) -> Self {
        let mut rules = NestedRules::default();
        rules.insert(kind);
        rules
    }
}

/// What happens to one field of a [`FieldMap`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldRule {
    /// Rename the key; the value is kept.
    Rename(String),
    /// Remove the field from the output.
    Drop,
    /// Rename the key and rewrite the nested value.
    RenameWithNested(String, NestedRules),
}

impl FieldRule {
    /// Target key, or `None` for [`FieldRule::Drop`].
    pub fn target(&self) -> Option<&str> {
        match self {
            FieldRule::Rename(t) | FieldRule::RenameWithNested(t, _) => Some(t),
            FieldRule::Drop => None,
        }
    }

    pub fn nested(&self) -> Option<&NestedRules> {
        match self {
            FieldRule::RenameWithNested(_, n) => Some(n),
            _ => None,
        }
    }
}

/// Shape of a [`FieldMap`].
#[derive(Clone, Debug, PartialEq)]
pub enum MapKind {
    /// Keys are schema fields, each with its own rule.
    Fields(IndexMap<String, FieldRule>),
    /// Keys are data; every value is transformed with the inner map.
    Dictionary(Arc<FieldMap>),
}

/// Immutable field map with a stable identity.
///
/// # Examples
///
/// ```
/// use tirea_field_codec::FieldMap;
/// use serde_json::json;
///
/// let built = FieldMap::builder()
///     .rename("name", "n")
///     .object("address", "a", FieldMap::builder().rename("street", "s").build())
///     .build();
///
/// let authored = FieldMap::from_json(&json!({
///     "name": "n",
///     "address": "a",
///     "address_obj": {"street": "s"}
/// }))
/// .unwrap();
///
/// assert_eq!(built, authored);
/// assert_ne!(built.id(), authored.id());
/// ```
#[derive(Clone, Debug)]
pub struct FieldMap {
    id: MapId,
    kind: MapKind,
}

impl PartialEq for FieldMap {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl FieldMap {
    pub fn builder() -> FieldMapBuilder {
        FieldMapBuilder::default()
    }

    /// Map built from rules in authoring order.
    pub fn from_rules(rules: IndexMap<String, FieldRule>) -> Self {
        Self::from_kind(MapKind::Fields(rules))
    }

    /// Dictionary map: keys are preserved, values use `inner`.
    pub fn dictionary(inner: impl Into<Arc<FieldMap>>) -> Self {
        Self::from_kind(MapKind::Dictionary(inner.into()))
    }

    fn from_kind(kind: MapKind) -> Self {
        Self {
            id: MapId::next(),
            kind,
        }
    }

    #[inline]
    pub fn id(&self) -> MapId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &MapKind {
        &self.kind
    }

    #[inline]
    pub fn is_dictionary(&self) -> bool {
        matches!(self.kind, MapKind::Dictionary(_))
    }

    /// Rule for `key`. Always `None` for dictionary maps.
    #[inline]
    pub fn rule(&self, key: &str) -> Option<&FieldRule> {
        match &self.kind {
            MapKind::Fields(rules) => rules.get(key),
            MapKind::Dictionary(_) => None,
        }
    }

    /// Rules in authoring order. Empty for dictionary maps.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        let rules = match &self.kind {
            MapKind::Fields(rules) => Some(rules),
            MapKind::Dictionary(_) => None,
        };
        rules
            .into_iter()
            .flat_map(|r| r.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Parse a map written in the suffix notation.
    pub fn from_json(value: &Value) -> CodecResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            CodecError::invalid_field_map(
                AccessPath::root(),
                format!("expected object, found {}", value_type_name(value)),
            )
        })?;

        if let Some(inner) = obj.get(DICT_KEY) {
            if obj.len() != 1 {
                return Err(CodecError::invalid_field_map(
                    path!(DICT_KEY),
                    "`_dict` must be the only entry of a dictionary map",
                ));
            }
            let inner = FieldMap::from_json(inner).map_err(|e| e.with_prefix(&path!(DICT_KEY)))?;
            return Ok(FieldMap::dictionary(inner));
        }

        let mut rules: IndexMap<String, FieldRule> = IndexMap::with_capacity(obj.len());
        let mut nested: Vec<(&str, NestedKind)> = Vec::new();

        for (key, entry) in obj {
            if let (Some((base, suffix)), Value::Object(table)) = (split_suffix(key), entry) {
                let kind =
                    parse_nested(suffix, table).map_err(|e| e.with_prefix(&path!(key.as_str())))?;
                nested.push((base, kind));
                continue;
            }
            let rule = match entry {
                Value::String(target) => FieldRule::Rename(target.clone()),
                Value::Null => FieldRule::Drop,
                other => {
                    return Err(CodecError::invalid_field_map(
                        path!(key.as_str()),
                        format!("expected string or null, found {}", value_type_name(other)),
                    ))
                }
            };
            rules.insert(key.clone(), rule);
        }

        // Suffix entries may appear before their base key.
        for (base, kind) in nested {
            match rules.get_mut(base) {
                Some(FieldRule::Drop) => {}
                Some(FieldRule::RenameWithNested(_, existing)) => existing.insert(kind),
                Some(rule) => {
                    let target = rule.target().unwrap_or(base).to_string();
                    *rule = FieldRule::RenameWithNested(target, kind.into());
                }
                None => {
                    rules.insert(
                        base.to_string(),
                        FieldRule::RenameWithNested(base.to_string(), kind.into()),
                    );
                }
            }
        }

        Ok(FieldMap::from_rules(rules))
    }

    /// Render the map in the suffix notation accepted by [`FieldMap::from_json`].
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        match &self.kind {
            MapKind::Dictionary(inner) => {
                out.insert(DICT_KEY.to_string(), inner.to_json());
            }
            MapKind::Fields(rules) => {
                for (key, rule) in rules {
                    match rule {
                        FieldRule::Rename(target) => {
                            out.insert(key.clone(), Value::String(target.clone()));
                        }
                        FieldRule::Drop => {
                            out.insert(key.clone(), Value::Null);
                        }
                        FieldRule::RenameWithNested(target, nested) => {
                            out.insert(key.clone(), Value::String(target.clone()));
                            if let Some(table) = &nested.values {
                                out.insert(
                                    format!("{}{}", key, SUFFIX_VAL),
                                    Value::Object(table.clone()),
                                );
                            }
                            for (suffix, inner) in [
                                (SUFFIX_ARR, &nested.array),
                                (SUFFIX_OBJ, &nested.object),
                                (SUFFIX_DICT, &nested.dictionary),
                            ] {
                                if let Some(inner) = inner {
                                    out.insert(format!("{}{}", key, suffix), inner.to_json());
                                }
                            }
                        }
                    }
                }
            }
        }
        Value::Object(out)
    }

    /// Report target keys claimed by more than one source key, at every
    /// nesting level.
    ///
    /// A map with duplicates cannot be inverted losslessly.
    pub fn find_duplicates(&self) -> Vec<Diagnostic> {
        let mut found = Vec::new();
        self.collect_duplicates(&mut found);
        found
    }

    fn collect_duplicates(&self, found: &mut Vec<Diagnostic>) {
        let rules = match &self.kind {
            MapKind::Dictionary(inner) => return inner.collect_duplicates(found),
            MapKind::Fields(rules) => rules,
        };

        let mut owners: HashMap<&str, &str> = HashMap::with_capacity(rules.len());
        for (key, rule) in rules {
            if let Some(target) = rule.target() {
                if let Some(previous) = owners.insert(target, key) {
                    found.push(Diagnostic::DuplicateMapping {
                        compact_key: target.to_string(),
                        previous: previous.to_string(),
                        replacement: key.clone(),
                    });
                }
            }
            for inner in rule.nested().into_iter().flat_map(NestedRules::maps) {
                inner.collect_duplicates(found);
            }
        }
    }
}

fn split_suffix(key: &str) -> Option<(&str, &str)> {
    [SUFFIX_OBJ, SUFFIX_ARR, SUFFIX_DICT, SUFFIX_VAL]
        .into_iter()
        .find_map(|suffix| {
            key.strip_suffix(suffix)
                .filter(|base| !base.is_empty())
                .map(|base| (base, suffix))
        })
}

fn parse_nested(suffix: &str, table: &Map<String, Value>) -> CodecResult<NestedKind> {
    if suffix == SUFFIX_VAL {
        return Ok(NestedKind::ValueTable(table.clone()));
    }
    let inner = Arc::new(FieldMap::from_json(&Value::Object(table.clone()))?);
    Ok(match suffix {
        SUFFIX_OBJ => NestedKind::Object(inner),
        SUFFIX_ARR => NestedKind::Array(inner),
        _ => NestedKind::Dictionary(inner),
    })
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FieldMap::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Builder for [`FieldMap`].
#[derive(Debug, Default)]
pub struct FieldMapBuilder {
    rules: IndexMap<String, FieldRule>,
}

impl FieldMapBuilder {
    /// Set the rule for `key`, replacing any earlier one.
    #[must_use]
    pub fn rule(mut self, key: impl Into<String>, rule: FieldRule) -> Self {
        self.rules.insert(key.into(), rule);
        self
    }

    #[must_use]
    pub fn rename(self, key: impl Into<String>, target: impl Into<String>) -> Self {
        self.rule(key, FieldRule::Rename(target.into()))
    }

    #[must_use]
    pub fn drop(self, key: impl Into<String>) -> Self {
        self.rule(key, FieldRule::Drop)
    }

    #[must_use]
    pub fn object(
        self,
        key: impl Into<String>,
        target: impl Into<String>,
        map: impl Into<Arc<FieldMap>>,
    ) -> Self {
        self.nested(key, target, NestedKind::Object(map.into()))
    }

    #[must_use]
    pub fn array(
        self,
        key: impl Into<String>,
        target: impl Into<String>,
        map: impl Into<Arc<FieldMap>>,
    ) -> Self {
        self.nested(key, target, NestedKind::Array(map.into()))
    }

    #[must_use]
    pub fn dictionary(
        self,
        key: impl Into<String>,
        target: impl Into<String>,
        map: impl Into<Arc<FieldMap>>,
    ) -> Self {
        self.nested(key, target, NestedKind::Dictionary(map.into()))
    }

    #[must_use]
    pub fn values(
        self,
        key: impl Into<String>,
        target: impl Into<String>,
        table: Map<String, Value>,
    ) -> Self {
        self.nested(key, target, NestedKind::ValueTable(table))
    }

    /// Adds to the nested rules already set for `key`; the target of the
    /// latest call wins.
    fn nested(mut self, key: impl Into<String>, target: impl Into<String>, kind: NestedKind) -> Self {
        let key = key.into();
        let target = target.into();
        match self.rules.get_mut(&key) {
            Some(FieldRule::RenameWithNested(existing, nested)) => {
                *existing = target;
                nested.insert(kind);
            }
            _ => {
                self.rules
                    .insert(key, FieldRule::RenameWithNested(target, kind.into()));
            }
        }
        self
    }

    pub fn build(self) -> FieldMap {
        FieldMap::from_rules(self.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_plain_rules() {
        let map = FieldMap::from_json(&json!({"name": "n", "legacy": null})).unwrap();
        assert_eq!(map.rule("name"), Some(&FieldRule::Rename("n".into())));
        assert_eq!(map.rule("legacy"), Some(&FieldRule::Drop));
        assert_eq!(map.rule("other"), None);
    }

    #[test]
    fn test_from_json_attaches_suffix_rules() {
        let map = FieldMap::from_json(&json!({
            "tags_arr": {"label": "l"},
            "tags": "t",
            "scores_dict": {"value": "v"},
            "scores": "s",
            "status": "st",
            "status_val": {"status": "archived"}
        }))
        .unwrap();

        let tags = map.rule("tags").unwrap();
        assert_eq!(tags.target(), Some("t"));
        assert!(tags.nested().unwrap().array.is_some());
        assert!(map.rule("scores").unwrap().nested().unwrap().dictionary.is_some());
        let table = map.rule("status").unwrap().nested().unwrap().values.as_ref();
        assert_eq!(table.unwrap()["status"], json!("archived"));
        assert!(map.rule("tags_arr").is_none());
    }

    #[test]
    fn test_several_nested_rules_on_one_field() {
        let map = FieldMap::from_json(&json!({
            "v": "x",
            "v_arr": {"a": "b"},
            "v_obj": {"a": "c"},
            "v_dict": {"a": "d"},
            "v_val": {"v": 1}
        }))
        .unwrap();

        let nested = map.rule("v").unwrap().nested().unwrap();
        assert_eq!(map.rule("v").unwrap().target(), Some("x"));
        assert!(nested.values.is_some());
        assert_eq!(nested.maps().count(), 3);
        assert_eq!(nested.array.as_ref().unwrap().rule("a").unwrap().target(), Some("b"));
        assert_eq!(nested.object.as_ref().unwrap().rule("a").unwrap().target(), Some("c"));
    }

    #[test]
    fn test_suffixed_key_with_plain_value_is_a_field() {
        let map = FieldMap::from_json(&json!({
            "min_val": "mv",
            "raw_obj": null,
            "max": "mx",
            "max_val": {"max": 10}
        }))
        .unwrap();
        assert_eq!(map.rule("min_val"), Some(&FieldRule::Rename("mv".into())));
        assert_eq!(map.rule("raw_obj"), Some(&FieldRule::Drop));
        assert!(map.rule("min").is_none());
        assert!(map.rule("max").unwrap().nested().unwrap().values.is_some());
    }

    #[test]
    fn test_suffix_without_base_keeps_name() {
        let map = FieldMap::from_json(&json!({"address_obj": {"street": "s"}})).unwrap();
        assert_eq!(map.rule("address").unwrap().target(), Some("address"));
    }

    #[test]
    fn test_suffix_on_dropped_field_stays_dropped() {
        let map = FieldMap::from_json(&json!({"old": null, "old_obj": {"a": "b"}})).unwrap();
        assert_eq!(map.rule("old"), Some(&FieldRule::Drop));
    }

    #[test]
    fn test_dictionary_map() {
        let map = FieldMap::from_json(&json!({"_dict": {"v": "val"}})).unwrap();
        assert!(map.is_dictionary());
        assert_eq!(map.rules().count(), 0);
        assert_eq!(map.rule("v"), None);
    }

    #[test]
    fn test_rejects_malformed_maps() {
        let cases = [
            (json!([1]), AccessPath::root()),
            (json!({"a": 1}), path!("a")),
            (json!({"a_val": true}), path!("a_val")),
            (json!({"_dict": {}, "a": "b"}), path!("_dict")),
            (json!({"a_obj": {"x": 1}}), path!("a_obj", "x")),
            (json!({"a_arr": {"b_obj": {"c": []}}}), path!("a_arr", "b_obj", "c")),
        ];
        for (input, expected) in cases {
            match FieldMap::from_json(&input) {
                Err(CodecError::InvalidFieldMap { path, .. }) => {
                    assert_eq!(path, expected, "input: {}", input)
                }
                other => panic!("expected InvalidFieldMap for {}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_to_json_round_trip() {
        let authored = json!({
            "name": "n",
            "address": "a",
            "address_obj": {"street": "s"},
            "address_arr": {"street": "st"},
            "legacy": null,
            "items": "i",
            "items_arr": {"_dict": {"x": "y"}},
            "min_val": "mv"
        });
        let map = FieldMap::from_json(&authored).unwrap();
        assert_eq!(map.to_json(), authored);
        assert_eq!(FieldMap::from_json(&map.to_json()).unwrap(), map);
    }

    #[test]
    fn test_serde_uses_authoring_notation() {
        let map: FieldMap = serde_json::from_value(json!({"a": "b"})).unwrap();
        assert_eq!(serde_json::to_value(&map).unwrap(), json!({"a": "b"}));
        assert!(serde_json::from_value::<FieldMap>(json!({"a": 3})).is_err());
    }

    #[test]
    fn test_builder_merges_nested_rules() {
        let inner = FieldMap::builder().rename("a", "b").build();
        let built = FieldMap::builder()
            .array("v", "x", inner.clone())
            .object("v", "x", inner)
            .build();
        let authored =
            FieldMap::from_json(&json!({"v": "x", "v_arr": {"a": "b"}, "v_obj": {"a": "b"}}))
                .unwrap();
        assert_eq!(built, authored);
    }

    #[test]
    fn test_ids_are_unique_and_shared_by_clones() {
        let a = FieldMap::builder().rename("x", "y").build();
        let b = FieldMap::builder().rename("x", "y").build();
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_find_duplicates_recurses() {
        let map = FieldMap::from_json(&json!({
            "first": "f",
            "family": "f",
            "address_obj": {"street": "s", "state": "s"}
        }))
        .unwrap();

        let found = map.find_duplicates();
        assert_eq!(
            found,
            vec![
                Diagnostic::DuplicateMapping {
                    compact_key: "f".into(),
                    previous: "first".into(),
                    replacement: "family".into(),
                },
                Diagnostic::DuplicateMapping {
                    compact_key: "s".into(),
                    previous: "street".into(),
                    replacement: "state".into(),
                },
            ]
        );
    }
}
