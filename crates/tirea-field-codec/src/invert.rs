//! Field map inversion.
//!
//! The inverse of a map turns compact keys back into verbose ones. It is
//! derived once per map identity and cached for the life of the cache;
//! entries are never evicted because the number of distinct maps is bounded
//! by the schema, not by data volume.

use crate::{
    CodecConfig, Diagnostic, DiagnosticSink, FieldMap, FieldRule, MapId, MapKind, NestedRules,
    NoopSink,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

static GLOBAL_INVERSIONS: OnceLock<InversionCache> = OnceLock::new();

/// Invert `map` using the process-wide cache.
///
/// Repeated calls with the same map (or a clone of it) return the same `Arc`.
///
/// ```
/// use std::sync::Arc;
/// use tirea_field_codec::{invert, FieldMap};
///
/// let map = FieldMap::builder().rename("name", "n").build();
/// let inverse = invert(&map);
/// assert_eq!(inverse.rule("n").and_then(|r| r.target()), Some("name"));
/// assert!(Arc::ptr_eq(&inverse, &invert(&map)));
/// ```
pub fn invert(map: &FieldMap) -> Arc<FieldMap> {
    InversionCache::global().invert(map)
}

/// Write-once cache of inverted maps keyed by [`MapId`].
#[derive(Debug, Default)]
pub struct InversionCache {
    entries: RwLock<HashMap<MapId, Arc<FieldMap>>>,
}

impl InversionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by [`invert`] and codecs built without their own cache.
    pub fn global() -> &'static InversionCache {
        GLOBAL_INVERSIONS.get_or_init(InversionCache::new)
    }

    /// Invert without reporting duplicates.
    pub fn invert(&self, map: &FieldMap) -> Arc<FieldMap> {
        self.invert_with(map, &CodecConfig::default(), &NoopSink)
    }

    /// Invert `map`, reporting duplicate targets to `sink` when
    /// `config.check_duplicates` is set.
    ///
    /// Duplicates are only seen on the first inversion of a map; later calls
    /// are served from the cache. The inverse keeps the last source key for a
    /// duplicated target.
    pub fn invert_with(
        &self,
        map: &FieldMap,
        config: &CodecConfig,
        sink: &dyn DiagnosticSink,
    ) -> Arc<FieldMap> {
        if let Some(hit) = self.get(map.id()) {
            tracing::trace!(map_id = %map.id(), "inversion cache hit");
            return hit;
        }

        let inverse = Arc::new(self.build_inverse(map, config, sink));
        tracing::trace!(map_id = %map.id(), inverse_id = %inverse.id(), "inverted field map");

        // A concurrent inversion of the same map may have won the race; keep
        // its result so every caller sees one instance.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(map.id()).or_insert(inverse).clone()
    }

    /// Cached inverse for `id`, if any.
    pub fn get(&self, id: MapId) -> Option<Arc<FieldMap>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build_inverse(
        &self,
        map: &FieldMap,
        config: &CodecConfig,
        sink: &dyn DiagnosticSink,
    ) -> FieldMap {
        let rules = match map.kind() {
            // Dictionary keys are data, so only the inner map flips.
            MapKind::Dictionary(inner) => {
                return FieldMap::dictionary(self.invert_with(inner, config, sink))
            }
            MapKind::Fields(rules) => rules,
        };

        let mut inverse: IndexMap<String, FieldRule> = IndexMap::with_capacity(rules.len());
        for (key, rule) in rules {
            let (target, inverse_rule) = match rule {
                FieldRule::Drop => continue,
                FieldRule::Rename(target) => (target, FieldRule::Rename(key.clone())),
                FieldRule::RenameWithNested(target, nested) => {
                    let flip = |m: &Option<Arc<FieldMap>>| {
                        m.as_ref().map(|m| self.invert_with(m, config, sink))
                    };
                    // Value substitution is one-way.
                    let inverted = NestedRules {
                        values: None,
                        array: flip(&nested.array),
                        object: flip(&nested.object),
                        dictionary: flip(&nested.dictionary),
                    };
                    let inverse_rule = if inverted.is_empty() {
                        FieldRule::Rename(key.clone())
                    } else {
                        FieldRule::RenameWithNested(key.clone(), inverted)
                    };
                    (target, inverse_rule)
                }
            };

            if let Some(previous) = inverse.insert(target.clone(), inverse_rule) {
                if config.check_duplicates {
                    sink.report(&Diagnostic::DuplicateMapping {
                        compact_key: target.clone(),
                        previous: previous.target().unwrap_or_default().to_string(),
                        replacement: key.clone(),
                    });
                }
            }
        }

        FieldMap::from_rules(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingSink;
    use serde_json::json;

    fn person_map() -> FieldMap {
        FieldMap::from_json(&json!({
            "name": "n",
            "address": "a",
            "address_obj": {"street": "s", "city": "c"},
            "legacy": null
        }))
        .unwrap()
    }

    #[test]
    fn test_inverts_renames_and_nested_maps() {
        let cache = InversionCache::new();
        let inverse = cache.invert(&person_map());

        assert_eq!(
            inverse.to_json(),
            json!({
                "n": "name",
                "a": "address",
                "a_obj": {"s": "street", "c": "city"}
            })
        );
    }

    #[test]
    fn test_dropped_fields_have_no_inverse() {
        let inverse = InversionCache::new().invert(&person_map());
        assert!(inverse.rules().all(|(_, r)| r.target() != Some("legacy")));
    }

    #[test]
    fn test_dictionary_map_keeps_dictionary_shape() {
        let map = FieldMap::from_json(&json!({"_dict": {"v": "val"}})).unwrap();
        let inverse = InversionCache::new().invert(&map);
        assert_eq!(inverse.to_json(), json!({"_dict": {"val": "v"}}));
    }

    #[test]
    fn test_suffix_dictionary_and_array_rules() {
        let map = FieldMap::from_json(&json!({
            "scores": "sc",
            "scores_dict": {"value": "v"},
            "items": "i",
            "items_arr": {"label": "l"}
        }))
        .unwrap();
        let inverse = InversionCache::new().invert(&map);
        assert_eq!(
            inverse.to_json(),
            json!({
                "sc": "scores",
                "sc_dict": {"v": "value"},
                "i": "items",
                "i_arr": {"l": "label"}
            })
        );
    }

    #[test]
    fn test_value_table_is_not_inverted() {
        let map = FieldMap::from_json(&json!({
            "status": "st",
            "status_val": {"status": "archived"}
        }))
        .unwrap();
        let inverse = InversionCache::new().invert(&map);
        assert_eq!(inverse.to_json(), json!({"st": "status"}));
    }

    #[test]
    fn test_every_nested_rule_of_a_field_is_inverted() {
        let map = FieldMap::from_json(&json!({
            "v": "x",
            "v_val": {"v": 0},
            "v_arr": {"a": "b"},
            "v_obj": {"a": "c"},
            "v_dict": {"a": "d"}
        }))
        .unwrap();
        let inverse = InversionCache::new().invert(&map);
        assert_eq!(
            inverse.to_json(),
            json!({
                "x": "v",
                "x_arr": {"b": "a"},
                "x_obj": {"c": "a"},
                "x_dict": {"d": "a"}
            })
        );
    }

    #[test]
    fn test_cache_returns_identical_instance() {
        let cache = InversionCache::new();
        let map = person_map();

        let first = cache.invert(&map);
        let second = cache.invert(&map);
        let via_clone = cache.invert(&map.clone());

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &via_clone));
        // outer map plus the address sub-map
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_nested_inversions_are_shared() {
        let cache = InversionCache::new();
        let address = Arc::new(FieldMap::builder().rename("street", "s").build());
        let home = FieldMap::builder().object("home", "h", address.clone()).build();
        let work = FieldMap::builder().object("work", "w", address.clone()).build();

        let home_inv = cache.invert(&home);
        let work_inv = cache.invert(&work);

        let nested = |m: &FieldMap, key: &str| {
            m.rule(key).and_then(FieldRule::nested).and_then(|n| n.object.clone())
        };
        let (a, b) = (nested(&home_inv, "h").unwrap(), nested(&work_inv, "w").unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &cache.invert(&address)));
    }

    #[test]
    fn test_duplicates_reported_last_write_wins() {
        let cache = InversionCache::new();
        let sink = RecordingSink::new();
        let map = FieldMap::builder()
            .rename("first", "f")
            .rename("family", "f")
            .build();
        let config = CodecConfig::default().with_check_duplicates(true);

        let inverse = cache.invert_with(&map, &config, &sink);

        assert_eq!(inverse.rule("f"), Some(&FieldRule::Rename("family".into())));
        assert_eq!(
            sink.take(),
            vec![Diagnostic::DuplicateMapping {
                compact_key: "f".into(),
                previous: "first".into(),
                replacement: "family".into(),
            }]
        );
    }

    #[test]
    fn test_duplicates_silent_when_disabled() {
        let sink = RecordingSink::new();
        let map = FieldMap::builder().rename("a", "x").rename("b", "x").build();
        let config = CodecConfig::default().with_check_duplicates(false);

        let inverse = InversionCache::new().invert_with(&map, &config, &sink);

        assert_eq!(inverse.rule("x"), Some(&FieldRule::Rename("b".into())));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_global_cache() {
        let map = person_map();
        assert!(Arc::ptr_eq(&invert(&map), &invert(&map)));
        assert!(InversionCache::global().get(map.id()).is_some());
    }
}
