//! Encode/decode facade used by the persistence layer.

use crate::{
    AccessPath, CodecConfig, CodecResult, DiagnosticSink, FieldMap, InversionCache, NoopSink,
    PathValue, Transformer, Tree,
};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// A forward field map bundled with its inverse, configuration and
/// diagnostic sink.
///
/// `encode` produces the compact storage shape, `decode` restores the
/// verbose shape. The inverse is derived on first decode.
///
/// # Examples
///
/// ```
/// use tirea_field_codec::{path, FieldCodec, FieldMap};
/// use serde_json::json;
///
/// let codec = FieldCodec::new(
///     FieldMap::from_json(&json!({"name": "n", "address": "a", "address_obj": {"city": "c"}}))
///         .unwrap(),
/// );
///
/// let doc = json!({"name": "Alice", "address": {"city": "NYC"}});
/// let stored = codec.encode_json(&doc).unwrap();
/// assert_eq!(stored, json!({"n": "Alice", "a": {"c": "NYC"}}));
/// assert_eq!(codec.decode_json(&stored).unwrap(), doc);
///
/// assert_eq!(codec.encode_path(&path!("address", "city")).unwrap(), path!("a", "c"));
/// ```
pub struct FieldCodec {
    forward: Arc<FieldMap>,
    inverse: OnceLock<Arc<FieldMap>>,
    config: CodecConfig,
    sink: Arc<dyn DiagnosticSink>,
    cache: Option<Arc<InversionCache>>,
}

impl FieldCodec {
    /// Codec with default configuration and no diagnostics.
    pub fn new(map: impl Into<Arc<FieldMap>>) -> Self {
        Self::builder(map).build()
    }

    pub fn builder(map: impl Into<Arc<FieldMap>>) -> FieldCodecBuilder {
        FieldCodecBuilder {
            map: map.into(),
            config: CodecConfig::default(),
            sink: Arc::new(NoopSink),
            cache: None,
        }
    }

    #[inline]
    pub fn forward(&self) -> &Arc<FieldMap> {
        &self.forward
    }

    /// The inverted map, derived and cached on first use.
    pub fn inverse(&self) -> &Arc<FieldMap> {
        self.inverse.get_or_init(|| {
            // Duplicates were already reported when the codec was built.
            let config = self.config.clone().with_check_duplicates(false);
            let cache = self.cache.as_deref().unwrap_or_else(|| InversionCache::global());
            cache.invert_with(&self.forward, &config, &*self.sink)
        })
    }

    #[inline]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn transformer(&self) -> Transformer<'_> {
        Transformer::new(&self.config, &*self.sink)
    }

    /// Verbose tree to compact tree.
    pub fn encode(&self, tree: &Tree) -> Tree {
        self.transformer().transform(tree, &self.forward)
    }

    /// Compact tree to verbose tree.
    pub fn decode(&self, tree: &Tree) -> Tree {
        self.transformer().transform(tree, self.inverse())
    }

    pub fn encode_json(&self, value: &Value) -> CodecResult<Value> {
        Value::try_from(self.encode(&Tree::from(value)))
    }

    pub fn decode_json(&self, value: &Value) -> CodecResult<Value> {
        Value::try_from(self.decode(&Tree::from(value)))
    }

    /// Verbose access path to the path of the same field in stored data.
    pub fn encode_path(&self, path: &AccessPath) -> CodecResult<AccessPath> {
        self.transformer().transform_path(path, &self.forward)
    }

    pub fn decode_path(&self, path: &AccessPath) -> CodecResult<AccessPath> {
        self.transformer().transform_path(path, self.inverse())
    }

    /// Encode a partial update: `value` is the new content of the field at
    /// `path`.
    pub fn encode_at_path(&self, value: &Tree, path: &AccessPath) -> CodecResult<PathValue> {
        self.transformer()
            .transform_with_path(value, path, &self.forward)
    }

    pub fn decode_at_path(&self, value: &Tree, path: &AccessPath) -> CodecResult<PathValue> {
        self.transformer()
            .transform_with_path(value, path, self.inverse())
    }
}

impl std::fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCodec")
            .field("forward", &self.forward.id())
            .field("inverse", &self.inverse.get().map(|m| m.id()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FieldCodec`].
pub struct FieldCodecBuilder {
    map: Arc<FieldMap>,
    config: CodecConfig,
    sink: Arc<dyn DiagnosticSink>,
    cache: Option<Arc<InversionCache>>,
}

impl FieldCodecBuilder {
    #[must_use]
    pub fn config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a private inversion cache instead of the process-wide one.
    #[must_use]
    pub fn cache(mut self, cache: Arc<InversionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the codec, reporting duplicate target keys when
    /// `check_duplicates` is enabled.
    pub fn build(self) -> FieldCodec {
        if self.config.check_duplicates {
            for diagnostic in self.map.find_duplicates() {
                self.sink.report(&diagnostic);
            }
        }
        FieldCodec {
            forward: self.map,
            inverse: OnceLock::new(),
            config: self.config,
            sink: self.sink,
            cache: self.cache,
        }
    }
}
