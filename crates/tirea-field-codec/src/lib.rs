//! Bidirectional field-name codec for persisted state trees.
//!
//! `tirea-field-codec` rewrites nested documents between the verbose field
//! names used by application code and the compact names used in storage,
//! and relocates access paths through the same rewrite so partial updates
//! can target stored data directly.
//!
//! # Core Concepts
//!
//! - **FieldMap**: immutable schema description: rename, drop, or rename
//!   and rewrite the nested object, array, dictionary or value
//! - **invert**: derives the compact-to-verbose map, cached per map identity
//! - **Transformer**: applies a map (forward or inverse) to a [`Tree`]
//! - **transform_path**: relocates an [`AccessPath`] through a map
//! - **FieldCodec**: bundles a map, its inverse, config and diagnostics
//!
//! # Guarantees
//!
//! ```text
//! transform(transform(T, M), invert(M)) == T
//! ```
//!
//! for maps without duplicate targets, except fields dropped by `null`
//! rules and fields rewritten by value tables. Transforming data never
//! fails: unknown keys pass through with a [`Diagnostic`], and the delete
//! marker is returned untouched.
//!
//! # Quick Start
//!
//! ```
//! use tirea_field_codec::{invert, path, transform_object, transform_path, tree, FieldMap};
//! use serde_json::json;
//!
//! let map = FieldMap::from_json(&json!({
//!     "name": "n",
//!     "address": "a",
//!     "address_obj": {"street": "s", "city": "c"}
//! }))
//! .unwrap();
//!
//! let doc = tree!({"name": "Alice", "address": {"street": "Main", "city": "NYC"}});
//! let stored = transform_object(&doc, &map);
//! assert_eq!(stored, tree!({"n": "Alice", "a": {"s": "Main", "c": "NYC"}}));
//!
//! assert_eq!(transform_object(&stored, &invert(&map)), doc);
//! assert_eq!(transform_path(&path!("address", "street"), &map).unwrap(), path!("a", "s"));
//! ```

mod codec;
mod config;
mod diagnostics;
mod error;
mod field_map;
mod invert;
mod path;
mod path_transform;
mod transform;
mod tree;

pub use codec::{FieldCodec, FieldCodecBuilder};
pub use config::{CodecConfig, DEFAULT_TIMESTAMP_KEY};
pub use diagnostics::{Diagnostic, DiagnosticSink, NoopSink, RecordingSink, TracingSink};
pub use error::{value_type_name, CodecError, CodecResult};
pub use field_map::{
    FieldMap, FieldMapBuilder, FieldRule, MapId, MapKind, NestedKind, NestedRules, DICT_KEY,
};
pub use invert::{invert, InversionCache};
pub use path::{AccessPath, Seg};
pub use path_transform::{transform_path, transform_with_path, PathValue};
pub use transform::{transform_object, Transformer};
pub use tree::{Object, Tree, DELETE};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
