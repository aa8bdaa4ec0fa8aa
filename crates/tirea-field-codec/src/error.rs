//! Error types for tirea-field-codec operations.
//!
//! Transforming data never fails: unknown keys are passed through and
//! sentinels are preserved. Errors only arise while authoring field maps,
//! relocating access paths, and converting trees back into JSON.

use crate::AccessPath;
use thiserror::Error;

/// Result type alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The authored field map is malformed.
    #[error("invalid field map at {path}: {message}")]
    InvalidFieldMap {
        /// Location of the offending entry inside the authoring JSON.
        path: AccessPath,
        /// Description of what went wrong.
        message: String,
    },

    /// The transformed tree has no branch for the path at `depth`.
    ///
    /// Happens when the path runs through a dropped field or through a
    /// field whose value is replaced by a value table.
    #[error("path {path} has no counterpart after transform (segment {depth})")]
    PathNotTransformable {
        /// The path that was being relocated.
        path: AccessPath,
        /// Index of the first segment that could not be resolved.
        depth: usize,
    },

    /// A delete marker cannot be represented as plain JSON.
    #[error("delete marker at {path} cannot be converted to JSON")]
    DeleteMarker {
        /// Location of the marker in the tree.
        path: AccessPath,
    },
}

impl CodecError {
    #[inline]
    pub fn invalid_field_map(path: AccessPath, message: impl Into<String>) -> Self {
        CodecError::InvalidFieldMap {
            path,
            message: message.into(),
        }
    }

    #[inline]
    pub fn path_not_transformable(path: AccessPath, depth: usize) -> Self {
        CodecError::PathNotTransformable { path, depth }
    }

    #[inline]
    pub fn delete_marker(path: AccessPath) -> Self {
        CodecError::DeleteMarker { path }
    }

    /// Prefix the location carried by this error.
    ///
    /// Used while parsing nested authoring maps so the reported path points
    /// at the entry in the outermost document.
    pub fn with_prefix(self, prefix: &AccessPath) -> Self {
        let join = |path: AccessPath| -> AccessPath {
            prefix.iter().cloned().chain(path).collect()
        };
        match self {
            CodecError::InvalidFieldMap { path, message } => CodecError::InvalidFieldMap {
                path: join(path),
                message,
            },
            CodecError::DeleteMarker { path } => CodecError::DeleteMarker { path: join(path) },
            other => other,
        }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
