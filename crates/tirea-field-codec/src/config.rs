//! Codec configuration.
//!
//! A plain value passed to the codec and the inversion cache. It can be
//! loaded from the application's settings file; missing fields take their
//! defaults.

use serde::{Deserialize, Serialize};

/// Default key for the modification timestamp written next to persisted
/// fields. It is dropped silently when a map does not mention it.
pub const DEFAULT_TIMESTAMP_KEY: &str = "@";

/// Codec behaviour switches.
///
/// Passed explicitly to [`FieldCodec`](crate::FieldCodec) and
/// [`InversionCache`](crate::InversionCache); there is no global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Report duplicate target keys while validating and inverting maps.
    ///
    /// Defaults to on in debug builds and off in release builds.
    pub check_duplicates: bool,
    /// Unmapped key that is dropped instead of passed through.
    pub timestamp_key: Option<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            check_duplicates: cfg!(debug_assertions),
            timestamp_key: Some(DEFAULT_TIMESTAMP_KEY.to_string()),
        }
    }
}

impl CodecConfig {
    #[must_use]
    pub fn with_check_duplicates(mut self, enabled: bool) -> Self {
        self.check_duplicates = enabled;
        self
    }

    #[must_use]
    pub fn with_timestamp_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.timestamp_key = key.map(Into::into);
        self
    }
}
