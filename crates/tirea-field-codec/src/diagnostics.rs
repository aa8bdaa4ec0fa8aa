//! Structured, non-fatal diagnostics.
//!
//! The codec never fails on unexpected data. When a data key has no map
//! entry, or a map would invert ambiguously, it reports a [`Diagnostic`] to
//! the registered [`DiagnosticSink`] and carries on.

use crate::AccessPath;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A non-fatal finding raised while inverting or applying a field map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A data key has no entry in the field map; the value was kept as-is.
    SchemaDrift {
        /// Location of the unmapped key in the input tree.
        path: AccessPath,
        /// The unmapped key.
        key: String,
    },
    /// Two source keys map to the same target key.
    ///
    /// The inverse keeps the later entry.
    DuplicateMapping {
        /// Target key claimed twice.
        compact_key: String,
        /// Source key that held the target first.
        previous: String,
        /// Source key that took it over.
        replacement: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SchemaDrift { path, key } => {
                write!(f, "no field mapping for key '{}' at {}", key, path)
            }
            Diagnostic::DuplicateMapping {
                compact_key,
                previous,
                replacement,
            } => write!(
                f,
                "keys '{}' and '{}' both map to '{}'",
                previous, replacement, compact_key
            ),
        }
    }
}

/// Receiver for codec diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Discards every diagnostic. The default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&self, _diagnostic: &Diagnostic) {}
}

/// Logs diagnostics through `tracing` at `warn` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::SchemaDrift { path, key } => {
                tracing::warn!(%path, key = %key, "field transform: unmapped key passed through");
            }
            Diagnostic::DuplicateMapping {
                compact_key,
                previous,
                replacement,
            } => {
                tracing::warn!(
                    compact_key = %compact_key,
                    previous = %previous,
                    replacement = %replacement,
                    "field map has duplicate target keys"
                );
            }
        }
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct RecordingSink(Mutex<Vec<Diagnostic>>);

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn drift() -> Diagnostic {
        Diagnostic::SchemaDrift {
            path: path!("user"),
            key: "nickname".into(),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            drift().to_string(),
            "no field mapping for key 'nickname' at $.user"
        );
    }

    #[test]
    fn test_recording_sink_take_drains() {
        let sink = RecordingSink::new();
        sink.report(&drift());
        sink.report(&drift());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.take(), vec![drift(), drift()]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_closure_is_a_sink() {
        let count = AtomicUsize::new(0);
        let sink = |_: &Diagnostic| {
            count.fetch_add(1, Ordering::SeqCst);
        };
        sink.report(&drift());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
