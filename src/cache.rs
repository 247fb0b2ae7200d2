//! Name-keyed store of the latest computed outcome per node.
//!
//! The cache is the single piece of state touched by worker-task
//! completions, so every accessor goes through one internal lock. Reads
//! hand out defensive copies: a downstream consumer mutating its input
//! can never corrupt the stored outcome or another concurrent reader.
//!
//! The cache is an injected instance owned by the engine — not a
//! process-wide singleton — so tests get full isolation by constructing
//! their own.
//!
//! # Examples
//!
//! ```rust
//! use pipelab::cache::ResultCache;
//! use pipelab::outcome::Outcome;
//! use serde_json::json;
//!
//! let cache = ResultCache::new();
//! cache.put("load", Outcome::value(json!([1, 2, 3])));
//!
//! let a = cache.get("load").unwrap();
//! let b = cache.get("load").unwrap();
//! assert_eq!(a, b); // independent copies of the same outcome
//! ```

use rustc_hash::FxHashMap;
use std::sync::Mutex;

use crate::outcome::Outcome;

/// Shared outcome store with copy-on-read semantics.
///
/// A single global lock is sufficient at expected node counts; every
/// entry lives exactly as long as its node — deletion and rename are
/// driven by the engine alongside the matching graph mutation.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<FxHashMap<String, Outcome>>,
}

impl ResultCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // The map holds plain data; a panic while holding the lock cannot
    // leave it in a torn state, so poisoning is recovered rather than
    // propagated.
    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, Outcome>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Return a defensive copy of the outcome stored for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Outcome> {
        self.lock().get(name).cloned()
    }

    /// Returns `true` if an outcome is stored for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Store (or overwrite) the outcome for `name`.
    ///
    /// Concurrent completions for the same node race here; whichever
    /// lands last wins, which is the engine's documented policy.
    pub fn put(&self, name: impl Into<String>, outcome: Outcome) {
        self.lock().insert(name.into(), outcome);
    }

    /// Remove the entry for `name`, if any.
    pub fn delete(&self, name: &str) {
        self.lock().remove(name);
    }

    /// Carry an entry over to a new key, dropping the old one.
    pub fn rename(&self, old: &str, new: impl Into<String>) {
        let mut entries = self.lock();
        if let Some(outcome) = entries.remove(old) {
            entries.insert(new.into(), outcome);
        }
    }

    /// Number of cached outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when no outcome is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn copy_isolation() {
        let cache = ResultCache::new();
        cache.put("a", Outcome::value(json!({"rows": [1, 2]})));

        let mut first = cache.get("a").unwrap();
        if let Outcome::Value(v) = &mut first {
            v["rows"] = json!([]);
        }

        // Mutating one copy affects neither the stored value nor a
        // second read.
        let second = cache.get("a").unwrap();
        assert_eq!(second.as_value().unwrap()["rows"], json!([1, 2]));
    }

    #[test]
    fn rename_carries_entry() {
        let cache = ResultCache::new();
        cache.put("old", Outcome::value(json!(1)));
        cache.rename("old", "new");
        assert!(cache.get("old").is_none());
        assert_eq!(cache.get("new").unwrap().as_value(), Some(&json!(1)));
    }

    #[test]
    fn rename_missing_is_noop() {
        let cache = ResultCache::new();
        cache.rename("ghost", "new");
        assert!(cache.is_empty());
    }
}
