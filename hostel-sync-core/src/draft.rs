//! Local draft state for editor screens.
//!
//! A draft is a disposable, editable copy of the remote value for the
//! current context (a weekday, a route, or `()` for single-record screens).
//! Remote snapshots are remembered per context so that switching contexts
//! can reseed the draft without another round trip.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

/// Editable copy of a remote record plus its dirty field groups.
#[derive(Debug, Clone)]
pub struct DraftState<K, T> {
    context: K,
    draft: T,
    dirty: BTreeSet<String>,
    snapshots: HashMap<K, T>,
    remote_changed: bool,
}

impl<K, T> DraftState<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Default,
{
    pub fn new(context: K) -> Self {
        Self {
            context,
            draft: T::default(),
            dirty: BTreeSet::new(),
            snapshots: HashMap::new(),
            remote_changed: false,
        }
    }

    pub fn context(&self) -> &K {
        &self.context
    }

    pub fn draft(&self) -> &T {
        &self.draft
    }

    /// Last remote value seen for a context.
    pub fn snapshot(&self, context: &K) -> Option<&T> {
        self.snapshots.get(context)
    }

    /// Records a remote snapshot.
    ///
    /// For the current context with no dirty groups the draft is replaced
    /// outright. Returns whether the draft was replaced.
    pub fn apply_snapshot(&mut self, context: K, value: T) -> bool {
        let current = context == self.context;
        self.snapshots.insert(context, value);

        if !current {
            return false;
        }
        if self.dirty.is_empty() {
            self.reseed();
            true
        } else {
            self.remote_changed = true;
            false
        }
    }

    /// Moves to another context. Unsaved edits are dropped without warning.
    pub fn switch_context(&mut self, context: K) {
        if self.is_dirty() {
            tracing::debug!("Discarding {} dirty group(s) on context switch", self.dirty.len());
        }
        self.context = context;
        self.reseed();
    }

    /// Drops unsaved edits and reloads the last snapshot.
    pub fn discard(&mut self) {
        self.reseed();
    }

    /// Mutates the draft and marks `group` dirty.
    pub fn edit<R>(&mut self, group: &str, f: impl FnOnce(&mut T) -> R) -> R {
        self.mark_dirty(group);
        f(&mut self.draft)
    }

    pub fn mark_dirty(&mut self, group: &str) {
        self.dirty.insert(group.to_string());
    }

    pub fn dirty_groups(&self) -> &BTreeSet<String> {
        &self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
        self.remote_changed = false;
    }

    /// Whether a snapshot arrived for the current context while edits were pending.
    pub fn has_remote_changes(&self) -> bool {
        self.remote_changed
    }

    fn reseed(&mut self) {
        self.draft = self
            .snapshots
            .get(&self.context)
            .cloned()
            .unwrap_or_default();
        self.dirty.clear();
        self.remote_changed = false;
    }
}

impl<T: Clone + Default> DraftState<(), T> {
    /// Draft for a screen that edits a single record.
    pub fn single() -> Self {
        Self::new(())
    }
}
