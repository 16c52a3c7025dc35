//! Dirty-diff writer.
//!
//! Saving a draft never writes the draft wholesale. The writer re-reads the
//! remote document, canonicalizes both sides, and writes only the groups that
//! are dirty *and* actually differ, stamped with a server-side `lastUpdated`.
//!
//! The re-read and the write are not atomic: a concurrent edit landing in
//! between is overwritten for the groups this save touches.

use std::collections::BTreeSet;
use std::hash::Hash;
use std::sync::Arc;

use thiserror::Error;

use crate::canonical::{CanonicalGroups, FieldGroups};
use crate::decode::{decode_document, Decode};
use crate::document::{DocPath, FieldWrite, WritePayload};
use crate::draft::DraftState;
use crate::store::{DocumentStore, StoreError};

pub const LAST_UPDATED_FIELD: &str = "lastUpdated";

/// Result of a save that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No group was marked dirty; the store was not touched.
    NothingToSave,
    /// Every dirty group matched the remote copy; nothing was written.
    NoActualChanges,
    /// The listed groups were written.
    Saved { groups: Vec<String> },
}

#[derive(Error, Debug, Clone)]
pub enum SaveError {
    #[error("Failed to re-read {path} before saving: {source}")]
    Refetch { path: DocPath, source: StoreError },

    #[error("Failed to write {path}: {source}")]
    Write { path: DocPath, source: StoreError },
}

pub struct DirtyDiffWriter {
    store: Arc<dyn DocumentStore>,
    timestamp_field: String,
}

impl DirtyDiffWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            timestamp_field: LAST_UPDATED_FIELD.to_string(),
        }
    }

    /// Overrides the server-timestamp field written with every save.
    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    /// Saves the dirty groups of `state` to `path`.
    ///
    /// On success the dirty markers are cleared. On any error they are left
    /// untouched so the caller can retry.
    pub async fn save<K, T>(
        &self,
        path: &DocPath,
        state: &mut DraftState<K, T>,
    ) -> Result<SaveOutcome, SaveError>
    where
        K: Eq + Hash + Clone,
        T: Decode + FieldGroups + Clone + Default,
    {
        if !state.is_dirty() {
            return Ok(SaveOutcome::NothingToSave);
        }

        let remote: T = match self.store.get(path).await {
            Ok(Some(doc)) => decode_document(&doc),
            Ok(None) => T::default(),
            Err(source) => {
                return Err(SaveError::Refetch {
                    path: path.clone(),
                    source,
                })
            }
        };

        let draft_groups = state.draft().canonical_groups();
        let remote_groups = remote.canonical_groups();
        let changed = changed_groups(&draft_groups, &remote_groups, state.dirty_groups());

        if changed.is_empty() {
            tracing::debug!("No actual changes for {}", path);
            state.clear_dirty();
            return Ok(SaveOutcome::NoActualChanges);
        }

        let payload = build_payload(&draft_groups, &changed, &self.timestamp_field);
        tracing::debug!("Writing {} group(s) to {}: {:?}", changed.len(), path, changed);

        self.store
            .set_merge(path, payload)
            .await
            .map_err(|source| SaveError::Write {
                path: path.clone(),
                source,
            })?;

        state.clear_dirty();
        Ok(SaveOutcome::Saved { groups: changed })
    }
}

/// Groups that are dirty and whose canonical forms differ.
///
/// Dirty names that are not groups of the record are ignored.
pub fn changed_groups(
    draft: &CanonicalGroups,
    remote: &CanonicalGroups,
    dirty: &BTreeSet<String>,
) -> Vec<String> {
    dirty
        .iter()
        .filter(|name| match draft.get(name.as_str()) {
            Some(local) => remote.get(name.as_str()) != Some(local),
            None => {
                tracing::debug!("Ignoring unknown dirty group '{}'", name);
                false
            }
        })
        .cloned()
        .collect()
}

/// Merge payload: the canonical draft fields of each changed group plus a
/// server timestamp.
pub fn build_payload(
    draft: &CanonicalGroups,
    changed: &[String],
    timestamp_field: &str,
) -> WritePayload {
    let mut payload = WritePayload::new();
    for name in changed {
        if let Some(fields) = draft.get(name.as_str()) {
            for (field, value) in fields {
                payload.insert(field.clone(), FieldWrite::Value(value.clone()));
            }
        }
    }
    payload.insert(timestamp_field, FieldWrite::ServerTimestamp);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BusSchedule, LaundrySettings, MealSlot, MessMenu};
    use crate::store::testing::RecordingStore;
    use chrono::Weekday;
    use serde_json::json;

    fn writer_for(store: &RecordingStore) -> DirtyDiffWriter {
        DirtyDiffWriter::new(Arc::new(store.clone()))
    }

    async fn seeded_laundry(store: &RecordingStore) -> DraftState<(), LaundrySettings> {
        store
            .seed(
                &LaundrySettings::path(),
                WritePayload::new()
                    .value("status", "On Schedule")
                    .value("pickupDay", "Monday"),
            )
            .await;
        let doc = store.inner.get(&LaundrySettings::path()).await.unwrap().unwrap();
        let mut state = DraftState::single();
        state.apply_snapshot((), decode_document(&doc));
        state
    }

    #[tokio::test]
    async fn test_single_group_payload() {
        let store = RecordingStore::new();
        let mut state = seeded_laundry(&store).await;

        state.edit("pickupDay", |d| d.pickup_day = "Tuesday".into());
        let outcome = writer_for(&store)
            .save(&LaundrySettings::path(), &mut state)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                groups: vec!["pickupDay".to_string()]
            }
        );
        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        let (path, payload) = &writes[0];
        assert_eq!(path, &LaundrySettings::path());
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("pickupDay"), Some(&FieldWrite::Value(json!("Tuesday"))));
        assert_eq!(payload.get("lastUpdated"), Some(&FieldWrite::ServerTimestamp));
        assert!(!state.is_dirty());
    }

    #[tokio::test]
    async fn test_custom_timestamp_field() {
        let store = RecordingStore::new();
        let mut state = seeded_laundry(&store).await;

        state.edit("timings", |d| d.timings = "9-11am".into());
        writer_for(&store)
            .with_timestamp_field("updatedAt")
            .save(&LaundrySettings::path(), &mut state)
            .await
            .unwrap();

        let writes = store.writes();
        let (_, payload) = &writes[0];
        assert_eq!(payload.get("updatedAt"), Some(&FieldWrite::ServerTimestamp));
        assert!(payload.get("lastUpdated").is_none());
    }

    #[tokio::test]
    async fn test_idempotent_save_writes_nothing() {
        let store = RecordingStore::new();
        let mut state = seeded_laundry(&store).await;

        // Edited back to the same value after whitespace normalization
        state.edit("pickupDay", |d| d.pickup_day = "  Monday ".into());
        state.mark_dirty("status");

        let outcome = writer_for(&store)
            .save(&LaundrySettings::path(), &mut state)
            .await
            .unwrap();

        assert_eq!(outcome, SaveOutcome::NoActualChanges);
        assert!(store.writes().is_empty());
        assert!(!state.is_dirty());
    }

    #[tokio::test]
    async fn test_nothing_to_save_touches_no_store() {
        let store = RecordingStore::new();
        let mut state: DraftState<(), LaundrySettings> = DraftState::single();

        let outcome = writer_for(&store)
            .save(&LaundrySettings::path(), &mut state)
            .await
            .unwrap();

        assert_eq!(outcome, SaveOutcome::NothingToSave);
        assert_eq!(store.get_count(), 0);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_dirty_field_isolation() {
        let store = RecordingStore::new();
        let path = BusSchedule::path("route-1").unwrap();
        store
            .seed(
                &path,
                WritePayload::new()
                    .value("routeName", "Campus Loop")
                    .value("status", "On Schedule")
                    .value("pickupPoint", "Main Gate")
                    .value("departureTimes", json!(["7:30", "9:00"])),
            )
            .await;
        let doc = store.inner.get(&path).await.unwrap().unwrap();
        let mut state = DraftState::single();
        state.apply_snapshot((), decode_document::<BusSchedule>(&doc));

        // A: dirty and different
        state.edit("departureTimes", |bus| {
            bus.departure_times.push("18:00".into())
        });
        // B: dirty but identical once trimmed
        state.edit("status", |bus| bus.status = " On Schedule ".into());
        // C: never marked dirty, and now differs because of a remote edit
        store
            .seed(&path, WritePayload::new().value("pickupPoint", "Library"))
            .await;

        let outcome = writer_for(&store).save(&path, &mut state).await.unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                groups: vec!["departureTimes".to_string()]
            }
        );
        let (_, payload) = &store.writes()[0];
        assert_eq!(
            payload.get("departureTimes"),
            Some(&FieldWrite::Value(json!(["7:30", "9:00", "18:00"])))
        );
        assert!(payload.get("status").is_none());
        assert!(payload.get("pickupPoint").is_none());
        assert!(payload.get("routeName").is_none());

        let doc = store.inner.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.fields["pickupPoint"], json!("Library"));
    }

    #[tokio::test]
    async fn test_untouched_group_differing_remotely_is_not_written() {
        let store = RecordingStore::new();
        let mut state = seeded_laundry(&store).await;
        state.edit("pickupDay", |d| d.pickup_day = "Tuesday".into());

        // Another admin changes timings after our snapshot
        store
            .seed(&LaundrySettings::path(), WritePayload::new().value("timings", "9-11am"))
            .await;

        writer_for(&store)
            .save(&LaundrySettings::path(), &mut state)
            .await
            .unwrap();

        let (_, payload) = &store.writes()[0];
        assert!(payload.get("timings").is_none());
        let doc = store.inner.get(&LaundrySettings::path()).await.unwrap().unwrap();
        assert_eq!(doc.fields["timings"], json!("9-11am"));
        assert_eq!(doc.fields["pickupDay"], json!("Tuesday"));
    }

    #[tokio::test]
    async fn test_compares_against_fresh_read_not_snapshot() {
        let store = RecordingStore::new();
        let mut state = seeded_laundry(&store).await;
        state.edit("pickupDay", |d| d.pickup_day = "Thursday".into());

        // Remote already holds the edited value
        store
            .seed(&LaundrySettings::path(), WritePayload::new().value("pickupDay", "Thursday"))
            .await;

        let outcome = writer_for(&store)
            .save(&LaundrySettings::path(), &mut state)
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::NoActualChanges);
        assert_eq!(store.get_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_document_compares_against_default() {
        let store = RecordingStore::new();
        let mut state: DraftState<Weekday, MessMenu> = DraftState::new(Weekday::Wed);
        state.edit("lunch", |menu| {
            menu.items_mut(MealSlot::Lunch).extend(["Rice".to_string(), " ".to_string()])
        });
        state.mark_dirty("dinner");

        let path = MessMenu::path(Weekday::Wed);
        let outcome = writer_for(&store).save(&path, &mut state).await.unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                groups: vec!["lunch".to_string()]
            }
        );
        let (_, payload) = &store.writes()[0];
        assert_eq!(payload.get("lunch"), Some(&FieldWrite::Value(json!(["Rice"]))));
    }

    #[tokio::test]
    async fn test_refetch_failure_preserves_dirty() {
        let store = RecordingStore::new();
        let mut state = seeded_laundry(&store).await;
        state.edit("pickupDay", |d| d.pickup_day = "Tuesday".into());
        store.fail_gets(true);

        let result = writer_for(&store)
            .save(&LaundrySettings::path(), &mut state)
            .await;

        assert!(matches!(result, Err(SaveError::Refetch { .. })));
        assert!(store.writes().is_empty());
        assert!(state.dirty_groups().contains("pickupDay"));
    }

    #[tokio::test]
    async fn test_write_failure_preserves_dirty() {
        let store = RecordingStore::new();
        let mut state = seeded_laundry(&store).await;
        state.edit("pickupDay", |d| d.pickup_day = "Tuesday".into());
        store.fail_writes(true);

        let result = writer_for(&store)
            .save(&LaundrySettings::path(), &mut state)
            .await;

        assert!(matches!(result, Err(SaveError::Write { .. })));
        assert!(state.is_dirty());
        assert_eq!(state.draft().pickup_day, "Tuesday");

        // Retry once the store is back
        store.fail_writes(false);
        let outcome = writer_for(&store)
            .save(&LaundrySettings::path(), &mut state)
            .await
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved { .. }));
    }

    #[test]
    fn test_unknown_dirty_group_ignored() {
        let draft = LaundrySettings::default().canonical_groups();
        let remote = draft.clone();
        let dirty = BTreeSet::from(["nonsense".to_string()]);
        assert!(changed_groups(&draft, &remote, &dirty).is_empty());
    }
}
