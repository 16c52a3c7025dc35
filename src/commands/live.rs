//! Helpers for commands that read through live subscriptions.

use std::hash::Hash;
use std::time::Duration;

use hostel_sync_core::{
    Decode, DirtyDiffWriter, DocPath, DraftState, FieldGroups, SaveOutcome, Subscription,
};
use tokio::sync::mpsc;

/// How long to wait for the first snapshot of a feed.
pub const FIRST_VALUE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum LiveError {
    /// The feed stopped before delivering anything.
    Closed,
    /// No value arrived within [`FIRST_VALUE_TIMEOUT`].
    Timeout,
}

impl std::fmt::Display for LiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiveError::Closed => write!(
                f,
                "Subscription closed before delivering a value (is the server running?)"
            ),
            LiveError::Timeout => write!(
                f,
                "No data received within {}s",
                FIRST_VALUE_TIMEOUT.as_secs()
            ),
        }
    }
}

impl std::error::Error for LiveError {}

/// Callback that forwards feed updates into a channel.
pub fn forward<T: Send + 'static>() -> (impl FnMut(T) + Send + 'static, mpsc::UnboundedReceiver<T>)
{
    let (tx, rx) = mpsc::unbounded_channel();
    let on_update = move |value: T| {
        let _ = tx.send(value);
    };
    (on_update, rx)
}

/// Waits for the next value of a feed.
pub async fn next_value<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Result<T, LiveError> {
    match tokio::time::timeout(FIRST_VALUE_TIMEOUT, rx.recv()).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(LiveError::Closed),
        Err(_) => Err(LiveError::Timeout),
    }
}

/// Reads one value through a feed and detaches.
pub async fn read_once<T, S>(subscribe: S) -> Result<T, LiveError>
where
    T: Send + 'static,
    S: FnOnce(Box<dyn FnMut(T) + Send>) -> Subscription,
{
    let (on_update, mut rx) = forward::<T>();
    let subscription = subscribe(Box::new(on_update));
    let value = next_value(&mut rx).await;
    subscription.unsubscribe();
    value
}

/// Feeds every snapshot that has already arrived into the draft.
pub fn drain_into<K, T>(rx: &mut mpsc::UnboundedReceiver<T>, state: &mut DraftState<K, T>)
where
    K: Eq + Hash + Clone,
    T: Clone + Default,
{
    while let Ok(value) = rx.try_recv() {
        let context = state.context().clone();
        state.apply_snapshot(context, value);
    }
}

/// Saves a draft through the dirty-diff writer and reports what happened.
pub async fn save_draft<K, T>(
    writer: &DirtyDiffWriter,
    path: &DocPath,
    state: &mut DraftState<K, T>,
) -> Result<SaveOutcome, Box<dyn std::error::Error>>
where
    K: Eq + Hash + Clone,
    T: Decode + FieldGroups + Clone + Default,
{
    if state.has_remote_changes() {
        println!("Note: {} changed on the server while editing.", path);
    }

    let outcome = writer.save(path, state).await?;
    match &outcome {
        SaveOutcome::NothingToSave => println!("Nothing to save."),
        SaveOutcome::NoActualChanges => println!("No changes: {} is already up to date.", path),
        SaveOutcome::Saved { groups } => {
            println!("Saved {}: {}", path, groups.join(", "));
        }
    }
    Ok(outcome)
}

/// Keeps a subscription open until Ctrl-C.
pub async fn watch_until_interrupted(
    subscription: Subscription,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Watching for changes. Press Ctrl-C to stop.\n");
    tokio::signal::ctrl_c().await?;
    subscription.unsubscribe();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostel_sync_core::{
        subscribe_laundry_settings, DocumentStore, LaundrySettings, MemoryStore, WritePayload,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_read_once_returns_current_value() {
        let memory = MemoryStore::new();
        memory
            .set_merge(
                &LaundrySettings::path(),
                WritePayload::new().value("pickupDay", "Monday"),
            )
            .await
            .unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(memory);

        let laundry: LaundrySettings =
            read_once(|on_update| subscribe_laundry_settings(&store, on_update))
                .await
                .unwrap();
        assert_eq!(laundry.pickup_day, "Monday");
    }

    #[tokio::test]
    async fn test_edit_and_save_writes_only_edited_group() {
        let memory = MemoryStore::new();
        memory
            .set_merge(
                &LaundrySettings::path(),
                WritePayload::new()
                    .value("status", "On Schedule")
                    .value("pickupDay", "Monday"),
            )
            .await
            .unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(memory.clone());

        let (on_update, mut rx) = forward::<LaundrySettings>();
        let subscription = subscribe_laundry_settings(&store, on_update);
        let mut state = DraftState::single();
        state.apply_snapshot((), next_value(&mut rx).await.unwrap());

        state.edit("pickupDay", |l: &mut LaundrySettings| {
            l.pickup_day = "Tuesday".into()
        });
        drain_into(&mut rx, &mut state);

        let writer = DirtyDiffWriter::new(Arc::clone(&store));
        let outcome = save_draft(&writer, &LaundrySettings::path(), &mut state)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                groups: vec!["pickupDay".to_string()]
            }
        );
        subscription.unsubscribe();

        let doc = memory.get(&LaundrySettings::path()).await.unwrap().unwrap();
        assert_eq!(doc.fields["pickupDay"], "Tuesday");
        assert_eq!(doc.fields["status"], "On Schedule");
        assert!(doc.fields.contains_key("lastUpdated"));
    }

    #[tokio::test]
    async fn test_closed_feed_reports_error() {
        let (on_update, mut rx) = forward::<u32>();
        drop(on_update);
        assert!(matches!(next_value(&mut rx).await, Err(LiveError::Closed)));
    }
}
