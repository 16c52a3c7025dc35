//! Ready-made subscriptions for each hostel feature.

use std::sync::Arc;

use chrono::Weekday;

use crate::document::{Direction, PathError, Query};
use crate::feed::{Feed, LiveFeed, Subscription};
use crate::records::{
    BusSchedule, ChatMessage, Conversation, EmergencyContact, LaundrySettings, MessMenu,
    ServiceRequest,
};
use crate::store::DocumentStore;

/// All bus routes, ordered by route name.
pub fn subscribe_bus_routes<F>(store: &Arc<dyn DocumentStore>, on_update: F) -> Subscription
where
    F: FnMut(Vec<BusSchedule>) + Send + 'static,
{
    let query = Query::collection(BusSchedule::collection()).order_by("routeName", Direction::Asc);
    LiveFeed::<Vec<BusSchedule>>::query(Arc::clone(store), query).subscribe(Box::new(on_update))
}

pub fn subscribe_bus_route<F>(
    store: &Arc<dyn DocumentStore>,
    route_id: &str,
    on_update: F,
) -> Result<Subscription, PathError>
where
    F: FnMut(BusSchedule) + Send + 'static,
{
    let path = BusSchedule::path(route_id)?;
    Ok(LiveFeed::<BusSchedule>::document(Arc::clone(store), path).subscribe(Box::new(on_update)))
}

pub fn subscribe_mess_menu<F>(
    store: &Arc<dyn DocumentStore>,
    day: Weekday,
    on_update: F,
) -> Subscription
where
    F: FnMut(MessMenu) + Send + 'static,
{
    LiveFeed::<MessMenu>::document(Arc::clone(store), MessMenu::path(day))
        .subscribe(Box::new(on_update))
}

pub fn subscribe_laundry_settings<F>(store: &Arc<dyn DocumentStore>, on_update: F) -> Subscription
where
    F: FnMut(LaundrySettings) + Send + 'static,
{
    LiveFeed::<LaundrySettings>::document(Arc::clone(store), LaundrySettings::path())
        .subscribe(Box::new(on_update))
}

pub fn subscribe_emergency_contacts<F>(store: &Arc<dyn DocumentStore>, on_update: F) -> Subscription
where
    F: FnMut(Vec<EmergencyContact>) + Send + 'static,
{
    let query = Query::collection(EmergencyContact::collection()).order_by("title", Direction::Asc);
    LiveFeed::<Vec<EmergencyContact>>::query(Arc::clone(store), query).subscribe(Box::new(on_update))
}

/// Service requests, newest first. With `student_id`, only that student's.
pub fn subscribe_service_requests<F>(
    store: &Arc<dyn DocumentStore>,
    student_id: Option<&str>,
    on_update: F,
) -> Subscription
where
    F: FnMut(Vec<ServiceRequest>) + Send + 'static,
{
    let mut query =
        Query::collection(ServiceRequest::collection()).order_by("createdAt", Direction::Desc);
    if let Some(student_id) = student_id {
        query = query.where_eq("studentId", student_id);
    }
    LiveFeed::<Vec<ServiceRequest>>::query(Arc::clone(store), query).subscribe(Box::new(on_update))
}

/// Conversation list, most recently active first.
pub fn subscribe_conversations<F>(store: &Arc<dyn DocumentStore>, on_update: F) -> Subscription
where
    F: FnMut(Vec<Conversation>) + Send + 'static,
{
    let query =
        Query::collection(Conversation::collection()).order_by("lastMessageTime", Direction::Desc);
    LiveFeed::<Vec<Conversation>>::query(Arc::clone(store), query).subscribe(Box::new(on_update))
}

/// Messages of one conversation, newest first (the order `group_by_day` expects).
pub fn subscribe_messages<F>(
    store: &Arc<dyn DocumentStore>,
    participant_id: &str,
    on_update: F,
) -> Result<Subscription, PathError>
where
    F: FnMut(Vec<ChatMessage>) + Send + 'static,
{
    let query = Query::collection(Conversation::messages(participant_id)?)
        .order_by("createdAt", Direction::Desc);
    Ok(LiveFeed::<Vec<ChatMessage>>::query(Arc::clone(store), query)
        .subscribe(Box::new(on_update)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::WritePayload;
    use crate::store::MemoryStore;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_bus_routes_sorted_by_name() {
        let memory = MemoryStore::new();
        let store: Arc<dyn DocumentStore> = Arc::new(memory.clone());
        for (id, name) in [("r2", "Zoo Road"), ("r1", "Airport")] {
            memory
                .set_merge(
                    &BusSchedule::path(id).unwrap(),
                    WritePayload::new().value("routeName", name),
                )
                .await
                .unwrap();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = subscribe_bus_routes(&store, move |routes| {
            let _ = tx.send(routes);
        });

        let routes = rx.recv().await.unwrap();
        let names: Vec<&str> = routes.iter().map(|r| r.route_name.as_str()).collect();
        assert_eq!(names, vec!["Airport", "Zoo Road"]);
    }

    #[tokio::test]
    async fn test_service_requests_filtered_by_student() {
        let memory = MemoryStore::new();
        let store: Arc<dyn DocumentStore> = Arc::new(memory.clone());
        let requests = ServiceRequest::collection();
        for student in ["stu-1", "stu-2", "stu-1"] {
            memory
                .add(&requests, WritePayload::new().value("studentId", student))
                .await
                .unwrap();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = subscribe_service_requests(&store, Some("stu-1"), move |list| {
            let _ = tx.send(list);
        });

        let list = rx.recv().await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|r| r.student_id == "stu-1"));
    }

    #[tokio::test]
    async fn test_mess_menu_follows_day() {
        let memory = MemoryStore::new();
        let store: Arc<dyn DocumentStore> = Arc::new(memory.clone());
        memory
            .set_merge(
                &MessMenu::path(Weekday::Tue),
                WritePayload::new().value("dinner", serde_json::json!(["Khichdi"])),
            )
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = subscribe_mess_menu(&store, Weekday::Tue, move |menu| {
            let _ = tx.send(menu);
        });

        assert_eq!(rx.recv().await.unwrap().dinner, vec!["Khichdi"]);
    }

    #[test]
    fn test_invalid_route_id_rejected() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        assert!(subscribe_bus_route(&store, "../etc", |_| {}).is_err());
    }
}
