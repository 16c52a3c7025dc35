use std::sync::Arc;

use super::ServiceError;
use crate::decode::decode_document;
use crate::document::{Query, WritePayload};
use crate::feed::Subscription;
use crate::feeds::{subscribe_conversations, subscribe_messages};
use crate::records::{ChatMessage, Conversation};
use crate::store::DocumentStore;

/// Who is sending a message.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: String,
    pub name: String,
}

impl Sender {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Chat between the admin desk and individual students.
///
/// A conversation is keyed by the student's id. Messages sent by that
/// student count towards the admin's unread badge.
pub struct ChatService {
    store: Arc<dyn DocumentStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Appends a message, then refreshes the conversation preview.
    ///
    /// The two writes are independent; if the second fails the message is
    /// still delivered and the preview catches up on the next send.
    pub async fn send(
        &self,
        participant_id: &str,
        sender: &Sender,
        text: &str,
    ) -> Result<String, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::Validation("message text is empty".into()));
        }

        let messages = Conversation::messages(participant_id)?;
        let message = WritePayload::new()
            .value("text", text)
            .value("senderId", sender.id.as_str())
            .value("senderName", sender.name.as_str())
            .server_timestamp("createdAt")
            .value("read", false);
        let message_id = self.store.add(&messages, message).await?;

        let path = Conversation::path(participant_id)?;
        let mut preview = WritePayload::new()
            .value("lastMessage", text)
            .server_timestamp("lastMessageTime")
            .value("lastSenderId", sender.id.as_str());

        if sender.id == participant_id {
            let unread = match self.store.get(&path).await? {
                Some(doc) => decode_document::<Conversation>(&doc).unread_count,
                None => 0,
            };
            preview = preview
                .value("participantName", sender.name.as_str())
                .value("unreadCount", unread.saturating_add(1));
        }
        self.store.set_merge(&path, preview).await?;

        tracing::debug!("Message {} sent in conversation {}", message_id, participant_id);
        Ok(message_id)
    }

    /// Marks the other party's unread messages as read.
    ///
    /// When the admin side reads, the unread badge is reset as well.
    /// Returns the number of messages marked.
    pub async fn mark_read(&self, participant_id: &str, reader_id: &str) -> Result<usize, ServiceError> {
        let messages = Conversation::messages(participant_id)?;
        let unread = self
            .store
            .query(&Query::collection(messages).where_eq("read", false))
            .await?;

        let mut marked = 0;
        for doc in unread {
            let message: ChatMessage = decode_document(&doc);
            if message.sender_id == reader_id {
                continue;
            }
            self.store
                .set_merge(&doc.path, WritePayload::new().value("read", true))
                .await?;
            marked += 1;
        }

        if reader_id != participant_id {
            let path = Conversation::path(participant_id)?;
            if self.store.get(&path).await?.is_some() {
                self.store
                    .set_merge(&path, WritePayload::new().value("unreadCount", 0))
                    .await?;
            }
        }
        Ok(marked)
    }

    pub fn subscribe_conversations<F>(&self, on_update: F) -> Subscription
    where
        F: FnMut(Vec<Conversation>) + Send + 'static,
    {
        subscribe_conversations(&self.store, on_update)
    }

    pub fn subscribe_messages<F>(
        &self,
        participant_id: &str,
        on_update: F,
    ) -> Result<Subscription, ServiceError>
    where
        F: FnMut(Vec<ChatMessage>) + Send + 'static,
    {
        Ok(subscribe_messages(&self.store, participant_id, on_update)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Direction;
    use crate::store::MemoryStore;

    async fn conversation(memory: &MemoryStore, id: &str) -> Conversation {
        let doc = memory
            .get(&Conversation::path(id).unwrap())
            .await
            .unwrap()
            .unwrap();
        decode_document(&doc)
    }

    async fn messages(memory: &MemoryStore, id: &str) -> Vec<ChatMessage> {
        let query = Query::collection(Conversation::messages(id).unwrap())
            .order_by("createdAt", Direction::Asc);
        memory
            .query(&query)
            .await
            .unwrap()
            .iter()
            .map(decode_document)
            .collect()
    }

    #[tokio::test]
    async fn test_student_message_updates_preview_and_unread() {
        let memory = MemoryStore::new();
        let chat = ChatService::new(Arc::new(memory.clone()));
        let student = Sender::new("stu-1", "Asha");

        chat.send("stu-1", &student, " Water cooler broken ").await.unwrap();
        chat.send("stu-1", &student, "Second floor").await.unwrap();

        let conv = conversation(&memory, "stu-1").await;
        assert_eq!(conv.last_message, "Second floor");
        assert_eq!(conv.last_sender_id, "stu-1");
        assert_eq!(conv.participant_name, "Asha");
        assert_eq!(conv.unread_count, 2);
        assert!(conv.last_message_time.is_some());

        let log = messages(&memory, "stu-1").await;
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|m| !m.read && m.created_at.is_some()));
    }

    #[tokio::test]
    async fn test_unread_count_saturates() {
        let memory = MemoryStore::new();
        let chat = ChatService::new(Arc::new(memory.clone()));
        memory
            .set_merge(
                &Conversation::path("stu-1").unwrap(),
                WritePayload::new().value("unreadCount", u32::MAX),
            )
            .await
            .unwrap();

        chat.send("stu-1", &Sender::new("stu-1", "Asha"), "Still waiting")
            .await
            .unwrap();

        let conv = conversation(&memory, "stu-1").await;
        assert_eq!(conv.unread_count, u32::MAX);
    }

    #[tokio::test]
    async fn test_admin_reply_does_not_bump_unread() {
        let memory = MemoryStore::new();
        let chat = ChatService::new(Arc::new(memory.clone()));

        chat.send("stu-1", &Sender::new("stu-1", "Asha"), "Hi").await.unwrap();
        chat.send("stu-1", &Sender::new("admin", "Warden"), "On it").await.unwrap();

        let conv = conversation(&memory, "stu-1").await;
        assert_eq!(conv.unread_count, 1);
        assert_eq!(conv.last_sender_id, "admin");
        assert_eq!(conv.participant_name, "Asha");
    }

    #[tokio::test]
    async fn test_mark_read_by_admin() {
        let memory = MemoryStore::new();
        let chat = ChatService::new(Arc::new(memory.clone()));
        chat.send("stu-1", &Sender::new("stu-1", "Asha"), "One").await.unwrap();
        chat.send("stu-1", &Sender::new("stu-1", "Asha"), "Two").await.unwrap();
        chat.send("stu-1", &Sender::new("admin", "Warden"), "Reply").await.unwrap();

        let marked = chat.mark_read("stu-1", "admin").await.unwrap();

        assert_eq!(marked, 2);
        assert_eq!(conversation(&memory, "stu-1").await.unread_count, 0);
        let log = messages(&memory, "stu-1").await;
        let unread: Vec<&str> = log.iter().filter(|m| !m.read).map(|m| m.text.as_str()).collect();
        assert_eq!(unread, vec!["Reply"]);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let memory = MemoryStore::new();
        let chat = ChatService::new(Arc::new(memory.clone()));
        let result = chat.send("stu-1", &Sender::new("stu-1", "Asha"), "   ").await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(memory.is_empty().await);
    }
}
