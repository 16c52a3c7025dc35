use std::sync::Arc;

use super::ServiceError;
use crate::feed::Subscription;
use crate::feeds::subscribe_emergency_contacts;
use crate::records::EmergencyContact;
use crate::store::DocumentStore;

/// Creates and removes emergency contacts. Contacts are never edited in place.
pub struct ContactService {
    store: Arc<dyn DocumentStore>,
}

impl ContactService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Adds a contact and returns its generated id.
    pub async fn add(&self, contact: &EmergencyContact) -> Result<String, ServiceError> {
        if contact.name.trim().is_empty() {
            return Err(ServiceError::Validation("contact name is required".into()));
        }
        if contact.phone.trim().is_empty() {
            return Err(ServiceError::Validation("contact phone is required".into()));
        }

        let id = self
            .store
            .add(&EmergencyContact::collection(), contact.to_payload())
            .await?;
        tracing::info!("Added emergency contact {} ({})", id, contact.name.trim());
        Ok(id)
    }

    pub async fn remove(&self, id: &str) -> Result<(), ServiceError> {
        let path = EmergencyContact::path(id)?;
        self.store.delete(&path).await?;
        tracing::info!("Removed emergency contact {}", id);
        Ok(())
    }

    pub fn subscribe<F>(&self, on_update: F) -> Subscription
    where
        F: FnMut(Vec<EmergencyContact>) + Send + 'static,
    {
        subscribe_emergency_contacts(&self.store, on_update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_trims_and_defaults_icon() {
        let memory = MemoryStore::new();
        let service = ContactService::new(Arc::new(memory.clone()));

        let id = service
            .add(&EmergencyContact::new(" Warden ", " Mr. Rao ", " 98450 00000").with_icon(""))
            .await
            .unwrap();

        let doc = memory
            .get(&EmergencyContact::path(&id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.fields["name"], json!("Mr. Rao"));
        assert_eq!(doc.fields["icon"], json!("call"));
    }

    #[tokio::test]
    async fn test_add_requires_name_and_phone() {
        let memory = MemoryStore::new();
        let service = ContactService::new(Arc::new(memory.clone()));

        let err = service
            .add(&EmergencyContact::new("Doctor", "  ", "101"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .add(&EmergencyContact::new("Doctor", "Iyer", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove() {
        let memory = MemoryStore::new();
        let service = ContactService::new(Arc::new(memory.clone()));
        let id = service
            .add(&EmergencyContact::new("Ambulance", "City Hospital", "108"))
            .await
            .unwrap();

        service.remove(&id).await.unwrap();
        assert!(memory.is_empty().await);
    }
}
