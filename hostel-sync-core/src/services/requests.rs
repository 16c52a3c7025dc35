use std::sync::Arc;

use super::ServiceError;
use crate::decode::decode_document;
use crate::document::WritePayload;
use crate::feed::Subscription;
use crate::feeds::subscribe_service_requests;
use crate::records::{RequestStatus, ServiceRequest};
use crate::store::DocumentStore;

/// A request as submitted by a student.
#[derive(Debug, Clone, Default)]
pub struct NewServiceRequest {
    pub student_id: String,
    pub student_name: String,
    pub category: String,
    pub description: String,
}

/// Submits service requests and moves them through their lifecycle.
///
/// The store accepts any write; transitions are checked here against a
/// fresh read of the request.
pub struct ServiceRequestService {
    store: Arc<dyn DocumentStore>,
}

impl ServiceRequestService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn submit(&self, request: &NewServiceRequest) -> Result<String, ServiceError> {
        if request.student_id.trim().is_empty() {
            return Err(ServiceError::Validation("student id is required".into()));
        }
        if request.description.trim().is_empty() {
            return Err(ServiceError::Validation("description is required".into()));
        }
        let category = match request.category.trim() {
            "" => "general",
            category => category,
        };

        let payload = WritePayload::new()
            .value("studentId", request.student_id.trim())
            .value("studentName", request.student_name.trim())
            .value("category", category)
            .value("description", request.description.trim())
            .value("status", RequestStatus::Pending.to_string())
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt");

        let id = self.store.add(&ServiceRequest::collection(), payload).await?;
        tracing::info!("Service request {} submitted by {}", id, request.student_id);
        Ok(id)
    }

    pub async fn approve(
        &self,
        id: &str,
        eta: Option<&str>,
        note: Option<&str>,
    ) -> Result<ServiceRequest, ServiceError> {
        let mut extra = WritePayload::new();
        if let Some(eta) = non_blank(eta) {
            extra = extra.value("eta", eta);
        }
        if let Some(note) = non_blank(note) {
            extra = extra.value("adminNote", note);
        }
        self.transition(id, RequestStatus::Approved, extra).await
    }

    pub async fn reject(&self, id: &str, note: Option<&str>) -> Result<ServiceRequest, ServiceError> {
        let mut extra = WritePayload::new();
        if let Some(note) = non_blank(note) {
            extra = extra.value("adminNote", note);
        }
        self.transition(id, RequestStatus::Rejected, extra).await
    }

    pub async fn complete(&self, id: &str) -> Result<ServiceRequest, ServiceError> {
        self.transition(id, RequestStatus::Completed, WritePayload::new())
            .await
    }

    pub fn subscribe<F>(&self, student_id: Option<&str>, on_update: F) -> Subscription
    where
        F: FnMut(Vec<ServiceRequest>) + Send + 'static,
    {
        subscribe_service_requests(&self.store, student_id, on_update)
    }

    /// Reads the request, checks the move, and merge-writes the new status.
    /// Returns the request as it was before the write.
    async fn transition(
        &self,
        id: &str,
        next: RequestStatus,
        extra: WritePayload,
    ) -> Result<ServiceRequest, ServiceError> {
        let path = ServiceRequest::path(id)?;
        let current: ServiceRequest = match self.store.get(&path).await? {
            Some(doc) => decode_document(&doc),
            None => return Err(ServiceError::NotFound(path.to_string())),
        };

        if !current.status.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let mut payload = extra
            .value("status", next.to_string())
            .server_timestamp("updatedAt");
        if next == RequestStatus::Completed {
            payload = payload.server_timestamp("completedAt");
        }
        self.store.set_merge(&path, payload).await?;
        tracing::info!("Service request {}: {} -> {}", id, current.status, next);
        Ok(current)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn new_request() -> NewServiceRequest {
        NewServiceRequest {
            student_id: "stu-1".into(),
            student_name: "Asha".into(),
            category: " ".into(),
            description: "Fan not working".into(),
        }
    }

    async fn read(memory: &MemoryStore, id: &str) -> ServiceRequest {
        let doc = memory
            .get(&ServiceRequest::path(id).unwrap())
            .await
            .unwrap()
            .unwrap();
        decode_document(&doc)
    }

    #[tokio::test]
    async fn test_submit_defaults() {
        let memory = MemoryStore::new();
        let service = ServiceRequestService::new(Arc::new(memory.clone()));

        let id = service.submit(&new_request()).await.unwrap();
        let request = read(&memory, &id).await;

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.category, "general");
        assert!(request.created_at.is_some());
    }

    #[tokio::test]
    async fn test_submit_requires_description() {
        let service = ServiceRequestService::new(Arc::new(MemoryStore::new()));
        let mut request = new_request();
        request.description = "   ".into();

        assert!(matches!(
            service.submit(&request).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_approve_then_complete() {
        let memory = MemoryStore::new();
        let service = ServiceRequestService::new(Arc::new(memory.clone()));
        let id = service.submit(&new_request()).await.unwrap();

        service
            .approve(&id, Some("Tomorrow 10am"), Some("Electrician assigned"))
            .await
            .unwrap();
        let approved = read(&memory, &id).await;
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.eta.as_deref(), Some("Tomorrow 10am"));
        assert_eq!(approved.admin_note.as_deref(), Some("Electrician assigned"));

        let before = service.complete(&id).await.unwrap();
        assert_eq!(before.status, RequestStatus::Approved);
        let doc = memory
            .get(&ServiceRequest::path(&id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.fields["status"], json!("completed"));
        assert!(doc.fields.contains_key("completedAt"));
    }

    #[tokio::test]
    async fn test_backwards_moves_rejected() {
        let memory = MemoryStore::new();
        let service = ServiceRequestService::new(Arc::new(memory.clone()));
        let id = service.submit(&new_request()).await.unwrap();

        // pending -> completed skips approval
        let err = service.complete(&id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidTransition {
                from: RequestStatus::Pending,
                to: RequestStatus::Completed
            }
        ));

        service.reject(&id, Some("Duplicate")).await.unwrap();
        assert!(service.approve(&id, None, None).await.is_err());
        assert_eq!(read(&memory, &id).await.status, RequestStatus::Rejected);
    }

    #[tokio::test]
    async fn test_unknown_request() {
        let service = ServiceRequestService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.complete("missing").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
