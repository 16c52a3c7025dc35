use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::decode::{self, Decode};
use crate::document::{CollectionPath, DocPath, Fields, PathError};

/// Lifecycle of a service request. Moves are admin-driven only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Completed,
    Rejected,
}

impl RequestStatus {
    /// pending → approved | rejected, approved → completed.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Approved, RequestStatus::Completed)
        )
    }

    pub fn is_final(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Approved => write!(f, "approved"),
            RequestStatus::Completed => write!(f, "completed"),
            RequestStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "completed" => Ok(RequestStatus::Completed),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(format!(
                "Invalid status '{}'. Valid options: pending, approved, completed, rejected",
                s
            )),
        }
    }
}

/// A student-submitted service request (`service_requests/{id}`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceRequest {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub category: String,
    pub description: String,
    pub status: RequestStatus,
    pub eta: Option<String>,
    pub admin_note: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ServiceRequest {
    pub fn collection() -> CollectionPath {
        CollectionPath::known("service_requests")
    }

    pub fn path(id: &str) -> Result<DocPath, PathError> {
        Self::collection().doc(id)
    }
}

impl Decode for ServiceRequest {
    fn decode(id: &str, fields: &Fields) -> Self {
        Self {
            id: id.to_string(),
            student_id: decode::string(fields, "studentId"),
            student_name: decode::string(fields, "studentName"),
            category: decode::string_or(fields, "category", "general"),
            description: decode::string(fields, "description"),
            status: decode::string(fields, "status").parse().unwrap_or_default(),
            eta: decode::opt_string(fields, "eta"),
            admin_note: decode::opt_string(fields, "adminNote"),
            created_at: decode::timestamp(fields, "createdAt"),
            updated_at: decode::timestamp(fields, "updatedAt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forward_transitions_only() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Completed.can_transition_to(Approved));
        assert!(!Rejected.can_transition_to(Approved));
    }

    #[test]
    fn test_unknown_status_decodes_as_pending() {
        let fields = json!({"status": "escalated", "description": "Fan broken"})
            .as_object()
            .cloned()
            .unwrap();
        let request = ServiceRequest::decode("r1", &fields);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.category, "general");
        assert!(request.eta.is_none());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Approved".parse::<RequestStatus>().unwrap(), RequestStatus::Approved);
        assert!("done".parse::<RequestStatus>().is_err());
    }
}
